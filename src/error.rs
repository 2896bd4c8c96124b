//! Session store error types

use std::fmt;

use crate::client::DocumentError;

/// Errors raised by store initialization and session operations
#[derive(Debug)]
pub enum SessionError {
    /// Store options failed validation
    InvalidOptions(String),
    /// A store instance already exists in this process
    AlreadyInitialized,
    /// Construction was attempted before any configuration was captured
    NotConfigured,
    /// An operation ran before provisioning filled the container handles
    NotProvisioned,
    /// Error during serialization/deserialization
    SerializationError(String),
    /// Error reported by the document database client
    ClientError(DocumentError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::InvalidOptions(msg) => write!(f, "Invalid store options: {}", msg),
            SessionError::AlreadyInitialized => {
                write!(f, "A session store already exists in this process")
            }
            SessionError::NotConfigured => {
                write!(f, "No store configuration captured; use CosmosStore::initialize")
            }
            SessionError::NotProvisioned => write!(f, "Store has not been provisioned"),
            SessionError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            SessionError::ClientError(e) => write!(f, "Document client error: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<DocumentError> for SessionError {
    fn from(err: DocumentError) -> Self {
        SessionError::ClientError(err)
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::SerializationError(err.to_string())
    }
}
