//! Document client trait and resource handles

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

/// Handle to a provisioned database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseRef {
    id: String,
}

impl DatabaseRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Handle to a provisioned container within a database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRef {
    database: String,
    id: String,
}

impl ContainerRef {
    pub fn new(database: &DatabaseRef, id: impl Into<String>) -> Self {
        Self {
            database: database.id().to_string(),
            id: id.into(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Errors surfaced by a document client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// The requested item or resource does not exist
    NotFound,
    /// An item with the same id already exists
    Conflict,
    /// The request was malformed or violated a constraint
    BadRequest(String),
    /// The backing service could not be reached
    Unavailable(String),
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "Resource not found"),
            Self::Conflict => write!(f, "Item with this id already exists"),
            Self::BadRequest(msg) => write!(f, "Request rejected: {}", msg),
            Self::Unavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for DocumentError {}

/// Operations the store needs from a document database
///
/// Modeled on the Cosmos DB data plane: databases hold containers, containers
/// hold JSON items addressed by id plus partition key, and per-item `ttl`
/// counts down from the item's last write when the container enables it.
#[async_trait]
pub trait DocumentClient: Send + Sync + 'static {
    /// Create the database if it does not exist and return a handle to it
    async fn ensure_database(&self, id: &str) -> Result<DatabaseRef, DocumentError>;

    /// Create the container if it does not exist and return a handle to it
    ///
    /// `partition_key_path` and `default_ttl` only apply when the container
    /// is actually created; an existing container keeps its settings. A
    /// `default_ttl` of -1 enables expiry for items that carry their own
    /// `ttl` without expiring anything else.
    async fn ensure_container(
        &self,
        database: &DatabaseRef,
        id: &str,
        partition_key_path: &str,
        default_ttl: Option<i64>,
    ) -> Result<ContainerRef, DocumentError>;

    /// Read one item by id and partition key, None when absent or expired
    async fn point_read(
        &self,
        container: &ContainerRef,
        id: &str,
        partition_key: &str,
    ) -> Result<Option<Value>, DocumentError>;

    /// Insert or fully replace an item
    async fn upsert(&self, container: &ContainerRef, document: Value)
        -> Result<(), DocumentError>;

    /// Insert an item, failing with `Conflict` when the id is taken
    async fn create(&self, container: &ContainerRef, document: Value)
        -> Result<(), DocumentError>;

    /// Delete one item, failing with `NotFound` when absent
    async fn delete(
        &self,
        container: &ContainerRef,
        id: &str,
        partition_key: &str,
    ) -> Result<(), DocumentError>;

    /// Patch a single top-level field on an item
    ///
    /// `path` is Cosmos-style, e.g. `/ttl`. Patching counts as a write, so a
    /// patched `ttl` restarts the item's expiry clock.
    async fn patch_field(
        &self,
        container: &ContainerRef,
        id: &str,
        partition_key: &str,
        path: &str,
        value: Value,
    ) -> Result<(), DocumentError>;

    /// Read every live item in the container
    async fn read_all(&self, container: &ContainerRef) -> Result<Vec<Value>, DocumentError>;

    /// Count live items, `SELECT VALUE COUNT(c.id)` semantics
    async fn count(&self, container: &ContainerRef) -> Result<u64, DocumentError>;

    /// Drop the container and everything in it
    async fn delete_container(&self, container: &ContainerRef) -> Result<(), DocumentError>;
}
