//! Store configuration

use std::fmt;
use std::sync::Arc;

use crate::client::DocumentClient;
use crate::error::SessionError;
use crate::ttl::TtlPolicy;

/// Container name used when none is configured
pub const DEFAULT_CONTAINER_NAME: &str = "sessions";

/// Options for building a session store
///
/// ```rust,ignore
/// let options = CosmosStoreOptions::new(client, "my-app")
///     .with_container_name("sessions")
///     .with_ttl_secs(3600);
/// let store = CosmosStore::initialize(options).await?;
/// ```
pub struct CosmosStoreOptions {
    /// Client for the backing document database
    pub client: Arc<dyn DocumentClient>,
    /// Database to hold the session container
    pub database_name: String,
    /// Container to hold session records
    pub container_name: String,
    /// TTL policy applied on writes; defaults to a fixed one-day lifetime
    pub ttl: Option<TtlPolicy>,
    /// Turn `touch` into a no-op
    pub disable_touch: bool,
}

impl CosmosStoreOptions {
    pub fn new(client: Arc<dyn DocumentClient>, database_name: impl Into<String>) -> Self {
        Self {
            client,
            database_name: database_name.into(),
            container_name: DEFAULT_CONTAINER_NAME.to_string(),
            ttl: None,
            disable_touch: false,
        }
    }

    pub fn with_container_name(mut self, name: impl Into<String>) -> Self {
        self.container_name = name.into();
        self
    }

    pub fn with_ttl_secs(mut self, secs: i64) -> Self {
        self.ttl = Some(TtlPolicy::Fixed(secs));
        self
    }

    pub fn with_ttl_policy(mut self, policy: TtlPolicy) -> Self {
        self.ttl = Some(policy);
        self
    }

    pub fn with_disable_touch(mut self, disable: bool) -> Self {
        self.disable_touch = disable;
        self
    }

    pub(crate) fn into_config(self) -> Result<StoreConfig, SessionError> {
        if self.database_name.trim().is_empty() {
            return Err(SessionError::InvalidOptions(
                "database name must not be blank".to_string(),
            ));
        }
        if self.container_name.trim().is_empty() {
            return Err(SessionError::InvalidOptions(
                "container name must not be blank".to_string(),
            ));
        }
        Ok(StoreConfig {
            client: self.client,
            database_name: self.database_name,
            container_name: self.container_name,
            ttl: Some(self.ttl.unwrap_or_default()),
            disable_touch: self.disable_touch,
        })
    }
}

impl fmt::Debug for CosmosStoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CosmosStoreOptions")
            .field("database_name", &self.database_name)
            .field("container_name", &self.container_name)
            .field("ttl", &self.ttl)
            .field("disable_touch", &self.disable_touch)
            .finish_non_exhaustive()
    }
}

/// Validated configuration captured at initialization
#[derive(Clone)]
pub(crate) struct StoreConfig {
    pub client: Arc<dyn DocumentClient>,
    pub database_name: String,
    pub container_name: String,
    pub ttl: Option<TtlPolicy>,
    pub disable_touch: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryDocumentClient;
    use crate::ttl::DEFAULT_SESSION_TTL_SECS;

    fn client() -> Arc<dyn DocumentClient> {
        Arc::new(MemoryDocumentClient::new())
    }

    #[test]
    fn defaults_fill_in_container_and_ttl() {
        let config = CosmosStoreOptions::new(client(), "app")
            .into_config()
            .unwrap();
        assert_eq!(config.database_name, "app");
        assert_eq!(config.container_name, DEFAULT_CONTAINER_NAME);
        assert!(matches!(
            config.ttl,
            Some(TtlPolicy::Fixed(DEFAULT_SESSION_TTL_SECS))
        ));
        assert!(!config.disable_touch);
    }

    #[test]
    fn builders_override_defaults() {
        let config = CosmosStoreOptions::new(client(), "app")
            .with_container_name("web-sessions")
            .with_ttl_secs(600)
            .with_disable_touch(true)
            .into_config()
            .unwrap();
        assert_eq!(config.container_name, "web-sessions");
        assert!(matches!(config.ttl, Some(TtlPolicy::Fixed(600))));
        assert!(config.disable_touch);
    }

    #[test]
    fn blank_names_are_rejected() {
        let blank_db = CosmosStoreOptions::new(client(), "  ").into_config();
        assert!(matches!(blank_db, Err(SessionError::InvalidOptions(_))));

        let blank_container = CosmosStoreOptions::new(client(), "app")
            .with_container_name("")
            .into_config();
        assert!(matches!(
            blank_container,
            Err(SessionError::InvalidOptions(_))
        ));
    }
}
