//! The session store
//!
//! [`CosmosStore`] persists express-session records in a document database
//! container, one record per session, addressed by session id. One store
//! exists per process: [`CosmosStore::initialize`] captures the
//! configuration, constructs the instance, and provisions the database and
//! container before handing it out.

use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};
use serde_json::json;

use crate::client::{ContainerRef, DatabaseRef, DocumentClient, DocumentError};
use crate::config::{CosmosStoreOptions, StoreConfig};
use crate::error::SessionError;
use crate::session::SessionRecord;
use crate::ttl::{self, TtlPolicy};

/// The session id doubles as the partition key, so every operation is a
/// single-partition point operation.
const PARTITION_KEY_PATH: &str = "/id";

/// Container-level TTL sentinel: expiry is on, but only items carrying their
/// own `ttl` ever expire.
const CONTAINER_DEFAULT_TTL: i64 = -1;

/// Process-wide registry backing the one-store-per-process rule
#[derive(Default)]
struct Registry {
    config: Option<StoreConfig>,
    instance: Option<Arc<CosmosStore>>,
}

fn registry() -> &'static Mutex<Registry> {
    static REGISTRY: OnceLock<Mutex<Registry>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(Registry::default()))
}

fn init_lock() -> &'static tokio::sync::Mutex<()> {
    static INIT_LOCK: OnceLock<tokio::sync::Mutex<()>> = OnceLock::new();
    INIT_LOCK.get_or_init(|| tokio::sync::Mutex::new(()))
}

struct Handles {
    database: DatabaseRef,
    container: ContainerRef,
}

/// Session store backed by a Cosmos-style document database
///
/// Records are written with a `ttl` resolved from the store's policy and the
/// record's cookie, so the database expires idle sessions on its own; the
/// store never runs a reaper of its own.
///
/// ```rust,ignore
/// let client = Arc::new(MemoryDocumentClient::new());
/// let store = CosmosStore::initialize(
///     CosmosStoreOptions::new(client, "my-app").with_ttl_secs(3600),
/// )
/// .await?;
///
/// let mut record = SessionRecord::new(3600);
/// record.set("user", "alice");
/// store.set("sid-1", &record).await?;
/// ```
pub struct CosmosStore {
    client: Arc<dyn DocumentClient>,
    database_name: String,
    container_name: String,
    ttl: Option<TtlPolicy>,
    disable_touch: bool,
    handles: RwLock<Option<Handles>>,
}

impl CosmosStore {
    /// Initialize the process-wide store
    ///
    /// Validates the options, constructs the instance, and provisions the
    /// database and container, all under a single initialization lock. If a
    /// store already exists it is returned as-is and the new options are
    /// ignored. A provisioning failure leaves the process uninitialized, so
    /// a later call can try again.
    pub async fn initialize(options: CosmosStoreOptions) -> Result<Arc<Self>, SessionError> {
        let _init = init_lock().lock().await;

        if let Some(existing) = registry().lock().instance.clone() {
            return Ok(existing);
        }

        let config = options.into_config()?;
        let store = {
            // Capture and construct in one critical section so nothing can
            // slip in between.
            let mut reg = registry().lock();
            reg.config = Some(config);
            Self::construct(&mut reg)?
        };

        if let Err(err) = store.provision().await {
            let mut reg = registry().lock();
            reg.config = None;
            reg.instance = None;
            return Err(err);
        }
        Ok(store)
    }

    /// Construct directly from previously captured configuration
    ///
    /// Fails with [`SessionError::AlreadyInitialized`] once a store exists
    /// and [`SessionError::NotConfigured`] when no configuration was
    /// captured; [`CosmosStore::initialize`] is the supported entry point.
    pub fn new() -> Result<Arc<Self>, SessionError> {
        Self::construct(&mut registry().lock())
    }

    fn construct(reg: &mut Registry) -> Result<Arc<Self>, SessionError> {
        if reg.instance.is_some() {
            return Err(SessionError::AlreadyInitialized);
        }
        let config = reg.config.clone().ok_or(SessionError::NotConfigured)?;
        let store = Arc::new(Self {
            client: config.client,
            database_name: config.database_name,
            container_name: config.container_name,
            ttl: config.ttl,
            disable_touch: config.disable_touch,
            handles: RwLock::new(None),
        });
        reg.instance = Some(store.clone());
        Ok(store)
    }

    /// Forget the process-wide store and its captured configuration
    ///
    /// Existing handles keep working; only the registry is cleared so a
    /// fresh [`CosmosStore::initialize`] can build a new store.
    pub fn reset() {
        let mut reg = registry().lock();
        reg.config = None;
        reg.instance = None;
    }

    async fn provision(&self) -> Result<(), SessionError> {
        let database = self.client.ensure_database(&self.database_name).await?;
        let container = self
            .client
            .ensure_container(
                &database,
                &self.container_name,
                PARTITION_KEY_PATH,
                Some(CONTAINER_DEFAULT_TTL),
            )
            .await?;
        tracing::debug!(
            "provisioned session container {}/{}",
            self.database_name,
            self.container_name
        );
        *self.handles.write() = Some(Handles {
            database,
            container,
        });
        Ok(())
    }

    fn container(&self) -> Result<ContainerRef, SessionError> {
        self.handles
            .read()
            .as_ref()
            .map(|h| h.container.clone())
            .ok_or(SessionError::NotProvisioned)
    }

    fn provisioned(&self) -> Result<(DatabaseRef, ContainerRef), SessionError> {
        self.handles
            .read()
            .as_ref()
            .map(|h| (h.database.clone(), h.container.clone()))
            .ok_or(SessionError::NotProvisioned)
    }

    /// Database this store was configured with
    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// Container this store writes session records to
    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    /// Load one session, None when absent or already expired
    pub async fn get(&self, sid: &str) -> Result<Option<SessionRecord>, SessionError> {
        let container = self.container()?;
        match self.client.point_read(&container, sid, sid).await? {
            Some(document) => Ok(Some(serde_json::from_value(document)?)),
            None => Ok(None),
        }
    }

    /// Store one session under `sid`
    ///
    /// The document gets `sid` stamped as its id and a `ttl` resolved from
    /// the store's policy and the record's cookie. A record that resolves as
    /// already expired is removed instead of stored.
    pub async fn set(&self, sid: &str, record: &SessionRecord) -> Result<(), SessionError> {
        let container = self.container()?;
        let mut document = serde_json::to_value(record)?;
        document["id"] = json!(sid);
        match ttl::resolve(self.ttl.as_ref(), record) {
            Some(secs) if secs <= 0 => {
                tracing::debug!("session {} already expired, removing instead of storing", sid);
                self.destroy(sid).await
            }
            Some(secs) => {
                document["ttl"] = json!(secs);
                self.client.upsert(&container, document).await?;
                Ok(())
            }
            None => {
                // No policy and no cookie expiry. Unreachable through
                // initialize, which always fills in a policy, but kept as a
                // create-only write of a record with no lifetime.
                self.client.create(&container, document).await?;
                Ok(())
            }
        }
    }

    /// Remove one session; removing an absent session is not an error
    pub async fn destroy(&self, sid: &str) -> Result<(), SessionError> {
        let container = self.container()?;
        match self.client.delete(&container, sid, sid).await {
            Ok(()) | Err(DocumentError::NotFound) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Refresh a session's remaining lifetime without rewriting its data
    ///
    /// Patches the stored `ttl` to a freshly resolved value, which also
    /// restarts the expiry clock. Unlike the other operations, client
    /// failures here are logged and swallowed: a refresh that fails must
    /// never abort the request that triggered it.
    pub async fn touch(&self, sid: &str, record: &SessionRecord) -> Result<(), SessionError> {
        if self.disable_touch {
            return Ok(());
        }
        let container = self.container()?;
        let secs = match ttl::resolve(self.ttl.as_ref(), record) {
            Some(secs) => secs,
            // Nothing to refresh without a policy or an expiry.
            None => return Ok(()),
        };
        if let Err(err) = self
            .client
            .patch_field(&container, sid, sid, "/ttl", json!(secs))
            .await
        {
            tracing::warn!("failed to touch session {}: {}", sid, err);
        }
        Ok(())
    }

    /// Load every live session in the container
    pub async fn all(&self) -> Result<Vec<SessionRecord>, SessionError> {
        let container = self.container()?;
        let documents = self.client.read_all(&container).await?;
        Ok(documents
            .into_iter()
            .filter_map(|doc| serde_json::from_value(doc).ok())
            .collect())
    }

    /// Number of live sessions in the container
    pub async fn length(&self) -> Result<usize, SessionError> {
        let container = self.container()?;
        Ok(self.client.count(&container).await? as usize)
    }

    /// Remove every session by dropping and re-provisioning the container
    ///
    /// A container that is already gone counts as dropped, so a clear that
    /// failed between its two steps can simply be called again.
    pub async fn clear(&self) -> Result<(), SessionError> {
        let (database, container) = self.provisioned()?;
        match self.client.delete_container(&container).await {
            Ok(()) | Err(DocumentError::NotFound) => {}
            Err(err) => return Err(err.into()),
        }
        let container = self
            .client
            .ensure_container(
                &database,
                &self.container_name,
                PARTITION_KEY_PATH,
                Some(CONTAINER_DEFAULT_TTL),
            )
            .await?;
        *self.handles.write() = Some(Handles {
            database,
            container,
        });
        Ok(())
    }
}
