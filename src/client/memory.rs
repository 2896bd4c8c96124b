//! In-memory document client
//!
//! Emulates the slice of the Cosmos data plane the store relies on, including
//! per-item TTL counted from the last write. Suitable for tests and local
//! development; data does not survive the process.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use super::traits::{ContainerRef, DatabaseRef, DocumentClient, DocumentError};

#[derive(Default)]
struct Database {
    containers: HashMap<String, Container>,
}

struct Container {
    partition_key_path: String,
    default_ttl: Option<i64>,
    items: HashMap<String, StoredItem>,
}

struct StoredItem {
    document: Value,
    ttl: Option<i64>,
    written_at: Instant,
}

impl Container {
    fn new(partition_key_path: &str, default_ttl: Option<i64>) -> Self {
        Self {
            partition_key_path: partition_key_path.to_string(),
            default_ttl,
            items: HashMap::new(),
        }
    }

    fn is_expired(&self, item: &StoredItem, now: Instant) -> bool {
        // A container without a default has TTL switched off entirely.
        let default = match self.default_ttl {
            Some(d) => d,
            None => return false,
        };
        let effective = item.ttl.unwrap_or(default);
        if effective <= 0 {
            return false;
        }
        now.duration_since(item.written_at) >= Duration::from_secs(effective as u64)
    }

    fn live_item(&self, id: &str) -> Option<&StoredItem> {
        let item = self.items.get(id)?;
        if self.is_expired(item, Instant::now()) {
            None
        } else {
            Some(item)
        }
    }

    fn sweep(&mut self) {
        let now = Instant::now();
        let expired: Vec<String> = self
            .items
            .iter()
            .filter(|(_, item)| self.is_expired(item, now))
            .map(|(id, _)| id.clone())
            .collect();
        for id in expired {
            self.items.remove(&id);
        }
    }

    fn pk_matches(&self, partition_key: &str, id: &str) -> bool {
        // Only id-based partitioning is modeled; other paths are not checked.
        self.partition_key_path != "/id" || partition_key == id
    }
}

fn validate_ttl(ttl: i64) -> Result<(), DocumentError> {
    if ttl == -1 || ttl > 0 {
        Ok(())
    } else {
        Err(DocumentError::BadRequest(format!(
            "ttl must be -1 or a positive number of seconds, got {}",
            ttl
        )))
    }
}

fn document_id(document: &Value) -> Result<String, DocumentError> {
    document
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| DocumentError::BadRequest("document is missing a string id".to_string()))
}

fn document_ttl(document: &Value) -> Result<Option<i64>, DocumentError> {
    match document.get("ttl") {
        None => Ok(None),
        Some(value) => {
            let ttl = value
                .as_i64()
                .ok_or_else(|| DocumentError::BadRequest("ttl must be an integer".to_string()))?;
            validate_ttl(ttl)?;
            Ok(Some(ttl))
        }
    }
}

/// Thread-safe in-memory stand-in for a document database account
#[derive(Clone, Default)]
pub struct MemoryDocumentClient {
    databases: Arc<RwLock<HashMap<String, Database>>>,
}

impl MemoryDocumentClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_container<T>(
        &self,
        container: &ContainerRef,
        f: impl FnOnce(&mut Container) -> Result<T, DocumentError>,
    ) -> Result<T, DocumentError> {
        let mut databases = self.databases.write();
        let database = databases
            .get_mut(container.database())
            .ok_or(DocumentError::NotFound)?;
        let container = database
            .containers
            .get_mut(container.id())
            .ok_or(DocumentError::NotFound)?;
        f(container)
    }
}

#[async_trait]
impl DocumentClient for MemoryDocumentClient {
    async fn ensure_database(&self, id: &str) -> Result<DatabaseRef, DocumentError> {
        let mut databases = self.databases.write();
        databases.entry(id.to_string()).or_default();
        Ok(DatabaseRef::new(id))
    }

    async fn ensure_container(
        &self,
        database: &DatabaseRef,
        id: &str,
        partition_key_path: &str,
        default_ttl: Option<i64>,
    ) -> Result<ContainerRef, DocumentError> {
        if let Some(ttl) = default_ttl {
            validate_ttl(ttl)?;
        }
        let mut databases = self.databases.write();
        let db = databases
            .get_mut(database.id())
            .ok_or(DocumentError::NotFound)?;
        // An existing container keeps the settings it was created with.
        db.containers
            .entry(id.to_string())
            .or_insert_with(|| Container::new(partition_key_path, default_ttl));
        Ok(ContainerRef::new(database, id))
    }

    async fn point_read(
        &self,
        container: &ContainerRef,
        id: &str,
        partition_key: &str,
    ) -> Result<Option<Value>, DocumentError> {
        self.with_container(container, |c| {
            if !c.pk_matches(partition_key, id) {
                return Ok(None);
            }
            Ok(c.live_item(id).map(|item| item.document.clone()))
        })
    }

    async fn upsert(
        &self,
        container: &ContainerRef,
        document: Value,
    ) -> Result<(), DocumentError> {
        let id = document_id(&document)?;
        let ttl = document_ttl(&document)?;
        self.with_container(container, |c| {
            c.items.insert(
                id,
                StoredItem {
                    document,
                    ttl,
                    written_at: Instant::now(),
                },
            );
            Ok(())
        })
    }

    async fn create(
        &self,
        container: &ContainerRef,
        document: Value,
    ) -> Result<(), DocumentError> {
        let id = document_id(&document)?;
        let ttl = document_ttl(&document)?;
        self.with_container(container, |c| {
            // An expired leftover does not block the id.
            if c.live_item(&id).is_some() {
                return Err(DocumentError::Conflict);
            }
            c.items.insert(
                id,
                StoredItem {
                    document,
                    ttl,
                    written_at: Instant::now(),
                },
            );
            Ok(())
        })
    }

    async fn delete(
        &self,
        container: &ContainerRef,
        id: &str,
        partition_key: &str,
    ) -> Result<(), DocumentError> {
        self.with_container(container, |c| {
            if !c.pk_matches(partition_key, id) {
                return Err(DocumentError::NotFound);
            }
            if c.live_item(id).is_none() {
                c.items.remove(id);
                return Err(DocumentError::NotFound);
            }
            c.items.remove(id);
            Ok(())
        })
    }

    async fn patch_field(
        &self,
        container: &ContainerRef,
        id: &str,
        partition_key: &str,
        path: &str,
        value: Value,
    ) -> Result<(), DocumentError> {
        let field = path.strip_prefix('/').unwrap_or(path);
        if field.is_empty() || field.contains('/') {
            return Err(DocumentError::BadRequest(format!(
                "unsupported patch path {}",
                path
            )));
        }
        self.with_container(container, |c| {
            if !c.pk_matches(partition_key, id) {
                return Err(DocumentError::NotFound);
            }
            if c.live_item(id).is_none() {
                c.items.remove(id);
                return Err(DocumentError::NotFound);
            }
            let new_ttl = if field == "ttl" {
                let ttl = value.as_i64().ok_or_else(|| {
                    DocumentError::BadRequest("ttl must be an integer".to_string())
                })?;
                validate_ttl(ttl)?;
                Some(ttl)
            } else {
                None
            };
            let item = c.items.get_mut(id).ok_or(DocumentError::NotFound)?;
            if let Some(obj) = item.document.as_object_mut() {
                obj.insert(field.to_string(), value);
            }
            if let Some(ttl) = new_ttl {
                item.ttl = Some(ttl);
            }
            // A patch is a write, so the expiry clock restarts here.
            item.written_at = Instant::now();
            Ok(())
        })
    }

    async fn read_all(&self, container: &ContainerRef) -> Result<Vec<Value>, DocumentError> {
        self.with_container(container, |c| {
            c.sweep();
            Ok(c.items.values().map(|item| item.document.clone()).collect())
        })
    }

    async fn count(&self, container: &ContainerRef) -> Result<u64, DocumentError> {
        self.with_container(container, |c| {
            c.sweep();
            Ok(c.items.len() as u64)
        })
    }

    async fn delete_container(&self, container: &ContainerRef) -> Result<(), DocumentError> {
        let mut databases = self.databases.write();
        let database = databases
            .get_mut(container.database())
            .ok_or(DocumentError::NotFound)?;
        database
            .containers
            .remove(container.id())
            .ok_or(DocumentError::NotFound)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::time::sleep;
    use tokio_test::assert_ok;

    async fn provisioned(client: &MemoryDocumentClient) -> ContainerRef {
        let db = client.ensure_database("app").await.unwrap();
        client
            .ensure_container(&db, "items", "/id", Some(-1))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn provisioning_is_idempotent() {
        let client = MemoryDocumentClient::new();
        let db = assert_ok!(client.ensure_database("app").await);
        let again = assert_ok!(client.ensure_database("app").await);
        assert_eq!(db, again);

        let container = assert_ok!(client.ensure_container(&db, "items", "/id", Some(-1)).await);
        let again = assert_ok!(client.ensure_container(&db, "items", "/id", Some(-1)).await);
        assert_eq!(container, again);
    }

    #[tokio::test]
    async fn existing_container_keeps_its_settings() {
        let client = MemoryDocumentClient::new();
        let db = client.ensure_database("app").await.unwrap();
        let container = client
            .ensure_container(&db, "items", "/id", Some(1))
            .await
            .unwrap();
        // Re-ensuring with different settings must not change the default.
        client
            .ensure_container(&db, "items", "/id", Some(-1))
            .await
            .unwrap();

        client
            .upsert(&container, json!({ "id": "a", "v": 1 }))
            .await
            .unwrap();
        sleep(Duration::from_millis(1_100)).await;
        let read = client.point_read(&container, "a", "a").await.unwrap();
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn create_conflicts_on_a_live_item() {
        let client = MemoryDocumentClient::new();
        let container = provisioned(&client).await;
        client
            .create(&container, json!({ "id": "a" }))
            .await
            .unwrap();
        let err = client.create(&container, json!({ "id": "a" })).await;
        assert_eq!(err, Err(DocumentError::Conflict));
    }

    #[tokio::test]
    async fn absent_items_read_none_and_delete_not_found() {
        let client = MemoryDocumentClient::new();
        let container = provisioned(&client).await;
        let read = client.point_read(&container, "missing", "missing").await;
        assert_eq!(read, Ok(None));
        let deleted = client.delete(&container, "missing", "missing").await;
        assert_eq!(deleted, Err(DocumentError::NotFound));
    }

    #[tokio::test]
    async fn wrong_partition_key_misses() {
        let client = MemoryDocumentClient::new();
        let container = provisioned(&client).await;
        client
            .upsert(&container, json!({ "id": "a" }))
            .await
            .unwrap();
        let read = client.point_read(&container, "a", "b").await.unwrap();
        assert!(read.is_none());
        let deleted = client.delete(&container, "a", "b").await;
        assert_eq!(deleted, Err(DocumentError::NotFound));
    }

    #[tokio::test]
    async fn items_expire_per_their_own_ttl() {
        let client = MemoryDocumentClient::new();
        let container = provisioned(&client).await;
        client
            .upsert(&container, json!({ "id": "short", "ttl": 1 }))
            .await
            .unwrap();
        client
            .upsert(&container, json!({ "id": "pinned", "ttl": -1 }))
            .await
            .unwrap();
        client
            .upsert(&container, json!({ "id": "plain" }))
            .await
            .unwrap();

        sleep(Duration::from_millis(1_200)).await;

        assert!(client
            .point_read(&container, "short", "short")
            .await
            .unwrap()
            .is_none());
        assert!(client
            .point_read(&container, "pinned", "pinned")
            .await
            .unwrap()
            .is_some());
        assert!(client
            .point_read(&container, "plain", "plain")
            .await
            .unwrap()
            .is_some());
        assert_eq!(client.count(&container).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn patching_ttl_restarts_the_expiry_clock() {
        let client = MemoryDocumentClient::new();
        let container = provisioned(&client).await;
        client
            .upsert(&container, json!({ "id": "a", "ttl": 1 }))
            .await
            .unwrap();

        sleep(Duration::from_millis(600)).await;
        client
            .patch_field(&container, "a", "a", "/ttl", json!(1))
            .await
            .unwrap();

        // Past the original deadline but within the restarted one.
        sleep(Duration::from_millis(600)).await;
        assert!(client.point_read(&container, "a", "a").await.unwrap().is_some());

        sleep(Duration::from_millis(700)).await;
        assert!(client.point_read(&container, "a", "a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn patch_rejects_bad_paths_and_values() {
        let client = MemoryDocumentClient::new();
        let container = provisioned(&client).await;
        client
            .upsert(&container, json!({ "id": "a" }))
            .await
            .unwrap();

        let nested = client
            .patch_field(&container, "a", "a", "/nested/field", json!(1))
            .await;
        assert!(matches!(nested, Err(DocumentError::BadRequest(_))));

        let zero = client
            .patch_field(&container, "a", "a", "/ttl", json!(0))
            .await;
        assert!(matches!(zero, Err(DocumentError::BadRequest(_))));

        let missing = client
            .patch_field(&container, "missing", "missing", "/ttl", json!(10))
            .await;
        assert_eq!(missing, Err(DocumentError::NotFound));
    }

    #[tokio::test]
    async fn delete_container_drops_everything() {
        let client = MemoryDocumentClient::new();
        let container = provisioned(&client).await;
        client
            .upsert(&container, json!({ "id": "a" }))
            .await
            .unwrap();
        client.delete_container(&container).await.unwrap();

        let read = client.point_read(&container, "a", "a").await;
        assert_eq!(read, Err(DocumentError::NotFound));
        let again = client.delete_container(&container).await;
        assert_eq!(again, Err(DocumentError::NotFound));
    }

    #[tokio::test]
    async fn invalid_documents_are_rejected() {
        let client = MemoryDocumentClient::new();
        let container = provisioned(&client).await;

        let no_id = client.upsert(&container, json!({ "v": 1 })).await;
        assert!(matches!(no_id, Err(DocumentError::BadRequest(_))));

        let zero_ttl = client
            .upsert(&container, json!({ "id": "a", "ttl": 0 }))
            .await;
        assert!(matches!(zero_ttl, Err(DocumentError::BadRequest(_))));

        let db = client.ensure_database("app").await.unwrap();
        let bad_default = client.ensure_container(&db, "other", "/id", Some(0)).await;
        assert!(matches!(bad_default, Err(DocumentError::BadRequest(_))));
    }
}
