//! # cosmos-session-store
//!
//! An express-session compatible session store backed by a Cosmos-style
//! document database. Session records keep the exact wire shape connect
//! middleware produces, so a store provisioned here can share a container
//! with Node services using `connect-cosmosdb`-style adapters.
//!
//! The store leans on the database for the heavy lifting: the session id is
//! the partition key, every operation is a point operation, and expiry is
//! delegated to per-item TTL instead of a reaper task.
//!
//! ## Features
//!
//! - One store per process, created through [`CosmosStore::initialize`],
//!   which also provisions the database and container idempotently
//! - TTL resolved per write: a custom policy wins, then the cookie's
//!   expiration time, then a fixed fallback of one day
//! - `touch` refreshes a session's lifetime with a single-field patch and
//!   never fails the request that triggered it
//! - Pluggable [`DocumentClient`] seam with a bundled in-memory
//!   implementation for tests and local development
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use cosmos_session_store::{
//!     CosmosStore, CosmosStoreOptions, MemoryDocumentClient, SessionRecord,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(MemoryDocumentClient::new());
//!     let store = CosmosStore::initialize(
//!         CosmosStoreOptions::new(client, "my-app").with_ttl_secs(3600),
//!     )
//!     .await?;
//!
//!     let mut record = SessionRecord::new(3600);
//!     record.set("user", "alice");
//!     store.set("sid-1", &record).await?;
//!
//!     let loaded = store.get("sid-1").await?.unwrap();
//!     assert_eq!(loaded.get::<String>("user").as_deref(), Some("alice"));
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod store;
pub mod ttl;

pub use client::{ContainerRef, DatabaseRef, DocumentClient, DocumentError, MemoryDocumentClient};
pub use config::{CosmosStoreOptions, DEFAULT_CONTAINER_NAME};
pub use error::SessionError;
pub use session::{SessionCookie, SessionRecord};
pub use store::CosmosStore;
pub use ttl::{TtlPolicy, DEFAULT_SESSION_TTL_SECS};
