//! Basic example using the in-memory document client

use std::sync::Arc;

use cosmos_session_store::{
    CosmosStore, CosmosStoreOptions, MemoryDocumentClient, SessionRecord,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up logging
    tracing_subscriber::fmt::init();

    // Create the in-memory client; swap in a real Cosmos client in production
    let client = Arc::new(MemoryDocumentClient::new());

    // Initialize the process-wide store; this provisions the database and
    // the session container
    let store = CosmosStore::initialize(
        CosmosStoreOptions::new(client, "example-app").with_ttl_secs(3600), // 1 hour
    )
    .await?;
    println!(
        "Store ready: {}/{}",
        store.database_name(),
        store.container_name()
    );

    // Store a session the way connect middleware would
    let mut record = SessionRecord::new(3600);
    record.set("user", "alice");
    record.set("views", 1);
    store.set("sid-1", &record).await?;
    println!("Stored session sid-1");

    // Read it back
    let loaded = store.get("sid-1").await?.expect("session should exist");
    println!(
        "Loaded session for user {:?} with ttl {:?}",
        loaded.get::<String>("user"),
        loaded.ttl
    );

    // Refresh its lifetime without rewriting the data
    store.touch("sid-1", &loaded).await?;
    println!("Touched session sid-1");

    // Count live sessions
    println!("Live sessions: {}", store.length().await?);

    // Remove it
    store.destroy("sid-1").await?;
    println!("Destroyed session sid-1");
    println!("Live sessions: {}", store.length().await?);

    Ok(())
}
