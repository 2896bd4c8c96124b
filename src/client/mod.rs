//! Document database client seam
//!
//! The store talks to its backing database through [`DocumentClient`], so any
//! Cosmos-compatible account, emulator, or test double can sit behind it.
//! [`MemoryDocumentClient`] is the bundled in-process implementation.

mod memory;
mod traits;

pub use memory::MemoryDocumentClient;
pub use traits::{ContainerRef, DatabaseRef, DocumentClient, DocumentError};
