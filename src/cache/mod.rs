//! Cache Module
//!
//! Versioned response stores: snapshots, named stores and the registry
//! that owns them.

mod snapshot;
mod stats;
mod storage;
mod store;


// Re-export public types
pub use snapshot::StoredResponseSnapshot;
pub use stats::CacheStats;
pub use storage::{CacheStorage, STORAGE_FILE};
pub use store::NamedStore;
