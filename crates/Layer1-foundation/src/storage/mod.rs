//! Storage module for Crew
//!
//! Namespaced key/value store with optional TTL, used as the durable
//! backing for team shared memory and the coordination log.
//!
//! - `memory`: in-process map, expires lazily on read
//! - `file`: one JSON file per key under `root/<namespace>/`
//! - `gc`: periodic sweep of expired entries

mod file;
mod gc;
mod memory;

pub use file::FileStore;
pub use gc::spawn_gc;
pub use memory::MemoryStore;

use crate::config::{CrewSettings, StoreKind};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;

/// Shared key/value store
///
/// Implementations must be safe to use from several teams at once.
/// Values are opaque bytes; callers decide the encoding.
pub trait SharedStore: Send + Sync {
    /// Store `value` under `(namespace, key)`. `None` ttl never expires.
    fn set(&self, namespace: &str, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()>;

    /// Read a live value. Expired entries read as `None`.
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>>;

    fn delete(&self, namespace: &str, key: &str) -> Result<()>;

    /// All keys in a namespace, in no particular order
    fn keys(&self, namespace: &str) -> Result<Vec<String>>;

    /// Drop every expired entry, returning how many were removed
    fn cleanup_expired(&self) -> Result<usize>;
}

/// Build the store selected by the settings
pub fn store_from_settings(settings: &CrewSettings) -> Result<Arc<dyn SharedStore>> {
    match settings.store.kind {
        StoreKind::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreKind::File => Ok(Arc::new(FileStore::new(settings.store.resolved_path())?)),
    }
}
