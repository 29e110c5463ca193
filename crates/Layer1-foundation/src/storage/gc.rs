//! Background sweep of expired store entries

use super::SharedStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Run `cleanup_expired` every `interval` until the handle is aborted.
///
/// Must be called from inside a tokio runtime.
pub fn spawn_gc(store: Arc<dyn SharedStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match store.cleanup_expired() {
                Ok(0) => {}
                Ok(removed) => debug!("Store GC removed {} expired entries", removed),
                Err(e) => warn!("Store GC failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn test_gc_sweeps_expired_entries() {
        let store = Arc::new(MemoryStore::new());
        store
            .set("team", "tmp", b"1", Some(Duration::from_millis(5)))
            .unwrap();

        let handle = spawn_gc(store.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(80)).await;
        handle.abort();

        assert!(store.is_empty());
    }
}
