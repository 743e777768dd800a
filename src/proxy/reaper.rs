//! Reaper
//!
//! Deletes every store left behind by earlier versions.

use futures::future::join_all;
use tracing::{debug, info};

use crate::cache::CacheStorage;

/// Deletes all stores not named `current`, concurrently.
///
/// Returns the names that were actually removed. A store that vanished
/// before its deletion ran is skipped, not retried.
pub async fn reap(storage: &CacheStorage, current: &str) -> Vec<String> {
    let stale: Vec<String> = storage
        .keys()
        .await
        .into_iter()
        .filter(|name| name != current)
        .collect();

    let results = join_all(stale.into_iter().map(|name| async move {
        info!("Deleting old store: {}", name);
        let removed = storage.delete(&name).await;
        (name, removed)
    }))
    .await;

    results
        .into_iter()
        .filter_map(|(name, removed)| {
            if !removed {
                debug!("Store '{}' was already gone", name);
            }
            removed.then_some(name)
        })
        .collect()
}
