//! Cache Fill Task
//!
//! Detached write-back of a network response into the current store.

use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::{CacheStats, CacheStorage};
use crate::fetch::{ProxyRequest, ProxyResponse};

/// Spawns a task that writes `response` into the store named `store_name`.
///
/// The store is created if it no longer exists. Failures are logged and
/// counted but never reported to whoever served the original response;
/// callers are expected to drop the returned handle.
///
/// # Arguments
/// * `storage` - Storage holding the target store
/// * `store_name` - Name of the store to write into
/// * `request` - Request the response answers
/// * `response` - A duplicate of the response handed to the caller
/// * `stats` - Counters updated with the outcome
pub fn spawn_cache_fill(
    storage: Arc<CacheStorage>,
    store_name: String,
    request: ProxyRequest,
    response: ProxyResponse,
    stats: Arc<RwLock<CacheStats>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let store = storage.open(&store_name).await;

        match store.put(&request, response).await {
            Ok(()) => {
                stats.write().await.record_fill();
                debug!("Cache fill: stored {}", request.url);
            }
            Err(err) => {
                stats.write().await.record_fill_failure();
                warn!("Cache fill: dropped {}: {}", request.url, err);
            }
        }
    })
}
