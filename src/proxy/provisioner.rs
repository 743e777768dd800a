//! Provisioner
//!
//! Pre-populates the current store from the manifest at install time.

use serde::Serialize;
use tracing::{info, warn};

use crate::cache::CacheStorage;
use crate::config::ProxyConfig;
use crate::error::Result;
use crate::fetch::{Network, ProxyRequest};

/// Which manifest ended up in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionOutcome {
    /// Every manifest entry was stored
    Full,
    /// Only the reduced same-origin manifest was stored
    Reduced,
}

/// Opens the current store and fills it from the manifest.
///
/// The full manifest is stored as one batch. If any entry fails, nothing
/// from it is kept and the reduced manifest is tried instead; a failure of
/// that second batch is returned to the caller.
pub async fn provision(
    storage: &CacheStorage,
    network: &dyn Network,
    config: &ProxyConfig,
) -> Result<ProvisionOutcome> {
    let store = storage.open(&config.version_tag).await;
    info!("Opened store '{}'", store.name());

    let full = manifest_requests(config, &config.manifest);
    match store.add_all(network, &full).await {
        Ok(()) => {
            info!("Provisioned {} resources", full.len());
            Ok(ProvisionOutcome::Full)
        }
        Err(err) => {
            warn!("Some assets could not be cached: {}", err);
            let reduced = manifest_requests(config, &config.fallback_manifest);
            store.add_all(network, &reduced).await?;
            info!("Provisioned {} essential resources", reduced.len());
            Ok(ProvisionOutcome::Reduced)
        }
    }
}

fn manifest_requests(config: &ProxyConfig, identifiers: &[String]) -> Vec<ProxyRequest> {
    identifiers
        .iter()
        .map(|id| ProxyRequest::subresource(config.resolve(id)))
        .collect()
}
