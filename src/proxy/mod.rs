//! Proxy Module
//!
//! The offline cache proxy and its lifecycle reactions.
//!
//! # Reactions
//! - `on_install` - pre-populate the current store from the manifest
//! - `on_activate` - delete stale stores and claim open clients
//! - `on_fetch` - answer intercepted requests from store or network
//! - `on_message` - handle control messages from application pages

mod interceptor;
mod lifecycle;
mod message;
mod provisioner;
mod reaper;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::cache::{CacheStats, CacheStorage};
use crate::config::ProxyConfig;
use crate::error::Result;
use crate::fetch::Network;

pub use interceptor::FetchOutcome;
pub use lifecycle::{Lifecycle, LifecycleState};
pub use message::ControlMessage;
pub use provisioner::{provision, ProvisionOutcome};
pub use reaper::reap;

// == Reports ==
/// Result of an install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    /// Manifest that was stored, if any
    pub outcome: Option<ProvisionOutcome>,
    /// Installation warning raised when even the reduced manifest failed
    pub warning: Option<String>,
}

/// Result of an activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    /// Stale stores that were deleted
    pub deleted: Vec<String>,
}

/// Result of handling a control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageOutcome {
    /// Payload was not a recognised message
    Ignored,
    /// Skip-waiting was requested
    SkipWaiting {
        /// True if this message moved a waiting version to activated
        activated: bool,
    },
}

// == Offline Cache Proxy ==
/// One version of the offline cache proxy.
///
/// Cheap to clone; clones share storage, network, lifecycle and stats.
#[derive(Clone)]
pub struct OfflineCacheProxy {
    config: Arc<ProxyConfig>,
    storage: Arc<CacheStorage>,
    network: Arc<dyn Network>,
    lifecycle: Arc<Lifecycle>,
    stats: Arc<RwLock<CacheStats>>,
}

impl OfflineCacheProxy {
    /// Creates a proxy in the `Parsed` state.
    pub fn new(config: ProxyConfig, storage: Arc<CacheStorage>, network: Arc<dyn Network>) -> Self {
        Self {
            config: Arc::new(config),
            storage,
            network,
            lifecycle: Arc::new(Lifecycle::new()),
            stats: Arc::new(RwLock::new(CacheStats::new())),
        }
    }

    /// Returns the proxy configuration.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Returns the storage this proxy manages.
    pub fn storage(&self) -> &Arc<CacheStorage> {
        &self.storage
    }

    /// Returns the network requests are sent to.
    pub fn network(&self) -> &Arc<dyn Network> {
        &self.network
    }

    /// Returns the lifecycle tracker.
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Returns a copy of the current statistics.
    pub async fn stats(&self) -> CacheStats {
        self.stats.read().await.clone()
    }

    // == Install ==
    /// Installs this version.
    ///
    /// Requests skip-waiting up front so the version activates as soon as
    /// install completes. A failed reduced manifest is reported as a warning;
    /// the install itself still completes.
    pub async fn on_install(&self) -> Result<InstallReport> {
        self.lifecycle.begin_install()?;
        self.lifecycle.skip_waiting();

        let report = match provision(&self.storage, self.network.as_ref(), &self.config).await {
            Ok(outcome) => InstallReport {
                outcome: Some(outcome),
                warning: None,
            },
            Err(err) => {
                warn!("Install warning: essential assets could not be cached: {}", err);
                InstallReport {
                    outcome: None,
                    warning: Some(err.to_string()),
                }
            }
        };

        self.lifecycle.finish_install()?;
        info!("Installed version '{}'", self.config.version_tag);
        Ok(report)
    }

    // == Activate ==
    /// Activates this version: deletes stale stores, then claims clients.
    pub async fn on_activate(&self) -> Result<ActivateReport> {
        self.lifecycle.begin_activate()?;
        self.complete_activation().await
    }

    async fn complete_activation(&self) -> Result<ActivateReport> {
        let deleted = reap(&self.storage, &self.config.version_tag).await;
        self.lifecycle.claim_clients();

        self.lifecycle.finish_activate()?;
        info!(
            "Activated version '{}', deleted {} stale stores",
            self.config.version_tag,
            deleted.len()
        );
        Ok(ActivateReport { deleted })
    }

    // == Message ==
    /// Handles a control message payload.
    ///
    /// `{"type": "SKIP_WAITING"}` activates a waiting version immediately;
    /// every other payload is ignored.
    pub async fn on_message(&self, payload: &Value) -> Result<MessageOutcome> {
        match ControlMessage::parse(payload) {
            Some(ControlMessage::SkipWaiting) => {
                self.lifecycle.skip_waiting();
                let activated = self.activate_if_ready().await?;
                Ok(MessageOutcome::SkipWaiting { activated })
            }
            None => Ok(MessageOutcome::Ignored),
        }
    }

    // == Start ==
    /// Runs install and, if skip-waiting was requested, activation.
    pub async fn start(&self) -> Result<InstallReport> {
        let report = self.on_install().await?;
        self.activate_if_ready().await?;
        Ok(report)
    }

    async fn activate_if_ready(&self) -> Result<bool> {
        if !self.lifecycle.begin_activate_if_ready() {
            return Ok(false);
        }
        self.complete_activation().await?;
        Ok(true)
    }
}
