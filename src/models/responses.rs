//! Response DTOs for the proxy control API
//!
//! Defines the structure of outgoing JSON bodies on the `/__proxy` routes.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::proxy::{LifecycleState, MessageOutcome};

/// Response body for the message endpoint (POST /__proxy/message)
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    /// What the proxy did with the message
    pub outcome: MessageOutcome,
    /// Lifecycle state after handling it
    pub state: LifecycleState,
}

impl MessageResponse {
    /// Creates a new MessageResponse
    pub fn new(outcome: MessageOutcome, state: LifecycleState) -> Self {
        Self { outcome, state }
    }
}

/// Response body for the stats endpoint (GET /__proxy/stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Current version tag
    pub version: String,
    /// Lifecycle state
    pub state: LifecycleState,
    /// Existing store names in creation order
    pub stores: Vec<String>,
    /// Entries in the current store
    pub total_entries: usize,
    /// Requests answered from the store
    pub hits: u64,
    /// Requests sent to the network
    pub misses: u64,
    /// Successful write-backs
    pub fills: u64,
    /// Dropped write-backs
    pub fill_failures: u64,
    /// Rejected network fetches
    pub network_failures: u64,
    /// Navigations answered with the offline document
    pub offline_fallbacks: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from proxy statistics
    pub fn new(
        version: impl Into<String>,
        state: LifecycleState,
        stores: Vec<String>,
        total_entries: usize,
        stats: &CacheStats,
    ) -> Self {
        Self {
            version: version.into(),
            state,
            stores,
            total_entries,
            hits: stats.hits,
            misses: stats.misses,
            fills: stats.fills,
            fill_failures: stats.fill_failures,
            network_failures: stats.network_failures,
            offline_fallbacks: stats.offline_fallbacks,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /__proxy/health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
