//! Offline Proxy - An offline-first caching proxy
//!
//! Serves stored responses when available, fills its versioned store from
//! live traffic, and falls back to an offline document or a 503 when the
//! network is unreachable.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod proxy;
pub mod tasks;

pub use api::AppState;
pub use config::{Config, ProxyConfig};
pub use proxy::OfflineCacheProxy;
pub use tasks::spawn_cache_fill;
