//! Offline Proxy - An offline-first caching proxy
//!
//! Fronts one application origin, answering requests from a versioned store
//! and falling back to the network.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use offline_proxy::api::{create_router, AppState};
use offline_proxy::cache::CacheStorage;
use offline_proxy::config::Config;

/// Main entry point for the offline proxy.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Load persisted stores, if a cache directory is configured
/// 4. Install and activate the current version
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM and persist stores
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "offline_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Offline Proxy");

    let config = Config::from_env();
    info!(
        "Configuration loaded: origin={}, version={}, port={}, cache_dir={:?}",
        config.origin, config.version_tag, config.server_port, config.cache_dir
    );

    let storage = match &config.cache_dir {
        Some(dir) => CacheStorage::load_or_empty(dir).await,
        None => CacheStorage::new(),
    };
    let storage = Arc::new(storage);

    let state = AppState::from_config(&config, storage.clone());
    let report = state
        .proxy
        .start()
        .await
        .context("installing current version")?;
    if let Some(warning) = &report.warning {
        warn!("Installed with warning: {}", warning);
    }
    info!(
        "Proxy is {} with stores {:?}",
        state.proxy.lifecycle().state(),
        storage.keys().await
    );

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving requests")?;

    if let Some(dir) = &config.cache_dir {
        storage
            .save_to(dir)
            .await
            .with_context(|| format!("saving stores to {}", dir.display()))?;
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
