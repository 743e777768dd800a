//! Cache Storage Module
//!
//! The origin's registry of named stores, kept in creation order, with
//! optional persistence to disk.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::{NamedStore, StoredResponseSnapshot};
use crate::error::Result;
use crate::fetch::{ProxyRequest, ProxyResponse, RequestKey};

/// File name used when persisting storage to a directory
pub const STORAGE_FILE: &str = "stores.json";

// == Persisted Form ==
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStore {
    name: String,
    entries: Vec<(RequestKey, StoredResponseSnapshot)>,
}

// == Cache Storage ==
/// All named stores of one origin.
#[derive(Debug, Default)]
pub struct CacheStorage {
    /// Stores in creation order
    stores: RwLock<Vec<Arc<NamedStore>>>,
}

impl CacheStorage {
    // == Constructor ==
    /// Creates empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    // == Open ==
    /// Returns the named store, creating it if absent.
    pub async fn open(&self, name: &str) -> Arc<NamedStore> {
        if let Some(store) = self.get(name).await {
            return store;
        }

        let mut stores = self.stores.write().await;
        // Another caller may have created it between the two locks.
        if let Some(store) = stores.iter().find(|s| s.name() == name) {
            return store.clone();
        }
        let store = Arc::new(NamedStore::new(name));
        stores.push(store.clone());
        debug!("Storage: created store '{}'", name);
        store
    }

    /// Returns the named store if it exists.
    pub async fn get(&self, name: &str) -> Option<Arc<NamedStore>> {
        self.stores
            .read()
            .await
            .iter()
            .find(|s| s.name() == name)
            .cloned()
    }

    // == Has ==
    /// Returns true if a store with this name exists.
    pub async fn has(&self, name: &str) -> bool {
        self.get(name).await.is_some()
    }

    // == Keys ==
    /// Returns store names in creation order.
    pub async fn keys(&self) -> Vec<String> {
        self.stores
            .read()
            .await
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }

    // == Delete ==
    /// Removes a store and everything in it.
    ///
    /// Returns true if a store was removed. Handles already given out keep
    /// working but are no longer reachable through this storage.
    pub async fn delete(&self, name: &str) -> bool {
        let mut stores = self.stores.write().await;
        let before = stores.len();
        stores.retain(|s| s.name() != name);
        stores.len() != before
    }

    // == Match Any ==
    /// Looks the request up in every store, in creation order.
    pub async fn match_any(&self, request: &ProxyRequest) -> Option<ProxyResponse> {
        let stores: Vec<Arc<NamedStore>> = self.stores.read().await.clone();
        for store in stores {
            if let Some(response) = store.match_request(request).await {
                return Some(response);
            }
        }
        None
    }

    // == Persistence ==
    /// Writes every store to `dir`, replacing earlier contents atomically.
    pub async fn save_to(&self, dir: &Path) -> Result<()> {
        let stores: Vec<Arc<NamedStore>> = self.stores.read().await.clone();
        let mut persisted = Vec::with_capacity(stores.len());
        for store in &stores {
            persisted.push(PersistedStore {
                name: store.name().to_string(),
                entries: store.entries().await,
            });
        }

        tokio::fs::create_dir_all(dir).await?;
        let json = serde_json::to_vec(&persisted)?;
        let tmp = dir.join(format!("{}.tmp", STORAGE_FILE));
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, dir.join(STORAGE_FILE)).await?;

        info!("Storage: saved {} stores to {}", persisted.len(), dir.display());
        Ok(())
    }

    /// Loads storage previously written with [`CacheStorage::save_to`].
    ///
    /// A directory without a storage file yields empty storage.
    pub async fn load_from(dir: &Path) -> Result<Self> {
        let path = dir.join(STORAGE_FILE);
        if !tokio::fs::try_exists(&path).await? {
            debug!("Storage: nothing persisted at {}", path.display());
            return Ok(Self::new());
        }

        let bytes = tokio::fs::read(&path).await?;
        let persisted: Vec<PersistedStore> = serde_json::from_slice(&bytes)?;
        let stores = persisted
            .into_iter()
            .map(|p| Arc::new(NamedStore::with_entries(p.name, p.entries.into_iter().collect())))
            .collect::<Vec<_>>();

        info!("Storage: loaded {} stores from {}", stores.len(), dir.display());
        Ok(Self {
            stores: RwLock::new(stores),
        })
    }

    /// Loads storage from `dir`, starting empty if it cannot be read.
    pub async fn load_or_empty(dir: &Path) -> Self {
        match Self::load_from(dir).await {
            Ok(storage) => storage,
            Err(err) => {
                warn!(
                    "Storage: ignoring unreadable stores in {}: {}",
                    dir.display(),
                    err
                );
                Self::new()
            }
        }
    }
}
