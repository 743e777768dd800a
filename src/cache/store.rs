//! Named Store Module
//!
//! A single versioned store mapping request identifiers to response snapshots.

use std::collections::HashMap;

use futures::future::try_join_all;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::StoredResponseSnapshot;
use crate::error::{ProxyError, Result};
use crate::fetch::{Network, ProxyRequest, ProxyResponse, RequestKey, ResponseType};

// == Named Store ==
/// One named store of request/response pairs.
///
/// Writes to the same key are serialized by the inner lock; the last write wins.
#[derive(Debug)]
pub struct NamedStore {
    /// Store name (the version tag for the current store)
    name: String,
    /// Snapshot storage
    entries: RwLock<HashMap<RequestKey, StoredResponseSnapshot>>,
}

impl NamedStore {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_entries(name, HashMap::new())
    }

    /// Creates a store pre-filled with snapshots.
    pub fn with_entries(
        name: impl Into<String>,
        entries: HashMap<RequestKey, StoredResponseSnapshot>,
    ) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(entries),
        }
    }

    /// Returns the store name.
    pub fn name(&self) -> &str {
        &self.name
    }

    // == Match ==
    /// Looks up an exact match for the request.
    ///
    /// Only GET requests can match. No freshness check is made.
    pub async fn match_request(&self, request: &ProxyRequest) -> Option<ProxyResponse> {
        self.match_key(&request.key()).await
    }

    /// Looks up an exact match for a key.
    pub async fn match_key(&self, key: &RequestKey) -> Option<ProxyResponse> {
        if !key.is_get() {
            return None;
        }
        let entries = self.entries.read().await;
        entries.get(key).map(StoredResponseSnapshot::to_response)
    }

    // == Put ==
    /// Stores a response for the request, replacing any previous snapshot.
    ///
    /// Rejects non-GET requests, partial (206) responses, network errors and
    /// responses carrying `Vary: *`.
    pub async fn put(&self, request: &ProxyRequest, response: ProxyResponse) -> Result<()> {
        let key = request.key();
        check_storable(&key, &response)?;

        let snapshot = StoredResponseSnapshot::capture(response);
        self.entries.write().await.insert(key.clone(), snapshot);
        debug!("Store '{}': stored {}", self.name, key);
        Ok(())
    }

    // == Add All ==
    /// Fetches every request and stores all responses as one batch.
    ///
    /// Fetches run concurrently. If any fetch is rejected or returns a
    /// non-2xx status, nothing is stored and the first error is returned.
    pub async fn add_all(&self, network: &dyn Network, requests: &[ProxyRequest]) -> Result<()> {
        let responses = try_join_all(requests.iter().map(|request| async move {
            let response = network.fetch(request).await?;
            if !response.ok() {
                return Err(ProxyError::StoreRejected(format!(
                    "{} returned status {}",
                    request.url, response.status
                )));
            }
            check_storable(&request.key(), &response)?;
            Ok::<_, ProxyError>(response)
        }))
        .await?;

        let mut entries = self.entries.write().await;
        for (request, response) in requests.iter().zip(responses) {
            entries.insert(request.key(), StoredResponseSnapshot::capture(response));
        }
        debug!("Store '{}': added batch of {}", self.name, requests.len());
        Ok(())
    }

    // == Delete ==
    /// Removes the entry for the request.
    ///
    /// Returns true if an entry was removed.
    pub async fn delete(&self, request: &ProxyRequest) -> bool {
        self.entries.write().await.remove(&request.key()).is_some()
    }

    // == Keys ==
    /// Returns all stored keys in sorted order.
    pub async fn keys(&self) -> Vec<RequestKey> {
        let mut keys: Vec<RequestKey> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Returns a copy of every entry, sorted by key.
    pub async fn entries(&self) -> Vec<(RequestKey, StoredResponseSnapshot)> {
        let mut entries: Vec<_> = self
            .entries
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    // == Length ==
    /// Returns the current number of entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    // == Is Empty ==
    /// Returns true if the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn check_storable(key: &RequestKey, response: &ProxyResponse) -> Result<()> {
    if !key.is_get() {
        return Err(ProxyError::StoreRejected(format!(
            "only GET requests can be stored: {}",
            key
        )));
    }
    if response.status == 206 {
        return Err(ProxyError::StoreRejected(format!(
            "partial response for {}",
            key
        )));
    }
    if response.response_type == ResponseType::Error {
        return Err(ProxyError::StoreRejected(format!(
            "network error response for {}",
            key
        )));
    }
    let vary_all = response
        .headers
        .get_all("vary")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.split(',').any(|part| part.trim() == "*"));
    if vary_all {
        return Err(ProxyError::StoreRejected(format!("Vary: * on {}", key)));
    }
    Ok(())
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::InMemoryNetwork;
    use axum::http::Method;

    fn ok_response(body: &'static str) -> ProxyResponse {
        ProxyResponse::new(200, body, ResponseType::Basic)
    }

    #[tokio::test]
    async fn test_store_new() {
        let store = NamedStore::new("v1");
        assert_eq!(store.name(), "v1");
        assert_eq!(store.len().await, 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_put_and_match() {
        let store = NamedStore::new("v1");
        let request = ProxyRequest::subresource("http://a/app.js");

        store.put(&request, ok_response("js")).await.unwrap();
        let hit = store.match_request(&request).await.unwrap();

        assert_eq!(&hit.body[..], b"js");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_store_match_miss() {
        let store = NamedStore::new("v1");
        let result = store
            .match_request(&ProxyRequest::subresource("http://a/none"))
            .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_store_overwrite_replaces_snapshot() {
        let store = NamedStore::new("v1");
        let request = ProxyRequest::subresource("http://a/app.js");

        store
            .put(
                &request,
                ok_response("old").with_header("x-version", "1"),
            )
            .await
            .unwrap();
        store.put(&request, ok_response("new")).await.unwrap();

        let hit = store.match_request(&request).await.unwrap();
        assert_eq!(&hit.body[..], b"new");
        assert!(hit.headers.get("x-version").is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_store_rejects_non_get() {
        let store = NamedStore::new("v1");
        let request = ProxyRequest::subresource("http://a/form").with_method(Method::POST);

        let result = store.put(&request, ok_response("x")).await;
        assert!(matches!(result, Err(ProxyError::StoreRejected(_))));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_rejects_partial_and_vary_star() {
        let store = NamedStore::new("v1");
        let request = ProxyRequest::subresource("http://a/video");

        let partial = ProxyResponse::new(206, "x", ResponseType::Basic);
        assert!(store.put(&request, partial).await.is_err());

        let vary = ok_response("x").with_header("vary", "Accept, *");
        assert!(store.put(&request, vary).await.is_err());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_non_get_never_matches() {
        let store = NamedStore::new("v1");
        let get = ProxyRequest::subresource("http://a/x");
        store.put(&get, ok_response("x")).await.unwrap();

        let head = ProxyRequest::subresource("http://a/x").with_method(Method::HEAD);
        assert!(store.match_request(&head).await.is_none());
    }

    #[tokio::test]
    async fn test_store_delete() {
        let store = NamedStore::new("v1");
        let request = ProxyRequest::subresource("http://a/x");
        store.put(&request, ok_response("x")).await.unwrap();

        assert!(store.delete(&request).await);
        assert!(!store.delete(&request).await);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_add_all_stores_every_response() {
        let network = InMemoryNetwork::new();
        network.respond("http://a/", 200, "root").unwrap();
        network.respond("http://a/styles.css", 200, "css").unwrap();

        let store = NamedStore::new("v1");
        let requests = vec![
            ProxyRequest::subresource("http://a/"),
            ProxyRequest::subresource("http://a/styles.css"),
        ];
        store.add_all(&network, &requests).await.unwrap();

        assert_eq!(store.len().await, 2);
        let keys = store.keys().await;
        assert_eq!(keys[0].url, "http://a/");
        assert_eq!(keys[1].url, "http://a/styles.css");
    }

    #[tokio::test]
    async fn test_add_all_is_all_or_nothing() {
        let network = InMemoryNetwork::new();
        network.respond("http://a/", 200, "root").unwrap();
        network.fail("http://cdn/font.woff2").unwrap();

        let store = NamedStore::new("v1");
        let requests = vec![
            ProxyRequest::subresource("http://a/"),
            ProxyRequest::subresource("http://cdn/font.woff2"),
        ];

        assert!(store.add_all(&network, &requests).await.is_err());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_add_all_rejects_error_status() {
        let network = InMemoryNetwork::new();
        network.respond("http://a/", 200, "root").unwrap();
        network.respond("http://a/missing", 404, "").unwrap();

        let store = NamedStore::new("v1");
        let requests = vec![
            ProxyRequest::subresource("http://a/"),
            ProxyRequest::subresource("http://a/missing"),
        ];

        let result = store.add_all(&network, &requests).await;
        assert!(matches!(result, Err(ProxyError::StoreRejected(_))));
        assert!(store.is_empty().await);
    }
}
