//! Interceptor
//!
//! Answers intercepted requests: store first, then network, then offline
//! fallbacks.

use tracing::{debug, warn};

use super::OfflineCacheProxy;
use crate::fetch::{ProxyRequest, ProxyResponse};
use crate::tasks::spawn_cache_fill;

/// What the proxy did with a request.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The proxy answered the request
    Respond(ProxyResponse),
    /// The proxy declined; the host should send the request on unmodified
    Passthrough(ProxyRequest),
}

impl OfflineCacheProxy {
    // == Fetch ==
    /// Handles one outgoing request.
    ///
    /// Requests are only intercepted once this version is activated and only
    /// for same-origin or allow-listed external URLs. Lookup happens before
    /// any network fetch, which happens before any write-back.
    pub async fn on_fetch(&self, request: ProxyRequest) -> FetchOutcome {
        if !self.lifecycle.intercepting() || !self.config.is_interceptable(&request.url) {
            return FetchOutcome::Passthrough(request);
        }

        if let Some(store) = self.storage.get(&self.config.version_tag).await {
            if let Some(hit) = store.match_request(&request).await {
                self.stats.write().await.record_hit();
                debug!("Hit: {} {}", request.method, request.url);
                return FetchOutcome::Respond(hit);
            }
        }
        self.stats.write().await.record_miss();
        debug!("Miss: {} {}", request.method, request.url);

        match self.network.fetch(&request).await {
            Ok(response) => {
                if !response.is_cacheable() {
                    return FetchOutcome::Respond(response);
                }
                // Detached: the write-back is fire-and-forget.
                drop(spawn_cache_fill(
                    self.storage.clone(),
                    self.config.version_tag.clone(),
                    request,
                    response.duplicate(),
                    self.stats.clone(),
                ));
                FetchOutcome::Respond(response)
            }
            Err(err) => {
                self.stats.write().await.record_network_failure();
                warn!("Network failure for {}: {}", request.url, err);
                FetchOutcome::Respond(self.offline_response(&request).await)
            }
        }
    }

    async fn offline_response(&self, request: &ProxyRequest) -> ProxyResponse {
        if !request.is_navigation() {
            return ProxyResponse::offline();
        }

        let fallback = ProxyRequest::navigate(self.config.resolve(&self.config.navigation_fallback));
        match self.storage.match_any(&fallback).await {
            Some(document) => {
                self.stats.write().await.record_offline_fallback();
                document
            }
            None => {
                warn!("No offline document for {}", request.url);
                ProxyResponse::network_error()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::http::{header, Method};

    use crate::cache::CacheStorage;
    use crate::config::ProxyConfig;
    use crate::fetch::{InMemoryNetwork, RequestMode, ResponseType, OFFLINE_BODY};

    const ORIGIN: &str = "http://app.test";
    const VERSION: &str = "galaxy-media-v1";

    async fn active_proxy(network: Arc<InMemoryNetwork>) -> (OfflineCacheProxy, Arc<CacheStorage>) {
        for path in ["/", "/index.html", "/styles.css", "/manifest.json"] {
            network
                .respond(&format!("{}{}", ORIGIN, path), 200, format!("cached {}", path))
                .unwrap();
        }
        let storage = Arc::new(CacheStorage::new());
        let config = ProxyConfig {
            origin: ORIGIN.to_string(),
            ..ProxyConfig::default()
        };
        let proxy = OfflineCacheProxy::new(config, storage.clone(), network);
        proxy.start().await.unwrap();
        (proxy, storage)
    }

    fn url(path: &str) -> String {
        format!("{}{}", ORIGIN, path)
    }

    fn respond(outcome: FetchOutcome) -> ProxyResponse {
        match outcome {
            FetchOutcome::Respond(response) => response,
            FetchOutcome::Passthrough(request) => panic!("unexpected passthrough of {}", request.url),
        }
    }

    async fn wait_for_entry(storage: &CacheStorage, request: &ProxyRequest) -> bool {
        for _ in 0..50 {
            if let Some(store) = storage.get(VERSION).await {
                if store.match_request(request).await.is_some() {
                    return true;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_hit_served_without_network() {
        let network = Arc::new(InMemoryNetwork::new());
        let (proxy, _) = active_proxy(network.clone()).await;
        let before = network.total_requests();

        let response = respond(proxy.on_fetch(ProxyRequest::subresource(url("/styles.css"))).await);

        assert_eq!(&response.body[..], b"cached /styles.css");
        assert_eq!(network.total_requests(), before);
        assert_eq!(proxy.stats().await.hits, 1);
    }

    #[tokio::test]
    async fn test_hit_ignores_fresher_network_copy() {
        let network = Arc::new(InMemoryNetwork::new());
        let (proxy, _) = active_proxy(network.clone()).await;
        network.respond(&url("/styles.css"), 200, "fresh").unwrap();

        let response = respond(proxy.on_fetch(ProxyRequest::subresource(url("/styles.css"))).await);
        assert_eq!(&response.body[..], b"cached /styles.css");
    }

    #[tokio::test]
    async fn test_miss_fills_store() {
        let network = Arc::new(InMemoryNetwork::new());
        let (proxy, storage) = active_proxy(network.clone()).await;
        network.respond(&url("/app.js"), 200, "js").unwrap();

        let request = ProxyRequest::subresource(url("/app.js"));
        let response = respond(proxy.on_fetch(request.clone()).await);
        assert_eq!(&response.body[..], b"js");

        assert!(wait_for_entry(&storage, &request).await);
        network.set_offline(true).unwrap();
        let again = respond(proxy.on_fetch(request.clone()).await);
        assert_eq!(again.status, 200);
        assert_eq!(&again.body[..], b"js");
        assert_eq!(network.request_count(&url("/app.js")), 1);
    }

    #[tokio::test]
    async fn test_error_status_not_cached() {
        let network = Arc::new(InMemoryNetwork::new());
        let (proxy, storage) = active_proxy(network.clone()).await;
        network.respond(&url("/missing"), 404, "nope").unwrap();

        let request = ProxyRequest::subresource(url("/missing"));
        let response = respond(proxy.on_fetch(request.clone()).await);

        assert_eq!(response.status, 404);
        assert_eq!(&response.body[..], b"nope");
        assert!(!wait_for_entry(&storage, &request).await);
    }

    #[tokio::test]
    async fn test_error_typed_response_not_cached() {
        let network = Arc::new(InMemoryNetwork::new());
        let (proxy, storage) = active_proxy(network.clone()).await;
        network
            .respond_with(&url("/broken"), 200, "", ResponseType::Error, &[])
            .unwrap();

        let request = ProxyRequest::subresource(url("/broken"));
        let response = respond(proxy.on_fetch(request.clone()).await);

        assert_eq!(response.response_type, ResponseType::Error);
        assert!(!wait_for_entry(&storage, &request).await);
        assert_eq!(proxy.stats().await.fills, 0);
    }

    #[tokio::test]
    async fn test_non_get_success_not_stored() {
        let network = Arc::new(InMemoryNetwork::new());
        let (proxy, storage) = active_proxy(network.clone()).await;
        network.respond(&url("/api/upload"), 200, "done").unwrap();

        let request = ProxyRequest::subresource(url("/api/upload")).with_method(Method::POST);
        let response = respond(proxy.on_fetch(request).await);
        assert_eq!(response.status, 200);

        for _ in 0..50 {
            if proxy.stats().await.fill_failures == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(proxy.stats().await.fill_failures, 1);
        assert_eq!(storage.get(VERSION).await.unwrap().len().await, 4);
    }

    #[tokio::test]
    async fn test_navigation_offline_serves_index() {
        let network = Arc::new(InMemoryNetwork::new());
        let (proxy, _) = active_proxy(network.clone()).await;
        network.set_offline(true).unwrap();

        let response = respond(proxy.on_fetch(ProxyRequest::navigate(url("/gallery/42"))).await);

        assert_eq!(response.status, 200);
        assert_eq!(&response.body[..], b"cached /index.html");
        assert_eq!(proxy.stats().await.offline_fallbacks, 1);
    }

    #[tokio::test]
    async fn test_navigation_offline_without_index_is_network_error() {
        let network = Arc::new(InMemoryNetwork::new());
        let (proxy, storage) = active_proxy(network.clone()).await;
        storage
            .get(VERSION)
            .await
            .unwrap()
            .delete(&ProxyRequest::navigate(url("/index.html")))
            .await;
        network.set_offline(true).unwrap();

        let response = respond(proxy.on_fetch(ProxyRequest::navigate(url("/gallery"))).await);
        assert_eq!(response.response_type, ResponseType::Error);
    }

    #[tokio::test]
    async fn test_subresource_offline_is_503() {
        let network = Arc::new(InMemoryNetwork::new());
        let (proxy, _) = active_proxy(network.clone()).await;
        network.set_offline(true).unwrap();

        let response = respond(
            proxy
                .on_fetch(ProxyRequest::get(url("/img/cover.png"), RequestMode::NoCors))
                .await,
        );

        assert_eq!(response.status, 503);
        assert_eq!(response.status_text, "Service Unavailable");
        assert_eq!(response.headers[header::CONTENT_TYPE], "text/plain");
        assert_eq!(&response.body[..], OFFLINE_BODY.as_bytes());
        assert_eq!(proxy.stats().await.network_failures, 1);
    }

    #[tokio::test]
    async fn test_disallowed_cross_origin_passthrough() {
        let network = Arc::new(InMemoryNetwork::new());
        let (proxy, storage) = active_proxy(network.clone()).await;
        let before = network.total_requests();

        let outcome = proxy
            .on_fetch(ProxyRequest::subresource("https://fonts.example.com/font.css"))
            .await;

        assert!(matches!(outcome, FetchOutcome::Passthrough(_)));
        assert_eq!(network.total_requests(), before);
        assert_eq!(storage.get(VERSION).await.unwrap().len().await, 4);
        let stats = proxy.stats().await;
        assert_eq!(stats.hits + stats.misses, 0);
    }

    #[tokio::test]
    async fn test_allowed_cdn_is_intercepted_and_cached() {
        let network = Arc::new(InMemoryNetwork::new());
        let (proxy, storage) = active_proxy(network.clone()).await;
        let cdn = "https://cdnjs.cloudflare.com/ajax/libs/lodash.js/4.17.21/lodash.min.js";
        network
            .respond_with(cdn, 200, "lodash", ResponseType::Cors, &[])
            .unwrap();

        let request = ProxyRequest::subresource(cdn);
        respond(proxy.on_fetch(request.clone()).await);

        assert!(wait_for_entry(&storage, &request).await);
    }

    #[tokio::test]
    async fn test_not_intercepting_before_activation() {
        let network = Arc::new(InMemoryNetwork::new());
        let config = ProxyConfig {
            origin: ORIGIN.to_string(),
            ..ProxyConfig::default()
        };
        let proxy = OfflineCacheProxy::new(config, Arc::new(CacheStorage::new()), network);

        let outcome = proxy.on_fetch(ProxyRequest::navigate(url("/"))).await;
        assert!(matches!(outcome, FetchOutcome::Passthrough(_)));
    }
}
