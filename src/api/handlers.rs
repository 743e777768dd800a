//! API Handlers
//!
//! HTTP request handlers for the proxy's control endpoints and for every
//! request it fronts.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::debug;

use crate::cache::CacheStorage;
use crate::config::{Config, ProxyConfig};
use crate::error::{ProxyError, Result};
use crate::fetch::{
    strip_hop_by_hop, HttpNetwork, Network, ProxyRequest, ProxyResponse, RequestMode, ResponseType,
};
use crate::models::{HealthResponse, MessageResponse, StatsResponse};
use crate::proxy::{FetchOutcome, OfflineCacheProxy};

/// Largest request body forwarded upstream
pub const MAX_REQUEST_BODY: usize = 16 * 1024 * 1024;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The proxy answering fronted requests
    pub proxy: OfflineCacheProxy,
}

impl AppState {
    /// Creates a new AppState around a proxy.
    pub fn new(proxy: OfflineCacheProxy) -> Self {
        Self { proxy }
    }

    /// Creates a new AppState from configuration.
    ///
    /// The proxy talks to the real network and starts in the `Parsed` state.
    pub fn from_config(config: &Config, storage: Arc<CacheStorage>) -> Self {
        let network: Arc<dyn Network> = Arc::new(HttpNetwork::new(config.origin.clone()));
        Self::new(OfflineCacheProxy::new(config.proxy_config(), storage, network))
    }
}

/// Fallback handler for every non-control path.
///
/// The request is handed to the proxy; requests it declines go straight to
/// the network without touching any store.
pub async fn proxy_handler(State(state): State<AppState>, request: Request) -> Result<Response> {
    let request = into_proxy_request(state.proxy.config(), request).await?;

    let response = match state.proxy.on_fetch(request).await {
        FetchOutcome::Respond(response) => response,
        FetchOutcome::Passthrough(request) => {
            debug!("Passthrough: {} {}", request.method, request.url);
            state.proxy.network().fetch(&request).await?
        }
    };

    Ok(into_http_response(response))
}

/// Handler for POST /__proxy/message
///
/// Accepts any body; only a JSON `{"type": "SKIP_WAITING"}` has an effect.
pub async fn message_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<MessageResponse>> {
    let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let outcome = state.proxy.on_message(&payload).await?;

    Ok(Json(MessageResponse::new(
        outcome,
        state.proxy.lifecycle().state(),
    )))
}

/// Handler for GET /__proxy/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let proxy = &state.proxy;
    let version = proxy.config().version_tag.clone();
    let total_entries = match proxy.storage().get(&version).await {
        Some(store) => store.len().await,
        None => 0,
    };

    Json(StatsResponse::new(
        version,
        proxy.lifecycle().state(),
        proxy.storage().keys().await,
        total_entries,
        &proxy.stats().await,
    ))
}

/// Handler for GET /__proxy/health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

// == Conversions ==
/// Turns an incoming HTTP request into a request against the fronted origin.
///
/// Absolute-form request targets (forward-proxy style) keep their own URL.
pub async fn into_proxy_request(config: &ProxyConfig, request: Request) -> Result<ProxyRequest> {
    let (parts, body) = request.into_parts();

    let url = if parts.uri.scheme().is_some() {
        parts.uri.to_string()
    } else {
        let path = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        config.resolve(path)
    };

    let body = axum::body::to_bytes(body, MAX_REQUEST_BODY)
        .await
        .map_err(|e| ProxyError::InvalidRequest(e.to_string()))?;

    Ok(ProxyRequest {
        mode: request_mode(&parts.method, &parts.headers),
        method: parts.method,
        url,
        headers: parts.headers,
        body,
    })
}

/// Infers the request mode from fetch metadata, falling back to `Accept`.
pub fn request_mode(method: &Method, headers: &HeaderMap) -> RequestMode {
    match header_str(headers, "sec-fetch-mode") {
        Some("navigate") => RequestMode::Navigate,
        Some("same-origin") => RequestMode::SameOrigin,
        Some("no-cors") => RequestMode::NoCors,
        Some("cors") => RequestMode::Cors,
        _ => {
            let wants_html = header_str(headers, header::ACCEPT.as_str())
                .map(|accept| accept.contains("text/html"))
                .unwrap_or(false);
            if *method == Method::GET && wants_html {
                RequestMode::Navigate
            } else {
                RequestMode::NoCors
            }
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Turns a proxy response into an HTTP response.
///
/// Network-error responses become `502 Bad Gateway`.
pub fn into_http_response(response: ProxyResponse) -> Response {
    if response.response_type == ResponseType::Error {
        return StatusCode::BAD_GATEWAY.into_response();
    }
    let Ok(status) = StatusCode::from_u16(response.status) else {
        return StatusCode::BAD_GATEWAY.into_response();
    };

    let mut http = Response::new(Body::from(response.body));
    *http.status_mut() = status;
    *http.headers_mut() = strip_hop_by_hop(&response.headers);
    http
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::InMemoryNetwork;
    use axum::http::HeaderValue;
    use serde_json::json;

    const ORIGIN: &str = "http://app.test";

    async fn started_state(network: Arc<InMemoryNetwork>) -> AppState {
        for path in ["/", "/index.html", "/styles.css", "/manifest.json"] {
            network
                .respond(&format!("{}{}", ORIGIN, path), 200, path.to_string())
                .unwrap();
        }
        let config = ProxyConfig {
            origin: ORIGIN.to_string(),
            ..ProxyConfig::default()
        };
        let proxy = OfflineCacheProxy::new(config, Arc::new(CacheStorage::new()), network);
        proxy.start().await.unwrap();
        AppState::new(proxy)
    }

    #[test]
    fn test_request_mode_from_fetch_metadata() {
        let mut headers = HeaderMap::new();
        headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
        assert_eq!(request_mode(&Method::GET, &headers), RequestMode::Navigate);

        headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
        assert_eq!(request_mode(&Method::GET, &headers), RequestMode::Cors);
    }

    #[test]
    fn test_request_mode_from_accept() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/html,*/*"));
        assert_eq!(request_mode(&Method::GET, &headers), RequestMode::Navigate);
        assert_eq!(request_mode(&Method::POST, &headers), RequestMode::NoCors);
        assert_eq!(request_mode(&Method::GET, &HeaderMap::new()), RequestMode::NoCors);
    }

    #[tokio::test]
    async fn test_into_proxy_request_resolves_against_origin() {
        let config = ProxyConfig {
            origin: ORIGIN.to_string(),
            ..ProxyConfig::default()
        };
        let request = axum::http::Request::builder()
            .uri("/search?q=nebula")
            .body(Body::empty())
            .unwrap();

        let proxied = into_proxy_request(&config, request).await.unwrap();
        assert_eq!(proxied.url, "http://app.test/search?q=nebula");
        assert_eq!(proxied.method, Method::GET);
    }

    #[tokio::test]
    async fn test_into_proxy_request_absolute_form() {
        let config = ProxyConfig::default();
        let request = axum::http::Request::builder()
            .uri("https://cdnjs.cloudflare.com/ajax/libs/x.js")
            .body(Body::empty())
            .unwrap();

        let proxied = into_proxy_request(&config, request).await.unwrap();
        assert_eq!(proxied.url, "https://cdnjs.cloudflare.com/ajax/libs/x.js");
    }

    #[test]
    fn test_into_http_response_network_error() {
        let response = into_http_response(ProxyResponse::network_error());
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_into_http_response_offline() {
        let response = into_http_response(ProxyResponse::offline());
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    }

    #[tokio::test]
    async fn test_message_handler_skip_waiting() {
        let state = started_state(Arc::new(InMemoryNetwork::new())).await;

        let response = message_handler(
            State(state),
            Bytes::from(json!({"type": "SKIP_WAITING"}).to_string()),
        )
        .await
        .unwrap();

        assert_eq!(
            response.outcome,
            crate::proxy::MessageOutcome::SkipWaiting { activated: false }
        );
    }

    #[tokio::test]
    async fn test_message_handler_garbage_ignored() {
        let state = started_state(Arc::new(InMemoryNetwork::new())).await;

        let response = message_handler(State(state), Bytes::from_static(b"not json"))
            .await
            .unwrap();

        assert_eq!(response.outcome, crate::proxy::MessageOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = started_state(Arc::new(InMemoryNetwork::new())).await;

        let response = stats_handler(State(state)).await;
        assert_eq!(response.total_entries, 4);
        assert_eq!(response.stores, vec!["galaxy-media-v1"]);
        assert_eq!(response.hits, 0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
