//! Network Module
//!
//! The proxy's view of the network: a trait with a reqwest-backed
//! implementation for production and an in-memory one for development
//! and testing.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use axum::http::HeaderMap;
use bytes::Bytes;
use tracing::debug;

use crate::error::{ProxyError, Result};
use crate::fetch::{ProxyRequest, ProxyResponse, RequestMode, ResponseType};

/// Headers that describe a single connection and must not be forwarded.
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "host",
    "content-length",
    "transfer-encoding",
    "te",
    "trailer",
    "upgrade",
    "proxy-authorization",
    "keep-alive",
];

/// Returns a copy of `headers` without hop-by-hop entries.
pub fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let mut filtered = headers.clone();
    for name in HOP_BY_HOP_HEADERS {
        filtered.remove(*name);
    }
    filtered
}

// == Network Trait ==
/// Source of live responses.
///
/// An `Err` is a rejected fetch: the request never produced an HTTP response.
#[async_trait]
pub trait Network: Send + Sync {
    /// Sends the request and returns the response with its body fully read.
    async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse>;
}

// == HTTP Network ==
/// Network backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpNetwork {
    client: reqwest::Client,
    origin: String,
}

impl HttpNetwork {
    /// Creates a network whose same-origin responses are typed `Basic`.
    pub fn new(origin: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), origin)
    }

    /// Creates a network around an existing client.
    pub fn with_client(client: reqwest::Client, origin: impl Into<String>) -> Self {
        Self {
            client,
            origin: origin.into(),
        }
    }

    /// Cross-origin responses to no-cors requests are opaque.
    fn response_type_for(&self, url: &str, mode: RequestMode) -> ResponseType {
        if url.starts_with(&self.origin) {
            ResponseType::Basic
        } else if mode == RequestMode::NoCors {
            ResponseType::Opaque
        } else {
            ResponseType::Cors
        }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse> {
        let response = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(strip_hop_by_hop(&request.headers))
            .body(request.body.clone())
            .send()
            .await?;

        let status = response.status();
        let url = response.url().to_string();
        let headers = strip_hop_by_hop(response.headers());
        let body = response.bytes().await?;

        debug!("Network: {} {} -> {}", request.method, request.url, status);

        let mut proxied = ProxyResponse::new(
            status.as_u16(),
            body,
            self.response_type_for(&url, request.mode),
        );
        proxied.headers = headers;
        Ok(proxied.with_url(url))
    }
}

// == In-Memory Network ==
/// A scripted response for one URL.
#[derive(Debug, Clone)]
enum Route {
    Respond {
        status: u16,
        body: Bytes,
        headers: Vec<(String, String)>,
        response_type: ResponseType,
    },
    Fail,
}

/// In-memory network for development and testing.
///
/// Unknown URLs and every URL while offline are rejected fetches.
#[derive(Debug, Default)]
pub struct InMemoryNetwork {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<String>>,
    offline: Mutex<bool>,
}

impl InMemoryNetwork {
    /// Creates an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `body` with `status` for `url`.
    pub fn respond(&self, url: &str, status: u16, body: impl Into<Bytes>) -> Result<()> {
        self.respond_with(url, status, body, ResponseType::Basic, &[])
    }

    /// Serves a fully described response for `url`.
    pub fn respond_with(
        &self,
        url: &str,
        status: u16,
        body: impl Into<Bytes>,
        response_type: ResponseType,
        headers: &[(&str, &str)],
    ) -> Result<()> {
        let route = Route::Respond {
            status,
            body: body.into(),
            headers: headers
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
            response_type,
        };
        self.routes()?.insert(url.to_string(), route);
        Ok(())
    }

    /// Rejects every fetch of `url`.
    pub fn fail(&self, url: &str) -> Result<()> {
        self.routes()?.insert(url.to_string(), Route::Fail);
        Ok(())
    }

    /// Rejects every fetch while `offline` is set.
    pub fn set_offline(&self, offline: bool) -> Result<()> {
        *self
            .offline
            .lock()
            .map_err(|e| ProxyError::Internal(e.to_string()))? = offline;
        Ok(())
    }

    /// Returns how many fetches were attempted for `url`.
    pub fn request_count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .map(|requests| requests.iter().filter(|u| *u == url).count())
            .unwrap_or(0)
    }

    /// Returns the total number of attempted fetches.
    pub fn total_requests(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    fn routes(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Route>>> {
        self.routes
            .lock()
            .map_err(|e| ProxyError::Internal(e.to_string()))
    }
}

#[async_trait]
impl Network for InMemoryNetwork {
    async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse> {
        self.requests
            .lock()
            .map_err(|e| ProxyError::Internal(e.to_string()))?
            .push(request.url.clone());

        let offline = *self
            .offline
            .lock()
            .map_err(|e| ProxyError::Internal(e.to_string()))?;
        if offline {
            return Err(ProxyError::Network(format!("offline: {}", request.url)));
        }

        let route = self.routes()?.get(&request.url).cloned();
        match route {
            Some(Route::Respond {
                status,
                body,
                headers,
                response_type,
            }) => {
                let mut response =
                    ProxyResponse::new(status, body, response_type).with_url(&request.url);
                for (name, value) in &headers {
                    response = response.with_header(name, value);
                }
                Ok(response)
            }
            Some(Route::Fail) => Err(ProxyError::Network(format!(
                "connection refused: {}",
                request.url
            ))),
            None => Err(ProxyError::Network(format!("unreachable: {}", request.url))),
        }
    }
}
