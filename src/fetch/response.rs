//! Response Module
//!
//! Responses returned to intercepted requests, whether they came from the
//! network, a store, or were synthesized by the proxy.

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

// == Offline Response Constants ==
/// Body of the synthetic response served when the network is unreachable
pub const OFFLINE_BODY: &str = "Offline - resource unavailable";

/// Reason phrase of the synthetic offline response
pub const OFFLINE_STATUS_TEXT: &str = "Service Unavailable";

// == Response Type ==
/// How a response was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin response
    Basic,
    /// Cross-origin response readable by the caller
    Cors,
    /// Cross-origin response with hidden contents
    Opaque,
    /// Network-level error
    Error,
}

// == Proxy Response ==
/// A response handed back to the caller of an intercepted request.
///
/// Not `Clone`: a response that must reach both the caller and a store is
/// split with [`ProxyResponse::duplicate`] before either side takes it.
#[derive(Debug)]
pub struct ProxyResponse {
    /// HTTP status code (0 for network errors)
    pub status: u16,
    /// Reason phrase
    pub status_text: String,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Bytes,
    /// URL the response was served for
    pub url: String,
    /// Response type
    pub response_type: ResponseType,
}

impl ProxyResponse {
    /// Creates a response with the canonical reason phrase for `status`.
    pub fn new(status: u16, body: impl Into<Bytes>, response_type: ResponseType) -> Self {
        let status_text = StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string();

        Self {
            status,
            status_text,
            headers: HeaderMap::new(),
            body: body.into(),
            url: String::new(),
            response_type,
        }
    }

    /// Creates a network-level error response.
    pub fn network_error() -> Self {
        Self {
            status: 0,
            status_text: String::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            url: String::new(),
            response_type: ResponseType::Error,
        }
    }

    /// Creates the synthetic 503 served for unreachable subresources.
    pub fn offline() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        Self {
            status: 503,
            status_text: OFFLINE_STATUS_TEXT.to_string(),
            headers,
            body: Bytes::from_static(OFFLINE_BODY.as_bytes()),
            url: String::new(),
            response_type: ResponseType::Basic,
        }
    }

    /// Sets the URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Adds a header, ignoring names or values that are not valid HTTP.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            header::HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Returns true for statuses in 200..=299.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns true if this response may be written back to a store.
    ///
    /// Only exact 200s qualify; error-typed responses never do.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.response_type != ResponseType::Error
    }

    /// Splits off an independent copy of this response.
    pub fn duplicate(&self) -> Self {
        Self {
            status: self.status,
            status_text: self.status_text.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
            url: self.url.clone(),
            response_type: self.response_type,
        }
    }
}
