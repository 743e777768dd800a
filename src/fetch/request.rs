//! Intercepted Request Module
//!
//! Describes an outgoing request as seen by the proxy and the identifier
//! stores key it by.

use std::fmt;

use axum::http::{HeaderMap, Method};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

// == Request Mode ==
/// Purpose of an outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level document load
    Navigate,
    /// Subresource restricted to the same origin
    SameOrigin,
    /// Cross-origin subresource without CORS
    NoCors,
    /// Cross-origin subresource with CORS
    Cors,
}

// == Proxy Request ==
/// An outgoing request the proxy may intercept.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL
    pub url: String,
    /// Request purpose
    pub mode: RequestMode,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body, empty for GET
    pub body: Bytes,
}

impl ProxyRequest {
    /// Creates a GET request with the given mode and no headers.
    pub fn get(url: impl Into<String>, mode: RequestMode) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            mode,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Creates a GET request loading a top-level document.
    pub fn navigate(url: impl Into<String>) -> Self {
        Self::get(url, RequestMode::Navigate)
    }

    /// Creates a GET request for a subresource.
    ///
    /// Manifest entries are fetched this way during install.
    pub fn subresource(url: impl Into<String>) -> Self {
        Self::get(url, RequestMode::Cors)
    }

    /// Sets the method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Returns true if this request loads a top-level document.
    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Returns the identifier stores key this request by.
    pub fn key(&self) -> RequestKey {
        RequestKey::new(self.method.as_str(), &self.url)
    }
}

// == Request Key ==
/// Store key: method plus absolute, origin-qualified URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestKey {
    /// Upper-case HTTP method
    pub method: String,
    /// Absolute URL
    pub url: String,
}

impl RequestKey {
    /// Creates a key, normalising the method to upper case.
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
        }
    }

    /// Returns true for keys of GET requests.
    pub fn is_get(&self) -> bool {
        self.method == Method::GET.as_str()
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_detection() {
        assert!(ProxyRequest::navigate("http://a/").is_navigation());
        assert!(!ProxyRequest::subresource("http://a/app.js").is_navigation());
    }

    #[test]
    fn test_key_uses_method_and_url() {
        let get = ProxyRequest::subresource("http://a/x");
        let post = ProxyRequest::subresource("http://a/x").with_method(Method::POST);

        assert_ne!(get.key(), post.key());
        assert!(get.key().is_get());
        assert!(!post.key().is_get());
        assert_eq!(get.key().to_string(), "GET http://a/x");
    }

    #[test]
    fn test_key_normalises_method_case() {
        assert_eq!(RequestKey::new("get", "http://a/"), RequestKey::new("GET", "http://a/"));
    }

    #[test]
    fn test_navigate_and_subresource_share_key() {
        assert_eq!(
            ProxyRequest::navigate("http://a/").key(),
            ProxyRequest::subresource("http://a/").key()
        );
    }
}
