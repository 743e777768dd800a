//! Configuration Module
//!
//! Handles loading server configuration from environment variables and
//! describes the explicit configuration handed to the proxy.

use std::env;
use std::path::PathBuf;

// == Defaults ==
/// Store generation used when `CACHE_VERSION` is not set
pub const DEFAULT_VERSION_TAG: &str = "galaxy-media-v1";

/// Application origin used when `ORIGIN` is not set
pub const DEFAULT_ORIGIN: &str = "http://localhost:8080";

/// Resources pre-populated on install
pub const DEFAULT_MANIFEST: &[&str] = &[
    "/",
    "/index.html",
    "/styles.css",
    "/manifest.json",
    "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.4.0/css/all.min.css",
    "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.4.0/webfonts/fa-solid-900.woff2",
];

/// Same-origin essentials retried when the full manifest fails
pub const DEFAULT_FALLBACK_MANIFEST: &[&str] = &["/", "/index.html", "/styles.css", "/manifest.json"];

/// Document served to failed navigations
pub const DEFAULT_NAVIGATION_FALLBACK: &str = "/index.html";

/// External hosts whose requests are intercepted like same-origin ones
pub const DEFAULT_ALLOWED_EXTERNAL_HOSTS: &[&str] = &["cdnjs.cloudflare.com"];

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Origin of the application the proxy fronts
    pub origin: String,
    /// Current store generation
    pub version_tag: String,
    /// HTTP server port
    pub server_port: u16,
    /// Directory used to persist stores between runs
    pub cache_dir: Option<PathBuf>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `ORIGIN` - Application origin (default: http://localhost:8080)
    /// - `CACHE_VERSION` - Store generation tag (default: galaxy-media-v1)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_DIR` - Persistence directory (default: none, memory only)
    pub fn from_env() -> Self {
        Self {
            origin: env::var("ORIGIN")
                .ok()
                .map(|v| v.trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_ORIGIN.to_string()),
            version_tag: env::var("CACHE_VERSION")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_VERSION_TAG.to_string()),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            cache_dir: env::var("CACHE_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Builds the proxy configuration for this server.
    pub fn proxy_config(&self) -> ProxyConfig {
        ProxyConfig {
            version_tag: self.version_tag.clone(),
            origin: self.origin.clone(),
            ..ProxyConfig::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            version_tag: DEFAULT_VERSION_TAG.to_string(),
            server_port: 3000,
            cache_dir: None,
        }
    }
}

// == Proxy Config ==
/// Explicit configuration passed into a constructed proxy.
///
/// Bumping `version_tag` is the only way to invalidate stores across deployments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Name of the current store
    pub version_tag: String,
    /// Application origin, without trailing slash
    pub origin: String,
    /// Identifiers pre-populated on install, in order
    pub manifest: Vec<String>,
    /// Reduced manifest tried when the full one fails
    pub fallback_manifest: Vec<String>,
    /// URL substrings that mark an external request as interceptable
    pub allowed_external_hosts: Vec<String>,
    /// Identifier of the document served when a navigation cannot reach the network
    pub navigation_fallback: String,
}

impl ProxyConfig {
    /// Resolves a manifest identifier against the origin.
    ///
    /// Identifiers starting with `/` are origin-relative; anything else is
    /// taken as an absolute URL.
    pub fn resolve(&self, identifier: &str) -> String {
        if identifier.starts_with('/') {
            format!("{}{}", self.origin, identifier)
        } else {
            identifier.to_string()
        }
    }

    /// Returns true if the URL belongs to the application origin.
    pub fn is_same_origin(&self, url: &str) -> bool {
        url.starts_with(&self.origin)
    }

    /// Returns true if the proxy should handle requests for this URL.
    ///
    /// External URLs are matched by plain substring, regardless of scheme or path.
    pub fn is_interceptable(&self, url: &str) -> bool {
        self.is_same_origin(url)
            || self
                .allowed_external_hosts
                .iter()
                .any(|host| url.contains(host.as_str()))
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            version_tag: DEFAULT_VERSION_TAG.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            manifest: DEFAULT_MANIFEST.iter().map(|s| s.to_string()).collect(),
            fallback_manifest: DEFAULT_FALLBACK_MANIFEST
                .iter()
                .map(|s| s.to_string())
                .collect(),
            allowed_external_hosts: DEFAULT_ALLOWED_EXTERNAL_HOSTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            navigation_fallback: DEFAULT_NAVIGATION_FALLBACK.to_string(),
        }
    }
}
