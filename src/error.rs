//! Error types for the offline proxy
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Proxy Error Enum ==
/// Unified error type for the offline proxy.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// The network rejected the fetch (connection refused, DNS, reset, ...)
    #[error("Network failure: {0}")]
    Network(String),

    /// A store refused to hold the given request/response pair
    #[error("Store rejected entry: {0}")]
    StoreRejected(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Saving or loading persisted stores failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Internal proxy error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        ProxyError::Network(err.to_string())
    }
}

impl From<std::io::Error> for ProxyError {
    fn from(err: std::io::Error) -> Self {
        ProxyError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        ProxyError::Persistence(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ProxyError::Network(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            ProxyError::StoreRejected(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            ProxyError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ProxyError::Persistence(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            ProxyError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the offline proxy.
pub type Result<T> = std::result::Result<T, ProxyError>;
