//! Stored Response Snapshot Module
//!
//! Defines the immutable copy of a response kept in a named store.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fetch::{ProxyResponse, ResponseType};

// == Stored Response Snapshot ==
/// A response as written to a store.
///
/// Snapshots are never mutated; re-storing the same request replaces the
/// whole snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponseSnapshot {
    /// HTTP status code
    pub status: u16,
    /// Reason phrase
    pub status_text: String,
    /// Headers in wire order, values kept as raw bytes
    pub headers: Vec<(String, Bytes)>,
    /// Body bytes
    pub body: Bytes,
    /// URL the response was served for
    pub url: String,
    /// Response type at the time it was stored
    pub response_type: ResponseType,
    /// When the snapshot was written
    pub stored_at: DateTime<Utc>,
}

impl StoredResponseSnapshot {
    // == Constructor ==
    /// Captures a response, consuming it.
    pub fn capture(response: ProxyResponse) -> Self {
        let headers = response
            .headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    Bytes::copy_from_slice(value.as_bytes()),
                )
            })
            .collect();

        Self {
            status: response.status,
            status_text: response.status_text,
            headers,
            body: response.body,
            url: response.url,
            response_type: response.response_type,
            stored_at: Utc::now(),
        }
    }

    // == To Response ==
    /// Rebuilds a response that replays this snapshot verbatim.
    pub fn to_response(&self) -> ProxyResponse {
        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_maybe_shared(value.clone()),
            ) {
                headers.append(name, value);
            }
        }

        ProxyResponse {
            status: self.status,
            status_text: self.status_text.clone(),
            headers,
            body: self.body.clone(),
            url: self.url.clone(),
            response_type: self.response_type,
        }
    }

    /// Returns the first value of a header, matched case-insensitively.
    ///
    /// Values that are not valid UTF-8 are skipped; they are still replayed.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| std::str::from_utf8(v).ok())
    }
}
