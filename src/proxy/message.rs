//! Control messages sent to the proxy by application pages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A recognised control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate the waiting version now
    SkipWaiting,
}

impl ControlMessage {
    /// Parses a payload, returning `None` for anything unrecognised.
    pub fn parse(payload: &Value) -> Option<Self> {
        serde_json::from_value(payload.clone()).ok()
    }
}
