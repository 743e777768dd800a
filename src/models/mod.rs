//! Response models for the proxy control API
//!
//! This module defines the DTOs serialized on the `/__proxy` routes.

pub mod responses;

// Re-export commonly used types
pub use responses::{HealthResponse, MessageResponse, StatsResponse};
