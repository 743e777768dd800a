//! API Module
//!
//! HTTP front for the offline proxy.
//!
//! # Endpoints
//! - `POST /__proxy/message` - Deliver a control message
//! - `GET /__proxy/stats` - Get proxy statistics
//! - `GET /__proxy/health` - Health check endpoint
//! - any other path - Answered by the proxy from store or network

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
