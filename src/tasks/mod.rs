//! Background Tasks Module
//!
//! Contains detached tasks spawned while handling requests.
//!
//! # Tasks
//! - Cache fill: writes successful network responses back to the current store

mod cache_fill;

pub use cache_fill::spawn_cache_fill;
