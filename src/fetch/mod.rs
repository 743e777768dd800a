//! Fetch Module
//!
//! Request and response types exchanged between the proxy, its stores and
//! the network.

mod network;
mod request;
mod response;

pub use network::{strip_hop_by_hop, HttpNetwork, InMemoryNetwork, Network, HOP_BY_HOP_HEADERS};
pub use request::{ProxyRequest, RequestKey, RequestMode};
pub use response::{ProxyResponse, ResponseType, OFFLINE_BODY, OFFLINE_STATUS_TEXT};
