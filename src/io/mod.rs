//! IO modules - external system interfaces
//!
//! - `http` - HTTP API (location ingestion, status, events, zones)
//! - `prometheus` - Prometheus text formatting for /metrics

pub mod http;
pub mod prometheus;

pub use http::{start_http_server, AppState};
