//! Admission Service REST surface (§4.1, §6) plus the metrics endpoints,
//! shaped like `websocket::metrics`: a bearer-token guard, a JSON snapshot
//! handler, and a Prometheus text-exposition handler.

mod admission_routes;
mod error_response;
mod metrics_routes;

pub use admission_routes::admission_routes;
pub use metrics_routes::{metrics_handler, prometheus_metrics_handler};
