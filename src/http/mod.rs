//! HTTP surface of the monitoring backend.
//!
//! Thin axum adapter over [`AppContext`](crate::context::AppContext): every
//! handler decodes its input, calls one manager operation and maps the
//! resulting [`MonitorError`](crate::error::MonitorError) onto a status code.
//! Health and Prometheus metrics are served from the global telemetry hub.

mod handlers;
mod metrics;
mod state;

#[cfg(test)]
mod tests;

pub use handlers::{build_router, run_http_server, HttpServerError};
pub use state::HttpState;
