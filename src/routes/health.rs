//! Health check endpoints
//!
//! Kubernetes-style probes plus a capability summary so operators can see
//! which external services are live without reading logs:
//! - /health, /healthz - liveness (is the service running?)
//! - /ready, /readyz - readiness (same as liveness here; every stage
//!   degrades gracefully, so a running kiln can always take traffic)
//! - /version - deployment verification

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::finalize::CapabilitySummary;
use crate::server::http::json_response;
use crate::server::AppState;

/// Health response body
#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    pub uptime: u64,
    #[serde(rename = "nodeId")]
    pub node_id: String,
    /// Which pipeline capabilities are configured on this instance
    pub capabilities: CapabilitySummary,
    /// Whether the backfill endpoint is gated by a shared secret
    #[serde(rename = "adminGated")]
    pub admin_gated: bool,
}

fn build_health_response(state: &AppState) -> HealthResponse {
    HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.uptime_secs(),
        node_id: state.args.node_id.to_string(),
        capabilities: state.orchestrator.capabilities().summary(),
        admin_gated: state.args.admin_token.is_some(),
    }
}

/// Handle GET /health and /healthz
pub fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &build_health_response(&state))
}

/// Handle GET /ready and /readyz
pub fn readiness_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    // No hard dependency gates readiness: a kiln with every optional
    // capability missing still serves fallback results.
    json_response(StatusCode::OK, &build_health_response(&state))
}

/// Handle GET /version
pub fn version_info() -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &serde_json::json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }),
    )
}
