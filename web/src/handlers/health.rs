//! Liveness and readiness probes.
//!
//! Both always answer OK: the service is ready as soon as it is serving.
//! The load balancer polls `/readyz` to keep a backend in rotation.

use axum::{http::StatusCode, Json};
use serde::Serialize;

/// Probe response body.
#[derive(Serialize)]
pub struct ProbeResponse {
    /// Probe status.
    pub status: String,
}

/// Liveness probe.
pub async fn livez() -> (StatusCode, Json<ProbeResponse>) {
    (
        StatusCode::OK,
        Json(ProbeResponse {
            status: "ok".to_string(),
        }),
    )
}

/// Readiness probe.
pub async fn readyz() -> (StatusCode, Json<ProbeResponse>) {
    (
        StatusCode::OK,
        Json(ProbeResponse {
            status: "ok".to_string(),
        }),
    )
}
