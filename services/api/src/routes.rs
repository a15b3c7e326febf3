use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use talent_match::marketplace::{marketplace_router, Marketplace};

#[derive(Debug, Serialize)]
pub(crate) struct HealthPayload {
    pub(crate) status: &'static str,
    pub(crate) checked_at: chrono::DateTime<chrono::Utc>,
}

/// Marketplace endpoints plus the liveness, readiness, and metrics probes.
/// Probe handlers read [`AppState`] from an `Extension` layered on by the
/// caller.
pub(crate) fn with_operational_routes(marketplace: Arc<Marketplace>) -> axum::Router {
    marketplace_router(marketplace)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<HealthPayload> {
    Json(HealthPayload {
        status: "ok",
        checked_at: chrono::Utc::now(),
    })
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
