use crate::infra::{AppState, Service};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use travel_expense::error::AppError;
use travel_expense::workflows::reimbursement::{reimbursement_router, IdentityProvider};

pub(crate) fn with_reimbursement_routes<P>(service: Arc<Service>, identity: Arc<P>) -> axum::Router
where
    P: IdentityProvider + 'static,
{
    reimbursement_router(service, identity)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Ready once the listener is bound and the record store answers.
pub(crate) async fn readiness_endpoint(
    Extension(state): Extension<AppState>,
) -> Result<impl IntoResponse, AppError> {
    if !state.readiness.load(Ordering::Relaxed) {
        return Ok((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "initializing" })),
        ));
    }

    state.service.regulations("readiness-probe").await?;
    Ok((StatusCode::OK, Json(json!({ "status": "ready" }))))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
