use crate::infra::StatusState;
use axum::extract::Query;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use citation_core::error::AppError;
use citation_core::workflows::progress::ProgressSnapshot;
use citation_core::workflows::submission::Attempt;
use citation_core::workflows::verification::VerificationLedger;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AttemptFilter {
    /// Outcome label such as `pending_verification`.
    outcome: Option<String>,
}

/// Routes over the files written by `run` and `verify`.
pub fn status_router(state: StatusState) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/progress", get(progress_endpoint))
        .route("/api/v1/progress/attempts", get(attempts_endpoint))
        .route("/api/v1/verifications", get(verifications_endpoint))
        .layer(Extension(state))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<StatusState>) -> impl IntoResponse {
    if state.is_ready() {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "initializing" })),
        )
    }
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<StatusState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

fn no_snapshot() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "no progress snapshot has been written yet" })),
    )
        .into_response()
}

pub(crate) async fn progress_endpoint(
    Extension(state): Extension<StatusState>,
) -> Result<Response, AppError> {
    Ok(match ProgressSnapshot::load(&state.progress_path)? {
        Some(snapshot) => Json(snapshot).into_response(),
        None => no_snapshot(),
    })
}

pub(crate) async fn attempts_endpoint(
    Extension(state): Extension<StatusState>,
    Query(filter): Query<AttemptFilter>,
) -> Result<Response, AppError> {
    let Some(snapshot) = ProgressSnapshot::load(&state.progress_path)? else {
        return Ok(no_snapshot());
    };

    let attempts: Vec<Attempt> = match filter.outcome.as_deref() {
        Some(label) => snapshot.attempts_with_outcome(label).cloned().collect(),
        None => snapshot.attempt_log,
    };
    Ok(Json(attempts).into_response())
}

pub(crate) async fn verifications_endpoint(
    Extension(state): Extension<StatusState>,
) -> Result<Json<VerificationLedger>, AppError> {
    Ok(Json(VerificationLedger::load(&state.ledger_path)?))
}
