use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use super::types::*;
use super::AppState;
use crate::dashboard::FeedStats;
use crate::risk::types::AnalysisOutcome;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn api_error(status: StatusCode, msg: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: msg.into(),
        }),
    )
}

// ============================================================
// Health & Stats
// ============================================================

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "online".to_string(),
        stream: state.stream_status.as_ref().map(|s| *s.borrow()),
    })
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Json<FeedStats> {
    Json(state.dashboard.lock().await.stats())
}

// ============================================================
// Feed
// ============================================================

pub async fn feed(State(state): State<Arc<AppState>>) -> Json<FeedResponse> {
    let entries = state.dashboard.lock().await.snapshot();
    Json(FeedResponse { entries })
}

// ============================================================
// Analyze
// ============================================================

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AnalyzeForm>, JsonRejection>,
) -> ApiResult<AnalysisOutcome> {
    let Json(form) = body.map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;
    state
        .client
        .analyze(&form.wallet, &form.token, &form.amount.as_text(), &form.network)
        .await
        .map(Json)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))
}
