use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, warn};

use crate::data::{TriggerRequest, TriggerResponse};
use crate::error::TrackerError;
use crate::intake::Intake;
use crate::metrics::TrackerMetrics;

pub const TRIGGER_PATH: &str = "/trigger/";

#[derive(Clone)]
struct AppState {
    intake: Intake,
    metrics: TrackerMetrics,
}

/// HTTP surface: submission trigger plus metrics and health probes.
pub fn router(intake: Intake, metrics: TrackerMetrics) -> Router {
    Router::new()
        .route(TRIGGER_PATH, post(trigger))
        .route("/trigger", post(trigger))
        .route("/metrics", get(render_metrics))
        .route("/health", get(|| async { "ok" }))
        .with_state(AppState { intake, metrics })
}

async fn trigger(
    State(state): State<AppState>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> (StatusCode, Json<TriggerResponse>) {
    let request = match payload {
        Ok(Json(body)) => TriggerRequest::from_json(body),
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected malformed trigger request");
            return (
                StatusCode::BAD_REQUEST,
                Json(TriggerResponse::rejected(rejection.body_text())),
            );
        }
    };

    match state
        .intake
        .submit(request.user_operation_hash(), request.chain())
    {
        Ok(_) => (StatusCode::ACCEPTED, Json(TriggerResponse::queued())),
        Err(err @ TrackerError::InvalidInput { .. }) => (
            StatusCode::BAD_REQUEST,
            Json(TriggerResponse::rejected(err.to_string())),
        ),
        Err(err) => {
            error!(error = %err, "Could not queue user operation");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(TriggerResponse::rejected(err.to_string())),
            )
        }
    }
}

async fn render_metrics(State(state): State<AppState>) -> Result<String, StatusCode> {
    state.metrics.gather().map_err(|err| {
        error!(error = %err, "Failed to encode metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}
