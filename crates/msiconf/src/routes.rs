use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use msiconf_core::{db, metadata::MetadataError, ProcessingConfig};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::AppState;

/// Upper bound on the database round trip behind `GET /health`.
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/processing-config", post(processing_config))
        .route("/datasets/{id}/metadata", post(update_metadata))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct MetadataUpdateRequest {
    pub user: String,
    pub old_metadata: Value,
    pub new_metadata: Value,
}

#[derive(Debug)]
pub struct ApiError(MetadataError);

impl From<MetadataError> for ApiError {
    fn from(err: MetadataError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let ping = db::ping(&state.services.pool);
    let outcome = tokio::time::timeout(HEALTH_CHECK_TIMEOUT, ping).await;
    let error = match outcome {
        Ok(Ok(())) => return (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Ok(Err(err)) => err.to_string(),
        Err(_) => format!("database ping timed out after {HEALTH_CHECK_TIMEOUT:?}"),
    };

    tracing::warn!(error = %error, "health check: database unreachable");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "status": "degraded", "error": error })),
    )
}

pub async fn processing_config(
    State(state): State<Arc<AppState>>,
    Json(metadata): Json<Value>,
) -> Result<Json<ProcessingConfig>, ApiError> {
    let config = state.services.generate_and_publish(&metadata)?;
    Ok(Json(config))
}

pub async fn update_metadata(
    State(state): State<Arc<AppState>>,
    Path(dataset_id): Path<String>,
    Json(payload): Json<MetadataUpdateRequest>,
) -> Result<Json<ProcessingConfig>, ApiError> {
    let config = state.services.update_dataset_metadata(
        &payload.user,
        &dataset_id,
        &payload.old_metadata,
        &payload.new_metadata,
    )?;
    Ok(Json(config))
}
