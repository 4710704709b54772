// handlers/public/health.rs - GET /health

use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::ApiResult;

/// Reports whether the session and registry stores answer
pub async fn health(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    if let Err(err) = state.sessions.health_check().await {
        tracing::error!("Session store unhealthy: {}", err);
        return Err(ApiError::service_unavailable("Session store unavailable"));
    }
    if let Err(err) = state.registry.health_check().await {
        tracing::error!("Registry store unhealthy: {}", err);
        return Err(ApiError::service_unavailable("Registry store unavailable"));
    }
    Ok(Json(json!({ "status": "ok" })))
}
