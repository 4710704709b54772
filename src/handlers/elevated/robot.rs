// handlers/elevated/robot.rs - Robot registry administration

use axum::{
    body::Bytes,
    extract::{Path, State},
    response::Json,
    Extension,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::require_admin;
use crate::database::Robot;
use crate::error::ApiError;
use crate::middleware::{ApiResult, Done};
use crate::services::{Command, RelayResponse};
use crate::session::ResolvedSession;

#[derive(Debug, Default, Deserialize)]
pub struct RobotPayload {
    pub url: Option<String>,
}

impl RobotPayload {
    /// An empty body means the robot key doubles as its url
    fn parse(body: &[u8]) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| ApiError::invalid_json(e.to_string()))
    }
}

/// GET /v1/robots
pub async fn robots_list(
    State(state): State<AppState>,
    Extension(session): Extension<ResolvedSession>,
) -> ApiResult<Json<Vec<Robot>>> {
    require_admin(&session.state)?;
    Ok(Json(state.registry.list_robots().await?))
}

/// GET /v1/robot/:robot_key
pub async fn robot_get(
    State(state): State<AppState>,
    Extension(session): Extension<ResolvedSession>,
    Path(robot_key): Path<String>,
) -> ApiResult<Json<Robot>> {
    require_admin(&session.state)?;
    Ok(Json(state.registry.get_robot(&robot_key).await?))
}

/// PUT|POST /v1/robot/:robot_key - Body `{"url": "..."}`, optional
pub async fn robot_put(
    State(state): State<AppState>,
    Extension(session): Extension<ResolvedSession>,
    Path(robot_key): Path<String>,
    body: Bytes,
) -> ApiResult<Done> {
    require_admin(&session.state)?;
    let payload = RobotPayload::parse(&body)?;
    state
        .registry
        .put_robot(&robot_key, payload.url.as_deref().filter(|u| !u.is_empty()))
        .await?;
    Ok(Done)
}

/// DELETE /v1/robot/:robot_key
pub async fn robot_delete(
    State(state): State<AppState>,
    Extension(session): Extension<ResolvedSession>,
    Path(robot_key): Path<String>,
) -> ApiResult<Done> {
    require_admin(&session.state)?;
    state.registry.delete_robot(&robot_key).await?;
    Ok(Done)
}

/// GET /v1/robot/:robot_key/ping
pub async fn robot_ping(
    State(state): State<AppState>,
    Extension(session): Extension<ResolvedSession>,
    Path(robot_key): Path<String>,
) -> ApiResult<RelayResponse> {
    require_admin(&session.state)?;
    Ok(state.relay.relay_to_robot(&robot_key, Command::Ping).await?)
}
