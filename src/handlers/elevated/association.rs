// handlers/elevated/association.rs - Card to robot binding

use axum::{
    extract::{Path, State},
    Extension,
};

use crate::app::AppState;
use crate::auth::require_admin;
use crate::middleware::{ApiResult, Done};
use crate::session::ResolvedSession;

/// PUT|POST /v1/robot/:robot_key/card/:card_id
pub async fn associate(
    State(state): State<AppState>,
    Extension(session): Extension<ResolvedSession>,
    Path((robot_key, card_id)): Path<(String, String)>,
) -> ApiResult<Done> {
    require_admin(&session.state)?;
    state.registry.associate(&robot_key, &card_id).await?;
    Ok(Done)
}

/// DELETE /v1/robot/:robot_key/card
pub async fn disassociate(
    State(state): State<AppState>,
    Extension(session): Extension<ResolvedSession>,
    Path(robot_key): Path<String>,
) -> ApiResult<Done> {
    require_admin(&session.state)?;
    state.registry.disassociate(&robot_key).await?;
    Ok(Done)
}
