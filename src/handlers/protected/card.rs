// handlers/protected/card.rs - GET|PUT|POST /v1/card/:card_id

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Json,
    Extension,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::require_card_or_admin;
use crate::database::{models::card::program_base64, Card};
use crate::error::ApiError;
use crate::middleware::{ApiResult, Done};
use crate::session::ResolvedSession;

#[derive(Debug, Deserialize)]
pub struct ProgramPayload {
    #[serde(with = "program_base64", default)]
    pub program: Vec<u8>,
}

pub async fn card_get(
    State(state): State<AppState>,
    Extension(session): Extension<ResolvedSession>,
    Path(card_id): Path<String>,
) -> ApiResult<Json<Card>> {
    require_card_or_admin(&session.state, &card_id)?;
    Ok(Json(state.registry.get_card(&card_id).await?))
}

pub async fn card_put(
    State(state): State<AppState>,
    Extension(session): Extension<ResolvedSession>,
    Path(card_id): Path<String>,
    payload: Result<Json<ProgramPayload>, JsonRejection>,
) -> ApiResult<Done> {
    require_card_or_admin(&session.state, &card_id)?;
    let Json(payload) = payload.map_err(|e| ApiError::invalid_json(e.body_text()))?;
    state.registry.put_card(&card_id, payload.program).await?;
    Ok(Done)
}
