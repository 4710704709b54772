// handlers/protected/control.rs - Robot commands on behalf of a card
//
// The card comes from the session; the path only has to agree with it.

use axum::{
    extract::{Path, State},
    Extension,
};

use crate::app::AppState;
use crate::auth::require_card;
use crate::middleware::ApiResult;
use crate::services::{Command, RelayResponse};
use crate::session::ResolvedSession;

async fn relay_for_session(
    state: &AppState,
    session: &ResolvedSession,
    card_id: &str,
    command: Command,
) -> ApiResult<RelayResponse> {
    let card_id = require_card(&session.state, card_id)?;
    Ok(state.relay.relay(card_id, command).await?)
}

/// GET /v1/card/:card_id/ping
pub async fn card_ping(
    State(state): State<AppState>,
    Extension(session): Extension<ResolvedSession>,
    Path(card_id): Path<String>,
) -> ApiResult<RelayResponse> {
    relay_for_session(&state, &session, &card_id, Command::Ping).await
}

/// GET /v1/card/:card_id/run
pub async fn card_run(
    State(state): State<AppState>,
    Extension(session): Extension<ResolvedSession>,
    Path(card_id): Path<String>,
) -> ApiResult<RelayResponse> {
    relay_for_session(&state, &session, &card_id, Command::Run).await
}

/// GET /v1/card/:card_id/stop
pub async fn card_stop(
    State(state): State<AppState>,
    Extension(session): Extension<ResolvedSession>,
    Path(card_id): Path<String>,
) -> ApiResult<RelayResponse> {
    relay_for_session(&state, &session, &card_id, Command::Stop).await
}

/// GET|PUT|POST /v1/card/:card_id/upload - Sends the stored program
pub async fn card_upload(
    State(state): State<AppState>,
    Extension(session): Extension<ResolvedSession>,
    Path(card_id): Path<String>,
) -> ApiResult<RelayResponse> {
    relay_for_session(&state, &session, &card_id, Command::Upload).await
}
