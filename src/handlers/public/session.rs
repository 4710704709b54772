// handlers/public/session.rs - Admin login, card start and logout
//
// These endpoints change session values and always answer with the session
// cookie, including the failed admin login (which records admin = "0").

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use tracing::{info, warn};

use super::info::Info;
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResult, Done, WithSession};
use crate::session::ResolvedSession;

/// GET /cardlogin/:token - Grant admin rights for a valid admin token
pub async fn card_login(
    State(state): State<AppState>,
    Extension(mut session): Extension<ResolvedSession>,
    Path(token): Path<String>,
) -> ApiResult<Response> {
    if state.admin_tokens.accepts(&token) {
        session.state.grant_admin();
        let cookie = state.sessions.persist(&session).await?;
        info!("Admin login accepted for session {}", session.id);
        Ok(WithSession {
            body: Json(Info::from(&session.state)),
            cookie,
        }
        .into_response())
    } else {
        session.state.revoke_admin();
        let cookie = state.sessions.persist(&session).await?;
        warn!("Admin login rejected");
        Ok(WithSession {
            body: ApiError::unauthorized("Invalid credential"),
            cookie,
        }
        .into_response())
    }
}

/// GET /start/:card_id - Bind the session to a card.
///
/// The card id is checked as a start token unless no start key is configured.
pub async fn start(
    State(state): State<AppState>,
    Extension(mut session): Extension<ResolvedSession>,
    Path(card_id): Path<String>,
) -> ApiResult<Response> {
    if card_id.is_empty() || !state.start_tokens.accepts(&card_id) {
        warn!("Rejected start for card '{}'", card_id);
        return Err(ApiError::unauthorized("Invalid credential"));
    }

    session.state.bind_card(card_id.as_str());
    let cookie = state.sessions.persist(&session).await?;
    info!("Session {} started for card {}", session.id, card_id);

    Ok(WithSession {
        body: Json(Info::from(&session.state)),
        cookie,
    }
    .into_response())
}

/// GET /logout - Drop admin rights, keep the bound card
pub async fn logout(
    State(state): State<AppState>,
    Extension(mut session): Extension<ResolvedSession>,
) -> ApiResult<WithSession<Done>> {
    session.state.revoke_admin();
    let cookie = state.sessions.persist(&session).await?;
    Ok(WithSession { body: Done, cookie })
}
