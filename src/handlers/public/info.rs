// handlers/public/info.rs - GET /v1/info

use axum::{response::Json, Extension};
use serde::Serialize;

use crate::session::{ResolvedSession, SessionState};

/// What the current session is bound to
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Info {
    pub card_id: String,
    pub is_admin: bool,
}

impl From<&SessionState> for Info {
    fn from(state: &SessionState) -> Self {
        Self {
            card_id: state.card_id().unwrap_or_default().to_string(),
            is_admin: state.is_admin(),
        }
    }
}

pub async fn info_get(Extension(session): Extension<ResolvedSession>) -> Json<Info> {
    Json(Info::from(&session.state))
}
