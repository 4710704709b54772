// auth/guard.rs - Authorization decisions over resolved session values

use thiserror::Error;

use crate::session::SessionState;

/// What a session is allowed to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Anonymous,
    CardBound(String),
    Admin,
}

#[derive(Debug, Error)]
#[error("Not authorized")]
pub struct NotAuthorized;

/// Admin takes precedence over a bound card
pub fn classify(state: &SessionState) -> Access {
    if state.is_admin() {
        Access::Admin
    } else if let Some(card_id) = state.card_id() {
        Access::CardBound(card_id.to_string())
    } else {
        Access::Anonymous
    }
}

pub fn require_admin(state: &SessionState) -> Result<(), NotAuthorized> {
    match classify(state) {
        Access::Admin => Ok(()),
        _ => Err(NotAuthorized),
    }
}

/// The session itself must be bound to `card_id`; admin rights do not stand in
/// for the binding.
pub fn require_card<'a>(state: &'a SessionState, card_id: &str) -> Result<&'a str, NotAuthorized> {
    match state.card_id() {
        Some(bound) if bound == card_id => Ok(bound),
        _ => Err(NotAuthorized),
    }
}

/// Either the card bound to the session, or an admin acting on any card
pub fn require_card_or_admin(state: &SessionState, card_id: &str) -> Result<(), NotAuthorized> {
    if state.is_admin() {
        return Ok(());
    }
    require_card(state, card_id).map(|_| ())
}
