use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::SessionError;

/// Values carried by a session.
///
/// Stored as `{"admin": "1", "cardId": "..."}`; any other key is rejected when
/// a record is read back from the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SessionState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,
}

impl SessionState {
    pub const ADMIN_GRANTED: &'static str = "1";
    pub const ADMIN_REVOKED: &'static str = "0";

    /// Only the exact value "1" grants admin
    pub fn is_admin(&self) -> bool {
        self.admin.as_deref() == Some(Self::ADMIN_GRANTED)
    }

    /// Bound card, if any. An empty string counts as unbound.
    pub fn card_id(&self) -> Option<&str> {
        self.card_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn grant_admin(&mut self) {
        self.admin = Some(Self::ADMIN_GRANTED.to_string());
    }

    pub fn revoke_admin(&mut self) {
        self.admin = Some(Self::ADMIN_REVOKED.to_string());
    }

    pub fn bind_card(&mut self, card_id: impl Into<String>) {
        self.card_id = Some(card_id.into());
    }

    pub fn from_json(value: Value) -> Result<Self, SessionError> {
        serde_json::from_value(value).map_err(|e| SessionError::CorruptRecord(e.to_string()))
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
