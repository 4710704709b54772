use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registered robot endpoint. `card_id` is empty while no card controls it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Robot {
    pub name: String,
    pub url: String,
    pub card_id: String,
}

impl Robot {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            card_id: String::new(),
        }
    }

    pub fn is_associated(&self) -> bool {
        !self.card_id.is_empty()
    }
}
