use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A card identity and the program saved for it.
///
/// `program` travels as standard base64 in JSON bodies, both on the API and in
/// the upload sent to robots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub card_id: String,
    #[serde(with = "program_base64", default)]
    pub program: Vec<u8>,
}

impl Card {
    pub fn new(card_id: impl Into<String>, program: Vec<u8>) -> Self {
        Self {
            card_id: card_id.into(),
            program,
        }
    }
}

pub mod program_base64 {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => STANDARD.decode(encoded.as_bytes()).map_err(D::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}
