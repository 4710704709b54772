// services/registry_service.rs - Cards, robots and their association
//
// Thin policy layer over `RegistryStore`: identifier and URL validation, and
// translation of store outcomes into registry errors.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::database::{AssociateOutcome, Card, DatabaseError, RegistryStore, Robot};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Card not found")]
    CardNotFound,

    #[error("Robot not found")]
    RobotNotFound,

    #[error("Robot or card already associated")]
    AlreadyAssociated,

    #[error("No robot associated with this card")]
    NoAssociatedRobot,

    #[error("Invalid robot url: {0}")]
    InvalidUrl(String),

    #[error("Missing {0}")]
    InvalidIdentifier(&'static str),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Clone)]
pub struct RegistryService {
    store: Arc<dyn RegistryStore>,
}

impl RegistryService {
    pub fn new(store: Arc<dyn RegistryStore>) -> Self {
        Self { store }
    }

    pub async fn get_card(&self, card_id: &str) -> Result<Card, RegistryError> {
        let card_id = identifier(card_id, "card id")?;
        self.store
            .find_card(card_id)
            .await?
            .ok_or(RegistryError::CardNotFound)
    }

    /// Create or replace the program of a card
    pub async fn put_card(&self, card_id: &str, program: Vec<u8>) -> Result<(), RegistryError> {
        let card_id = identifier(card_id, "card id")?;
        debug!("Storing program for card {} ({} bytes)", card_id, program.len());
        self.store.upsert_card(&Card::new(card_id, program)).await?;
        Ok(())
    }

    pub async fn get_robot(&self, name: &str) -> Result<Robot, RegistryError> {
        let name = identifier(name, "robot key")?;
        self.store
            .find_robot(name)
            .await?
            .ok_or(RegistryError::RobotNotFound)
    }

    /// Register a robot or update its url, keeping any association.
    ///
    /// Without an explicit url the key itself must be an absolute http(s) URL.
    pub async fn put_robot(&self, name: &str, url: Option<&str>) -> Result<Robot, RegistryError> {
        let name = identifier(name, "robot key")?;
        let url = validate_url(url.unwrap_or(name))?;

        self.store.upsert_robot(name, &url).await?;
        info!("Robot {} registered at {}", name, url);

        self.get_robot(name).await
    }

    pub async fn delete_robot(&self, name: &str) -> Result<(), RegistryError> {
        let name = identifier(name, "robot key")?;
        let removed = self.store.delete_robot(name).await?;
        debug!("Deleted robot {} ({} record)", name, removed);
        Ok(())
    }

    pub async fn list_robots(&self) -> Result<Vec<Robot>, RegistryError> {
        Ok(self.store.list_robots().await?)
    }

    /// Bind `card_id` to the robot. Rejects when either side is already bound
    /// elsewhere; binding the same pair again succeeds.
    pub async fn associate(&self, name: &str, card_id: &str) -> Result<(), RegistryError> {
        let name = identifier(name, "robot key")?;
        let card_id = identifier(card_id, "card id")?;

        match self.store.associate(name, card_id).await? {
            AssociateOutcome::Associated => {
                info!("Card {} associated with robot {}", card_id, name);
                Ok(())
            }
            AssociateOutcome::CardNotFound => Err(RegistryError::CardNotFound),
            AssociateOutcome::RobotNotFound => Err(RegistryError::RobotNotFound),
            AssociateOutcome::AlreadyAssociated => Err(RegistryError::AlreadyAssociated),
        }
    }

    pub async fn disassociate(&self, name: &str) -> Result<(), RegistryError> {
        let name = identifier(name, "robot key")?;
        if !self.store.disassociate(name).await? {
            return Err(RegistryError::RobotNotFound);
        }
        info!("Robot {} disassociated", name);
        Ok(())
    }

    /// The robot currently bound to `card_id`
    pub async fn robot_for_card(&self, card_id: &str) -> Result<Robot, RegistryError> {
        let card_id = identifier(card_id, "card id")?;
        self.store
            .find_robot_by_card(card_id)
            .await?
            .ok_or(RegistryError::NoAssociatedRobot)
    }

    pub async fn health_check(&self) -> Result<(), RegistryError> {
        Ok(self.store.health_check().await?)
    }
}

fn identifier<'a>(value: &'a str, what: &'static str) -> Result<&'a str, RegistryError> {
    if value.trim().is_empty() {
        Err(RegistryError::InvalidIdentifier(what))
    } else {
        Ok(value)
    }
}

fn validate_url(raw: &str) -> Result<String, RegistryError> {
    let parsed = Url::parse(raw).map_err(|e| RegistryError::InvalidUrl(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(RegistryError::InvalidUrl(format!(
            "unsupported scheme '{}'",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none() {
        return Err(RegistryError::InvalidUrl("missing host".to_string()));
    }
    Ok(raw.to_string())
}
