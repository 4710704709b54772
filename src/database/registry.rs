use async_trait::async_trait;

use super::manager::DatabaseError;
use super::models::{Card, Robot};

/// Result of an association attempt. Everything except `Associated` means the
/// store was left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociateOutcome {
    Associated,
    CardNotFound,
    RobotNotFound,
    AlreadyAssociated,
}

/// Document-store access for cards and robots.
///
/// Implementations must apply `associate` as one atomic conditional write: the
/// robot takes the card only if the card exists, the robot is free (or already
/// holds that card) and no other robot holds it.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    async fn find_card(&self, card_id: &str) -> Result<Option<Card>, DatabaseError>;

    async fn upsert_card(&self, card: &Card) -> Result<(), DatabaseError>;

    async fn find_robot(&self, name: &str) -> Result<Option<Robot>, DatabaseError>;

    async fn find_robot_by_card(&self, card_id: &str) -> Result<Option<Robot>, DatabaseError>;

    async fn list_robots(&self) -> Result<Vec<Robot>, DatabaseError>;

    /// Insert with an empty `card_id`, or update only the url of an existing robot
    async fn upsert_robot(&self, name: &str, url: &str) -> Result<(), DatabaseError>;

    /// Returns the number of removed robots
    async fn delete_robot(&self, name: &str) -> Result<u64, DatabaseError>;

    async fn associate(&self, name: &str, card_id: &str) -> Result<AssociateOutcome, DatabaseError>;

    /// Returns false when the robot does not exist
    async fn disassociate(&self, name: &str) -> Result<bool, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}
