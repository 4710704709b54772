use async_trait::async_trait;
use sqlx::PgPool;

use super::manager::{DatabaseError, DatabaseManager};
use super::models::{Card, Robot};
use super::registry::{AssociateOutcome, RegistryStore};

/// PostgreSQL-backed registry
#[derive(Clone)]
pub struct PgRegistry {
    pool: PgPool,
}

impl PgRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Explain why a conditional association touched no row. Read-only.
    async fn diagnose(&self, name: &str, card_id: &str) -> Result<AssociateOutcome, DatabaseError> {
        if self.find_card(card_id).await?.is_none() {
            return Ok(AssociateOutcome::CardNotFound);
        }
        if self.find_robot(name).await?.is_none() {
            return Ok(AssociateOutcome::RobotNotFound);
        }
        Ok(AssociateOutcome::AlreadyAssociated)
    }
}

#[async_trait]
impl RegistryStore for PgRegistry {
    async fn find_card(&self, card_id: &str) -> Result<Option<Card>, DatabaseError> {
        let card = sqlx::query_as::<_, Card>("SELECT card_id, program FROM cards WHERE card_id = $1")
            .bind(card_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(card)
    }

    async fn upsert_card(&self, card: &Card) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO cards (card_id, program) VALUES ($1, $2)
             ON CONFLICT (card_id) DO UPDATE SET program = EXCLUDED.program",
        )
        .bind(&card.card_id)
        .bind(&card.program)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_robot(&self, name: &str) -> Result<Option<Robot>, DatabaseError> {
        let robot = sqlx::query_as::<_, Robot>("SELECT name, url, card_id FROM robots WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(robot)
    }

    async fn find_robot_by_card(&self, card_id: &str) -> Result<Option<Robot>, DatabaseError> {
        if card_id.is_empty() {
            return Ok(None);
        }
        let robot = sqlx::query_as::<_, Robot>(
            "SELECT name, url, card_id FROM robots WHERE card_id = $1 AND card_id <> ''",
        )
        .bind(card_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(robot)
    }

    async fn list_robots(&self) -> Result<Vec<Robot>, DatabaseError> {
        let robots = sqlx::query_as::<_, Robot>("SELECT name, url, card_id FROM robots ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(robots)
    }

    async fn upsert_robot(&self, name: &str, url: &str) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO robots (name, url, card_id) VALUES ($1, $2, '')
             ON CONFLICT (name) DO UPDATE SET url = EXCLUDED.url",
        )
        .bind(name)
        .bind(url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_robot(&self, name: &str) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM robots WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn associate(&self, name: &str, card_id: &str) -> Result<AssociateOutcome, DatabaseError> {
        // Single conditional write; robots_card_id_key rejects a second holder.
        let updated = sqlx::query_scalar::<_, String>(
            "UPDATE robots SET card_id = $2
             WHERE name = $1
               AND (card_id = '' OR card_id = $2)
               AND EXISTS (SELECT 1 FROM cards WHERE card_id = $2)
             RETURNING name",
        )
        .bind(name)
        .bind(card_id)
        .fetch_optional(&self.pool)
        .await;

        match updated {
            Ok(Some(_)) => Ok(AssociateOutcome::Associated),
            Ok(None) => self.diagnose(name, card_id).await,
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Ok(AssociateOutcome::AlreadyAssociated)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn disassociate(&self, name: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE robots SET card_id = '' WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}
