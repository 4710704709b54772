use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::DatabaseError;

use super::{SessionError, SessionState};

/// Persistence for session values, with store-defined expiry
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns `None` for unknown or expired sessions
    async fn load(&self, id: Uuid) -> Result<Option<SessionState>, SessionError>;

    async fn save(&self, id: Uuid, state: &SessionState, ttl: Duration) -> Result<(), SessionError>;

    async fn health_check(&self) -> Result<(), SessionError>;
}

/// Sessions kept in the `sessions` table
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn load(&self, id: Uuid) -> Result<Option<SessionState>, SessionError> {
        let data = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT data FROM sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        data.map(SessionState::from_json).transpose()
    }

    async fn save(&self, id: Uuid, state: &SessionState, ttl: Duration) -> Result<(), SessionError> {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX / 2);
        let expires_at = Utc::now() + chrono::Duration::seconds(ttl_secs);

        sqlx::query(
            "INSERT INTO sessions (id, data, modified_at, expires_at) VALUES ($1, $2, NOW(), $3)
             ON CONFLICT (id) DO UPDATE
             SET data = EXCLUDED.data, modified_at = NOW(), expires_at = EXCLUDED.expires_at",
        )
        .bind(id)
        .bind(state.to_json())
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), SessionError> {
        crate::database::DatabaseManager::health_check(&self.pool).await?;
        Ok(())
    }
}

/// In-process sessions for development and tests
#[derive(Default)]
pub struct MemorySessionStore {
    records: RwLock<HashMap<Uuid, (SessionState, Instant)>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: Uuid) -> Result<Option<SessionState>, SessionError> {
        let records = self.records.read().await;
        Ok(records
            .get(&id)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(state, _)| state.clone()))
    }

    async fn save(&self, id: Uuid, state: &SessionState, ttl: Duration) -> Result<(), SessionError> {
        let now = Instant::now();
        let expires_at = now.checked_add(ttl).unwrap_or(now);
        let mut records = self.records.write().await;
        records.retain(|_, (_, expiry)| *expiry > now);
        records.insert(id, (state.clone(), expires_at));
        Ok(())
    }

    async fn health_check(&self) -> Result<(), SessionError> {
        Ok(())
    }
}
