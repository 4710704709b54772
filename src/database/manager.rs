use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from the document store
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Schema applied on startup. The partial unique index is what keeps one card
/// bound to at most one robot, whatever the number of concurrent writers.
const BOOTSTRAP: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS cards (
        card_id TEXT PRIMARY KEY,
        program BYTEA NOT NULL DEFAULT ''::bytea
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS robots (
        name    TEXT PRIMARY KEY,
        url     TEXT NOT NULL,
        card_id TEXT NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS robots_card_id_key
        ON robots (card_id)
        WHERE card_id <> ''
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sessions (
        id          UUID PRIMARY KEY,
        data        JSONB NOT NULL,
        modified_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        expires_at  TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS sessions_expires_at_idx
        ON sessions (expires_at)
    "#,
];

/// Connection pool setup for the registry and session tables
pub struct DatabaseManager;

impl DatabaseManager {
    /// Open a pool against the configured database
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let url = config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
        url::Url::parse(url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!(
            "Connected to document store (max {} connections)",
            config.max_connections
        );
        Ok(pool)
    }

    /// Create tables and indexes if they do not exist yet
    pub async fn bootstrap(pool: &PgPool) -> Result<(), DatabaseError> {
        for statement in BOOTSTRAP {
            sqlx::query(statement).execute(pool).await?;
        }
        info!("Document store schema ready");
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}
