use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use captain_api::app::{router, AppState};
use captain_api::config::AppConfig;
use captain_api::database::{DatabaseManager, MemoryRegistry, PgRegistry, RegistryStore};
use captain_api::session::{MemorySessionStore, PgSessionStore, SessionStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL and the secrets
    let _ = dotenvy::dotenv();

    let config = AppConfig::from_env();

    let default_filter = if config.server.debug {
        "captain_api=debug,tower_http=debug"
    } else {
        "captain_api=info,tower_http=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    info!("Starting Captain API in {:?} mode", config.environment);
    config.validate().context("invalid configuration")?;

    if config.security.start_secret_key.is_empty() {
        warn!("START_SECRET_KEY is empty, start tokens are not checked");
    }

    let (sessions, registry): (Arc<dyn SessionStore>, Arc<dyn RegistryStore>) =
        match &config.database.url {
            Some(_) => {
                let pool = DatabaseManager::connect(&config.database)
                    .await
                    .context("failed to connect to the database")?;
                DatabaseManager::bootstrap(&pool)
                    .await
                    .context("failed to create tables")?;
                (
                    Arc::new(PgSessionStore::new(pool.clone())),
                    Arc::new(PgRegistry::new(pool)),
                )
            }
            None => {
                warn!("DATABASE_URL not set, using in-memory stores");
                (
                    Arc::new(MemorySessionStore::new()),
                    Arc::new(MemoryRegistry::new()),
                )
            }
        };

    let state = AppState::new(&config, sessions, registry).context("failed to build state")?;
    let app = router(state);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Captain API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
