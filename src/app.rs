// app.rs - Shared state and route table

use std::sync::Arc;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::auth::TokenVerifier;
use crate::config::AppConfig;
use crate::database::RegistryStore;
use crate::handlers;
use crate::middleware::{cors_middleware, session_middleware};
use crate::services::{CommandRelay, RegistryService, RelayError};
use crate::session::{CookieSettings, SessionManager, SessionStore};

/// Everything a handler may need; cheap to clone per request
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub registry: RegistryService,
    pub relay: Arc<CommandRelay>,
    pub admin_tokens: Arc<TokenVerifier>,
    pub start_tokens: Arc<TokenVerifier>,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        session_store: Arc<dyn SessionStore>,
        registry_store: Arc<dyn RegistryStore>,
    ) -> Result<Self, RelayError> {
        let cookie = CookieSettings {
            name: config.session.cookie_name.clone(),
            domain: config.session.cookie_domain.clone(),
            secure: config.session.cookie_secure,
            max_age: config.session.max_age(),
        };
        let sessions = SessionManager::new(
            session_store,
            config.security.cookie_secret_key.as_bytes(),
            cookie,
        );

        let registry = RegistryService::new(registry_store);
        let relay = CommandRelay::new(registry.clone(), config.relay.timeout())?;

        let spec = config.security.token_spec();
        Ok(Self {
            sessions: Arc::new(sessions),
            registry,
            relay: Arc::new(relay),
            admin_tokens: Arc::new(TokenVerifier::required(
                config.security.admin_secret_key.as_bytes(),
                spec,
            )),
            start_tokens: Arc::new(TokenVerifier::optional(
                config.security.start_secret_key.as_bytes(),
                spec,
            )),
        })
    }
}

pub fn router(state: AppState) -> Router {
    // Every route except health runs behind session resolution
    let with_session = Router::new()
        .merge(session_routes())
        .merge(card_routes())
        .merge(robot_routes())
        .route_layer(from_fn_with_state(state.clone(), session_middleware));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(with_session)
        // Global middleware, outermost first
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(from_fn(cors_middleware)),
        )
        .with_state(state)
}

fn session_routes() -> Router<AppState> {
    use handlers::public;

    Router::new()
        .route("/start/:card_id", get(public::start))
        .route("/cardlogin/:token", get(public::card_login))
        .route("/logout", get(public::logout))
        .route("/v1/info", get(public::info_get))
}

fn card_routes() -> Router<AppState> {
    use handlers::protected;

    Router::new()
        .route(
            "/v1/card/:card_id",
            get(protected::card_get)
                .put(protected::card_put)
                .post(protected::card_put),
        )
        .route("/v1/card/:card_id/ping", get(protected::card_ping))
        .route("/v1/card/:card_id/run", get(protected::card_run))
        .route("/v1/card/:card_id/stop", get(protected::card_stop))
        .route(
            "/v1/card/:card_id/upload",
            get(protected::card_upload)
                .put(protected::card_upload)
                .post(protected::card_upload),
        )
}

fn robot_routes() -> Router<AppState> {
    use handlers::elevated;

    Router::new()
        .route("/v1/robots", get(elevated::robots_list))
        .route(
            "/v1/robot/:robot_key",
            get(elevated::robot_get)
                .put(elevated::robot_put)
                .post(elevated::robot_put)
                .delete(elevated::robot_delete),
        )
        .route("/v1/robot/:robot_key/ping", get(elevated::robot_ping))
        .route(
            "/v1/robot/:robot_key/card/:card_id",
            put(elevated::associate).post(elevated::associate),
        )
        .route(
            "/v1/robot/:robot_key/card",
            axum::routing::delete(elevated::disassociate),
        )
}
