// session/mod.rs - Server-held sessions
//
// Sessions live in a store and are addressed by a signed id, presented either
// as a cookie or in an `Authorization: Cookie <id>` header.

pub mod codec;
pub mod credential;
pub mod state;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, HeaderValue};
use thiserror::Error;
use tracing::debug;

use crate::database::DatabaseError;

pub use codec::SessionCodec;
pub use credential::{CredentialKind, CredentialResolver, CredentialSource, ResolvedSession};
pub use state::SessionState;
pub use store::{MemorySessionStore, PgSessionStore, SessionStore};

#[derive(Debug, Error)]
pub enum SessionError {
    /// Malformed or forged credential, or an unknown session id. The reason is
    /// deliberately not carried.
    #[error("Invalid credential")]
    InvalidCredential,

    #[error("Corrupt session record: {0}")]
    CorruptRecord(String),

    #[error("Invalid session cookie settings")]
    InvalidCookie,

    #[error("Session store error: {0}")]
    Store(#[from] DatabaseError),
}

/// Attributes of the session cookie
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub max_age: Duration,
}

impl CookieSettings {
    pub fn header_value(&self, encoded: &str) -> Result<HeaderValue, SessionError> {
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly",
            self.name,
            encoded,
            self.max_age.as_secs()
        );
        if let Some(domain) = self.domain.as_deref().filter(|d| !d.is_empty()) {
            cookie.push_str("; Domain=");
            cookie.push_str(domain);
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie).map_err(|_| SessionError::InvalidCookie)
    }
}

/// Resolves, persists and encodes sessions
pub struct SessionManager {
    resolver: CredentialResolver,
    store: Arc<dyn SessionStore>,
    codec: Arc<SessionCodec>,
    cookie: CookieSettings,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, cookie_secret: &[u8], cookie: CookieSettings) -> Self {
        let codec = Arc::new(SessionCodec::new(cookie_secret.to_vec(), cookie.name.clone()));
        let resolver = CredentialResolver::standard(Arc::clone(&codec), Arc::clone(&store));
        Self {
            resolver,
            store,
            codec,
            cookie,
        }
    }

    pub async fn resolve(&self, headers: &HeaderMap) -> Result<ResolvedSession, SessionError> {
        self.resolver.resolve(headers).await
    }

    /// Store the session values and return the matching `Set-Cookie` value
    pub async fn persist(&self, session: &ResolvedSession) -> Result<HeaderValue, SessionError> {
        self.store
            .save(session.id, &session.state, self.cookie.max_age)
            .await?;
        debug!("Saved session {} ({:?})", session.id, session.kind);
        self.cookie.header_value(&self.encode(session)?)
    }

    /// Encoded id, usable as cookie value or after `Authorization: Cookie`
    pub fn encode(&self, session: &ResolvedSession) -> Result<String, SessionError> {
        self.codec.encode(&session.id)
    }

    pub async fn health_check(&self) -> Result<(), SessionError> {
        self.store.health_check().await
    }
}
