// session/credential.rs - Where a request presents its session
//
// Two sources yield the same `ResolvedSession`: an `Authorization: Cookie <id>`
// header (mobile clients, scripts) and the session cookie (browsers). The header
// wins when both are present.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use tracing::debug;
use uuid::Uuid;

use super::{SessionCodec, SessionError, SessionState, SessionStore};

/// Scheme marker of the header credential
pub const AUTHORIZATION_SCHEME: &str = "Cookie";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    HeaderToken,
    Cookie,
}

/// Session values for the current request, independent of how they were presented
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub id: Uuid,
    pub state: SessionState,
    pub kind: CredentialKind,
    /// Nothing is stored under `id` yet
    pub is_new: bool,
}

#[async_trait]
pub trait CredentialSource: Send + Sync {
    fn kind(&self) -> CredentialKind;

    /// Whether the request carries this kind of credential
    fn is_presented(&self, headers: &HeaderMap) -> bool;

    async fn resolve(&self, headers: &HeaderMap) -> Result<ResolvedSession, SessionError>;
}

/// `Authorization: Cookie <encoded session id>`
pub struct HeaderTokenSource {
    codec: Arc<SessionCodec>,
    store: Arc<dyn SessionStore>,
}

impl HeaderTokenSource {
    pub fn new(codec: Arc<SessionCodec>, store: Arc<dyn SessionStore>) -> Self {
        Self { codec, store }
    }
}

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::AUTHORIZATION)?.to_str().ok()
}

#[async_trait]
impl CredentialSource for HeaderTokenSource {
    fn kind(&self) -> CredentialKind {
        CredentialKind::HeaderToken
    }

    fn is_presented(&self, headers: &HeaderMap) -> bool {
        authorization(headers).is_some_and(|value| value.starts_with(AUTHORIZATION_SCHEME))
    }

    async fn resolve(&self, headers: &HeaderMap) -> Result<ResolvedSession, SessionError> {
        let value = authorization(headers).ok_or(SessionError::InvalidCredential)?;

        let parts: Vec<&str> = value.split(' ').collect();
        if parts.len() <= 1 {
            return Err(SessionError::InvalidCredential);
        }
        let encoded = parts[parts.len() - 1];

        let id = self.codec.decode(encoded)?;
        debug!("Authorization header session {}", id);

        // A header credential must name a live session; nothing is created here.
        let state = self
            .store
            .load(id)
            .await?
            .ok_or(SessionError::InvalidCredential)?;

        Ok(ResolvedSession {
            id,
            state,
            kind: CredentialKind::HeaderToken,
            is_new: false,
        })
    }
}

/// The signed session cookie; starts a new session when none is presented
pub struct CookieSessionSource {
    codec: Arc<SessionCodec>,
    store: Arc<dyn SessionStore>,
}

impl CookieSessionSource {
    pub fn new(codec: Arc<SessionCodec>, store: Arc<dyn SessionStore>) -> Self {
        Self { codec, store }
    }
}

/// Value of cookie `name` from the `Cookie` request header(s)
pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.trim_matches('"').to_string())
        })
}

#[async_trait]
impl CredentialSource for CookieSessionSource {
    fn kind(&self) -> CredentialKind {
        CredentialKind::Cookie
    }

    fn is_presented(&self, _headers: &HeaderMap) -> bool {
        true
    }

    async fn resolve(&self, headers: &HeaderMap) -> Result<ResolvedSession, SessionError> {
        let Some(value) = parse_cookie(headers, self.codec.name()) else {
            return Ok(ResolvedSession {
                id: Uuid::new_v4(),
                state: SessionState::default(),
                kind: CredentialKind::Cookie,
                is_new: true,
            });
        };

        let id = self.codec.decode(&value)?;
        debug!("Cookie found / session {}", id);

        // An expired record restarts the session under the same signed id.
        let (state, is_new) = match self.store.load(id).await? {
            Some(state) => (state, false),
            None => (SessionState::default(), true),
        };

        Ok(ResolvedSession {
            id,
            state,
            kind: CredentialKind::Cookie,
            is_new,
        })
    }
}

/// Tries each source in order and resolves through the first one presented
pub struct CredentialResolver {
    sources: Vec<Box<dyn CredentialSource>>,
}

impl CredentialResolver {
    pub fn new(sources: Vec<Box<dyn CredentialSource>>) -> Self {
        Self { sources }
    }

    /// Header token first, cookie as fallback
    pub fn standard(codec: Arc<SessionCodec>, store: Arc<dyn SessionStore>) -> Self {
        Self::new(vec![
            Box::new(HeaderTokenSource::new(Arc::clone(&codec), Arc::clone(&store))),
            Box::new(CookieSessionSource::new(codec, store)),
        ])
    }

    pub async fn resolve(&self, headers: &HeaderMap) -> Result<ResolvedSession, SessionError> {
        for source in &self.sources {
            if source.is_presented(headers) {
                debug!("Resolving session from {:?}", source.kind());
                return source.resolve(headers).await;
            }
        }
        Err(SessionError::InvalidCredential)
    }
}
