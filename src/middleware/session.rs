// middleware/session.rs - Resolve the request's session before any handler runs

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::app::AppState;
use crate::error::ApiError;

/// Resolves the session from the `Authorization: Cookie` header or the session
/// cookie and injects a `ResolvedSession` into request extensions.
///
/// Resolution failures end the request with a 401 and no handler runs.
/// Successful responses are marked non-cacheable.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = match state.sessions.resolve(request.headers()).await {
        Ok(session) => session,
        Err(err) => return ApiError::from(err).into_response(),
    };

    debug!(
        "Session {:?}: admin={:?} card={:?}",
        session.kind,
        session.state.admin.as_deref().unwrap_or(""),
        session.state.card_id().unwrap_or("")
    );
    request.extensions_mut().insert(session);

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("max-age=0, no-cache, no-store"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}
