use axum::{
    http::{header::SET_COOKIE, HeaderValue},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

/// `{"result": "done"}`, the success body of every mutating endpoint
#[derive(Debug, Default)]
pub struct Done;

impl IntoResponse for Done {
    fn into_response(self) -> Response {
        Json(json!({ "result": "done" })).into_response()
    }
}

/// JSON body plus the `Set-Cookie` of a freshly persisted session
#[derive(Debug)]
pub struct WithSession<T> {
    pub body: T,
    pub cookie: HeaderValue,
}

impl<T: IntoResponse> IntoResponse for WithSession<T> {
    fn into_response(self) -> Response {
        let mut response = self.body.into_response();
        response.headers_mut().append(SET_COOKIE, self.cookie);
        response
    }
}

// Convenience type aliases
pub type ApiResult<T> = Result<T, crate::error::ApiError>;
