pub mod cors;
pub mod response;
pub mod session;

pub use cors::cors_middleware;
pub use response::{ApiResult, Done, WithSession};
pub use session::session_middleware;
