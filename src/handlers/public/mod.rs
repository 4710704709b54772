// handlers/public/mod.rs - Handlers open to any session
//
// The session middleware still runs (except for health), but no access level
// is required. Login and start are where sessions gain their rights.

pub mod health;
pub mod info;
pub mod session;

pub use health::health;
pub use info::{info_get, Info};
pub use session::{card_login, logout, start};
