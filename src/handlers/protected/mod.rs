// handlers/protected/mod.rs - Handlers scoped to the session's card
//
// Card program access is open to the bound card or an admin. Robot commands
// require the session itself to be bound to the card in the path.

pub mod card;
pub mod control;

pub use card::{card_get, card_put};
pub use control::{card_ping, card_run, card_stop, card_upload};
