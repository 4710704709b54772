// handlers/mod.rs - Handlers by access tier
//
// Public (any session) -> Protected (bound card) -> Elevated (admin)

pub mod elevated;
pub mod protected;
pub mod public;

pub use elevated::*;
pub use protected::*;
pub use public::*;
