pub mod guard;
pub mod token;

pub use guard::{classify, require_admin, require_card, require_card_or_admin, Access, NotAuthorized};
pub use token::{
    generate, verify, DigestAlgorithm, TokenError, TokenSpec, TokenVerifier, MAX_PAYLOAD_SIZE,
};
