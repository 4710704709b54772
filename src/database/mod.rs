pub mod manager;
pub mod memory;
pub mod models;
pub mod registry;
pub mod repository;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryRegistry;
pub use models::{Card, Robot};
pub use registry::{AssociateOutcome, RegistryStore};
pub use repository::PgRegistry;
