pub mod registry_service;
pub mod relay_service;

pub use registry_service::{RegistryError, RegistryService};
pub use relay_service::{command_url, Command, CommandRelay, RelayError, RelayResponse};
