// handlers/elevated/mod.rs - Admin-only handlers
//
// Robot registry CRUD, listing, direct ping and association changes. Every
// handler checks admin rights before touching the registry.

pub mod association;
pub mod robot;

pub use association::{associate, disassociate};
pub use robot::{robot_delete, robot_get, robot_ping, robot_put, robots_list};
