//! SeaORM entities mapping to the inventory tables.
//!
//! Each entity lives in its own module (`machine.rs`, `store.rs`, ...).

pub mod asset_tag;
pub mod machine;
pub mod maintenance_log;
pub mod store;
