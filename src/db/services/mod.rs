//! The `services` module provides a high-level API for interacting with the
//! database. It encapsulates the query and transaction logic, letting the
//! HTTP handlers work with domain models without knowing about the underlying
//! schema.
//!
//! One sub-module per domain entity (machines, stores, maintenance logs,
//! asset tags). All public functions are re-exported here for convenient
//! access under the `crate::db::services::` path.

pub mod asset_tag_service;
pub mod machine_service;
pub mod maintenance_service;
pub mod store_service;

pub use asset_tag_service::*;
pub use machine_service::*;
pub use maintenance_service::*;
pub use store_service::*;
