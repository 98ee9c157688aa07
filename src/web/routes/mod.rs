pub mod machine_routes;
pub mod maintenance_routes;
pub mod store_routes;
pub mod tag_routes;
