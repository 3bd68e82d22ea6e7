//! HTTP API handlers
//!
//! Each module owns one resource family and exposes a `*_routes()` builder
//! merged into the service router in [`crate::build_router`].

pub mod entries;
pub mod health;
pub mod inventory;
pub mod labels;
pub mod locations;
pub mod notifications;
pub mod packages;
pub mod providers;
pub mod reexpedicion;
pub mod stats;
pub mod trucks;
pub mod warehouses;

pub use entries::entry_routes;
pub use health::health_routes;
pub use inventory::inventory_routes;
pub use labels::label_routes;
pub use locations::location_routes;
pub use notifications::notification_routes;
pub use packages::package_routes;
pub use providers::provider_routes;
pub use reexpedicion::reexpedicion_routes;
pub use stats::stats_routes;
pub use trucks::truck_routes;
pub use warehouses::warehouse_routes;
