//! HTTP API handlers
//!
//! Each module owns one resource family and exposes a `*_routes()` builder
//! merged into the service router in [`crate::build_router`].

pub mod clasificacion;
pub mod health;
pub mod pre_alerta;
pub mod pre_ruteo;
pub mod search;
pub mod shipments;
pub mod verification;

pub use clasificacion::clasificacion_routes;
pub use health::health_routes;
pub use pre_alerta::pre_alerta_routes;
pub use pre_ruteo::pre_ruteo_routes;
pub use search::search_routes;
pub use shipments::shipment_routes;
pub use verification::verification_routes;
