//! Domain types for the verification and sorting workflows

pub mod clasificacion;
pub mod records;
pub mod scan;
pub mod shipment;

pub use clasificacion::*;
pub use records::*;
pub use scan::*;
pub use shipment::*;
