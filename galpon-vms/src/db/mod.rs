//! Database operations for the VMS service

pub mod clasificacion;
pub mod records;
pub mod scans;
pub mod shipments;
