//! Domain types for the warehouse operations workflows

pub mod catalog;
pub mod entry;
pub mod inventory;
pub mod label;
pub mod notification;
pub mod package;
pub mod reexpedicion;

pub use catalog::*;
pub use entry::*;
pub use inventory::*;
pub use label::*;
pub use notification::*;
pub use package::*;
pub use reexpedicion::*;
