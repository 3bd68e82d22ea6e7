//! Database schema and pool initialization

pub mod init;

pub use init::*;
