//! # Galpón Common Library
//!
//! Shared code for the Galpón warehouse services including:
//! - Database schema creation and pool initialization
//! - Configuration loading and data folder resolution
//! - Operator identity and provider scoping
//! - Pagination helpers for list endpoints
//! - Argentina-local time formatting and spreadsheet date conversion

pub mod config;
pub mod db;
pub mod error;
pub mod operator;
pub mod pagination;
pub mod time;

pub use error::{Error, Result};
pub use operator::{Operator, ProviderScope, Role};
