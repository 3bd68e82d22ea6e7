//! Spreadsheet ingestion
//!
//! One parser per upload type. Each parser reads the first worksheet of an
//! xlsx payload into domain rows and validates structure up front; a rejected
//! file persists nothing.

pub mod clasificacion;
pub mod pre_alerta;
pub mod pre_ruteo;
pub mod workbook;

pub use clasificacion::{parse_clasificacion, ClasificacionParse};
pub use pre_alerta::{parse_pre_alerta, PreAlertaParse};
pub use pre_ruteo::{parse_pre_ruteo, PreRuteoParse};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read workbook: {0}")]
    Workbook(String),

    #[error("workbook has no worksheets")]
    NoWorksheet,

    #[error("file is empty")]
    Empty,

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("file has {found} rows, need at least {required}")]
    TooFewRows { found: usize, required: usize },
}
