//! Spreadsheet report generation
//!
//! Reports are built fully in memory with `rust_xlsxwriter` and returned as
//! download bytes; nothing is written to disk.

pub mod clasificacion;
pub mod verification;

pub use clasificacion::clasificacion_workbook;
pub use verification::verification_workbook;

use uuid::Uuid;

/// MIME type for generated .xlsx downloads
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Attachment filename for a report: `{prefix}_{shipment date}_{short id}.xlsx`
pub fn attachment_filename(prefix: &str, shipment_date: &str, id: Uuid) -> String {
    let id = id.simple().to_string();
    format!("{prefix}_{shipment_date}_{}.xlsx", &id[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_filename_shape() {
        let id = Uuid::parse_str("a1b2c3d4-0000-0000-0000-000000000000").unwrap();
        assert_eq!(
            attachment_filename("verificacion", "2026-08-20", id),
            "verificacion_2026-08-20_a1b2c3d4.xlsx"
        );
    }
}
