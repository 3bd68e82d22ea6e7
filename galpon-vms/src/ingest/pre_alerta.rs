//! Pre-alerta manifest parser
//!
//! First row carries headers, data follows. All 16 carrier columns must be
//! present by exact name before any row is accepted.

use std::collections::HashMap;

use calamine::Data;

use super::workbook::{
    cell_to_f64, cell_to_opt_string, cell_to_string, first_sheet_cells, header_positions,
    missing_headers, row_is_empty,
};
use super::IngestError;
use crate::models::PreAlertaRecord;

/// Column headers as exported by the carrier, `Buyer Lcation` typo included
pub const REQUIRED_HEADERS: [&str; 16] = [
    "Client",
    "Country",
    "Tracking Number",
    "Weight",
    "Value",
    "Buyer Normalized ID",
    "Buyer",
    "Buyer Address1",
    "Buyer Address1 Number",
    "Buyer Address2",
    "Buyer City",
    "Buyer State",
    "Buyer Lcation",
    "Buyer ZIP",
    "Buyer Phone",
    "Buyer Email",
];

#[derive(Debug)]
pub struct PreAlertaParse {
    pub records: Vec<PreAlertaRecord>,
    /// Rows dropped for lacking a tracking number
    pub skipped: usize,
}

pub fn parse_pre_alerta(bytes: &[u8]) -> Result<PreAlertaParse, IngestError> {
    let grid = first_sheet_cells(bytes)?;
    let header_row = grid.first().ok_or(IngestError::Empty)?;
    let positions = header_positions(header_row);

    let missing = missing_headers(&REQUIRED_HEADERS, &positions);
    if !missing.is_empty() {
        return Err(IngestError::MissingColumns(missing));
    }

    let text = |row: &[Data], name: &str| -> Option<String> {
        positions
            .get(name)
            .and_then(|&idx| row.get(idx))
            .and_then(cell_to_opt_string)
    };
    let number = |row: &[Data], name: &str| -> Option<f64> {
        positions
            .get(name)
            .and_then(|&idx| row.get(idx))
            .and_then(cell_to_f64)
    };

    let mut records = Vec::new();
    let mut skipped = 0;

    for row in grid.iter().skip(1) {
        if row_is_empty(row) {
            continue;
        }
        let tracking = match text(row, "Tracking Number") {
            Some(t) => t,
            None => {
                skipped += 1;
                continue;
            }
        };

        records.push(PreAlertaRecord {
            tracking_number: tracking,
            client: text(row, "Client"),
            country: text(row, "Country"),
            weight: number(row, "Weight"),
            value: number(row, "Value"),
            buyer_normalized_id: text(row, "Buyer Normalized ID"),
            buyer: text(row, "Buyer"),
            buyer_address1: text(row, "Buyer Address1"),
            buyer_address1_number: text(row, "Buyer Address1 Number"),
            buyer_address2: text(row, "Buyer Address2"),
            buyer_city: text(row, "Buyer City"),
            buyer_state: text(row, "Buyer State"),
            buyer_location: text(row, "Buyer Lcation"),
            buyer_zip: text(row, "Buyer ZIP"),
            buyer_phone: text(row, "Buyer Phone"),
            buyer_email: text(row, "Buyer Email"),
            raw_data: raw_row_json(&positions, row),
        });
    }

    Ok(PreAlertaParse { records, skipped })
}

/// Snapshot of the original row for audit, keyed by header text
fn raw_row_json(positions: &HashMap<String, usize>, row: &[Data]) -> Option<String> {
    let mut map = serde_json::Map::new();
    for (name, &idx) in positions {
        if let Some(cell) = row.get(idx) {
            let rendered = cell_to_string(cell);
            if !rendered.is_empty() {
                map.insert(name.clone(), serde_json::Value::String(rendered));
            }
        }
    }
    if map.is_empty() {
        None
    } else {
        serde_json::to_string(&map).ok()
    }
}
