//! Sorting (clasificación) sheet parser
//!
//! The sorting sheet has no header contract; columns are addressed by fixed
//! position as produced by the route optimizer: B = tracking number,
//! F = vehicle, AF = visit order. Only packages verified `OK` during the
//! shipment's verification stage are kept.

use std::collections::{HashMap, HashSet};

use super::workbook::{cell_to_opt_string, cell_to_string, first_sheet_cells, row_is_empty};
use super::IngestError;
use crate::models::ClasificacionRow;

pub const COL_TRACKING: usize = 1;
pub const COL_VEHICULO: usize = 5;
pub const COL_ORDEN_VISITA: usize = 31;

const MIN_ROWS: usize = 2;

#[derive(Debug)]
pub struct ClasificacionParse {
    pub rows: Vec<ClasificacionRow>,
    /// Rows lacking tracking or vehicle
    pub skipped_invalid: usize,
    /// Rows whose tracking was not verified OK
    pub skipped_not_ok: usize,
}

impl ClasificacionParse {
    /// Distinct vehicles with their package counts, in first-seen order
    pub fn vehicle_counts(&self) -> Vec<(String, usize)> {
        let mut order: Vec<String> = Vec::new();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for row in &self.rows {
            if !counts.contains_key(row.vehiculo.as_str()) {
                order.push(row.vehiculo.clone());
            }
            *counts.entry(row.vehiculo.as_str()).or_insert(0) += 1;
        }
        order
            .into_iter()
            .map(|v| {
                let count = counts.get(v.as_str()).copied().unwrap_or(0);
                (v, count)
            })
            .collect()
    }
}

/// Parse the sorting sheet, keeping only trackings in `ok_trackings`
///
/// Visit order `-` marks the start of a vehicle's route and resets its
/// numeric counter to 1; any other value increments it. Skipped rows never
/// touch the counter, so numbering stays contiguous per vehicle.
pub fn parse_clasificacion(
    bytes: &[u8],
    ok_trackings: &HashSet<String>,
) -> Result<ClasificacionParse, IngestError> {
    let grid = first_sheet_cells(bytes)?;
    if grid.len() < MIN_ROWS {
        return Err(IngestError::TooFewRows {
            found: grid.len(),
            required: MIN_ROWS,
        });
    }

    let mut counters: HashMap<String, i64> = HashMap::new();
    let mut rows = Vec::new();
    let mut skipped_invalid = 0;
    let mut skipped_not_ok = 0;

    for row in grid.iter().skip(1) {
        if row_is_empty(row) {
            continue;
        }

        let tracking = row
            .get(COL_TRACKING)
            .map(cell_to_string)
            .unwrap_or_default();
        let vehiculo = row
            .get(COL_VEHICULO)
            .map(cell_to_string)
            .unwrap_or_default();
        let orden_visita = row
            .get(COL_ORDEN_VISITA)
            .and_then(cell_to_opt_string)
            .unwrap_or_else(|| "-".to_string());

        if tracking.is_empty() || vehiculo.is_empty() {
            skipped_invalid += 1;
            continue;
        }
        if !ok_trackings.contains(&tracking) {
            skipped_not_ok += 1;
            continue;
        }

        let orden_numerico = if orden_visita == "-" {
            counters.insert(vehiculo.clone(), 1);
            1
        } else {
            let next = counters.get(&vehiculo).copied().unwrap_or(0) + 1;
            counters.insert(vehiculo.clone(), next);
            next
        };

        rows.push(ClasificacionRow {
            tracking_number: tracking,
            vehiculo,
            orden_visita,
            orden_numerico,
        });
    }

    Ok(ClasificacionParse {
        rows,
        skipped_invalid,
        skipped_not_ok,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn sorting_sheet(rows: &[(&str, &str, &str)]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(0, 0, "Orden").unwrap();
        for (i, (tracking, vehiculo, orden)) in rows.iter().enumerate() {
            let row = i as u32 + 1;
            if !tracking.is_empty() {
                worksheet
                    .write_string(row, COL_TRACKING as u16, *tracking)
                    .unwrap();
            }
            if !vehiculo.is_empty() {
                worksheet
                    .write_string(row, COL_VEHICULO as u16, *vehiculo)
                    .unwrap();
            }
            if !orden.is_empty() {
                worksheet
                    .write_string(row, COL_ORDEN_VISITA as u16, *orden)
                    .unwrap();
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    fn ok_set(trackings: &[&str]) -> HashSet<String> {
        trackings.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_dash_resets_vehicle_counter() {
        let bytes = sorting_sheet(&[
            ("T1", "V1", "-"),
            ("T2", "V1", "Calle 1"),
            ("T3", "V1", "Calle 2"),
            ("T4", "V1", "-"),
            ("T5", "V1", "Calle 3"),
        ]);
        let parse =
            parse_clasificacion(&bytes, &ok_set(&["T1", "T2", "T3", "T4", "T5"])).unwrap();
        let ordenes: Vec<i64> = parse.rows.iter().map(|r| r.orden_numerico).collect();
        assert_eq!(ordenes, vec![1, 2, 3, 1, 2]);
    }

    #[test]
    fn test_counters_are_independent_per_vehicle() {
        let bytes = sorting_sheet(&[
            ("T1", "V1", "-"),
            ("T2", "V2", "-"),
            ("T3", "V1", "a"),
            ("T4", "V2", "b"),
            ("T5", "V2", "c"),
        ]);
        let parse =
            parse_clasificacion(&bytes, &ok_set(&["T1", "T2", "T3", "T4", "T5"])).unwrap();
        let by_tracking: HashMap<&str, i64> = parse
            .rows
            .iter()
            .map(|r| (r.tracking_number.as_str(), r.orden_numerico))
            .collect();
        assert_eq!(by_tracking["T1"], 1);
        assert_eq!(by_tracking["T3"], 2);
        assert_eq!(by_tracking["T2"], 1);
        assert_eq!(by_tracking["T4"], 2);
        assert_eq!(by_tracking["T5"], 3);
    }

    #[test]
    fn test_not_ok_rows_skip_without_touching_counter() {
        let bytes = sorting_sheet(&[
            ("T1", "V1", "-"),
            ("SOBRANTE-1", "V1", "x"),
            ("T2", "V1", "y"),
        ]);
        let parse = parse_clasificacion(&bytes, &ok_set(&["T1", "T2"])).unwrap();
        assert_eq!(parse.skipped_not_ok, 1);
        assert_eq!(parse.rows.len(), 2);
        assert_eq!(parse.rows[1].tracking_number, "T2");
        assert_eq!(parse.rows[1].orden_numerico, 2);
    }

    #[test]
    fn test_rows_missing_tracking_or_vehicle_counted_invalid() {
        let bytes = sorting_sheet(&[("T1", "V1", "-"), ("", "V1", "x"), ("T3", "", "y")]);
        let parse = parse_clasificacion(&bytes, &ok_set(&["T1", "T3"])).unwrap();
        assert_eq!(parse.skipped_invalid, 2);
        assert_eq!(parse.rows.len(), 1);
    }

    #[test]
    fn test_missing_visit_order_defaults_to_dash() {
        let bytes = sorting_sheet(&[("T1", "V1", "")]);
        let parse = parse_clasificacion(&bytes, &ok_set(&["T1"])).unwrap();
        assert_eq!(parse.rows[0].orden_visita, "-");
        assert_eq!(parse.rows[0].orden_numerico, 1);
    }

    #[test]
    fn test_vehicle_counts_in_first_seen_order() {
        let bytes = sorting_sheet(&[
            ("T1", "V2", "-"),
            ("T2", "V1", "-"),
            ("T3", "V2", "a"),
        ]);
        let parse = parse_clasificacion(&bytes, &ok_set(&["T1", "T2", "T3"])).unwrap();
        assert_eq!(
            parse.vehicle_counts(),
            vec![("V2".to_string(), 2), ("V1".to_string(), 1)]
        );
    }

    #[test]
    fn test_header_only_sheet_rejected() {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(0, 0, "Orden").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let err = parse_clasificacion(&bytes, &HashSet::new()).unwrap_err();
        assert!(matches!(err, IngestError::TooFewRows { .. }));
    }
}
