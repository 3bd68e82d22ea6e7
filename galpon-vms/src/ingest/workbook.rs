//! calamine helpers shared by the sheet parsers

use std::collections::HashMap;
use std::io::Cursor;

use calamine::{Data, Range, Reader, Xlsx};

use super::IngestError;

/// Open the first worksheet of an uploaded xlsx payload
pub fn first_sheet_range(bytes: &[u8]) -> Result<Range<Data>, IngestError> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).map_err(|e| IngestError::Workbook(e.to_string()))?;
    let name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(IngestError::NoWorksheet)?;
    workbook
        .worksheet_range(&name)
        .map_err(|e| IngestError::Workbook(e.to_string()))
}

/// Read the first worksheet into a dense grid addressed by absolute position
///
/// calamine ranges start at the first used cell. The route and sorting sheets
/// address columns by fixed letter, so leading empty rows and the column-A
/// gutter must stay in place; `grid[4][1]` is always B5.
pub fn first_sheet_cells(bytes: &[u8]) -> Result<Vec<Vec<Data>>, IngestError> {
    let range = first_sheet_range(bytes)?;
    let (start, end) = match (range.start(), range.end()) {
        (Some(s), Some(e)) => (s, e),
        _ => return Ok(Vec::new()),
    };

    let mut grid = vec![vec![Data::Empty; end.1 as usize + 1]; end.0 as usize + 1];
    for (r, row) in range.rows().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            grid[start.0 as usize + r][start.1 as usize + c] = cell.clone();
        }
    }
    Ok(grid)
}

/// Render a cell as trimmed text
///
/// Floats with integral value render without a trailing `.0`; tracking
/// numbers read from numeric cells must match their scanned form.
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => {
            if (f.floor() - f).abs() < f64::EPSILON && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                format!("{}", f)
            }
        }
        Data::Int(i) => format!("{}", i),
        Data::Bool(b) => format!("{}", b),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            if (serial.floor() - serial).abs() < f64::EPSILON {
                format!("{}", serial as i64)
            } else {
                format!("{}", serial)
            }
        }
        Data::DateTimeIso(s) => s.trim().to_string(),
        Data::DurationIso(s) => s.trim().to_string(),
        Data::Empty => String::new(),
        Data::Error(_) => String::new(),
    }
}

/// Optional text: `None` when the cell renders empty
pub fn cell_to_opt_string(cell: &Data) -> Option<String> {
    let s = cell_to_string(cell);
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Numeric value, accepting text cells with `,` as decimal separator
pub fn cell_to_f64(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::DateTime(dt) => Some(dt.as_f64()),
        Data::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                return None;
            }
            t.parse::<f64>()
                .ok()
                .or_else(|| t.replace(',', ".").parse::<f64>().ok())
        }
        _ => None,
    }
}

/// Date cell rendered as RFC 3339 UTC
///
/// Serial number cells convert through the spreadsheet epoch; text cells are
/// kept verbatim.
pub fn cell_to_date_rfc3339(cell: &Data) -> Option<String> {
    match cell {
        Data::Float(f) => {
            galpon_common::time::spreadsheet_serial_to_datetime(*f).map(|dt| dt.to_rfc3339())
        }
        Data::Int(i) => galpon_common::time::spreadsheet_serial_to_datetime(*i as f64)
            .map(|dt| dt.to_rfc3339()),
        Data::DateTime(dt) => galpon_common::time::spreadsheet_serial_to_datetime(dt.as_f64())
            .map(|dt| dt.to_rfc3339()),
        Data::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        }
        Data::DateTimeIso(s) => Some(s.trim().to_string()),
        _ => None,
    }
}

/// True when every cell in the slice renders empty
pub fn row_is_empty(row: &[Data]) -> bool {
    row.iter().all(|c| cell_to_string(c).is_empty())
}

/// Map trimmed header text to its column index, first occurrence wins
pub fn header_positions(row: &[Data]) -> HashMap<String, usize> {
    let mut positions = HashMap::new();
    for (idx, cell) in row.iter().enumerate() {
        let text = cell_to_string(cell);
        if !text.is_empty() {
            positions.entry(text).or_insert(idx);
        }
    }
    positions
}

/// Required headers absent from the position map, in declaration order
pub fn missing_headers(required: &[&str], positions: &HashMap<String, usize>) -> Vec<String> {
    required
        .iter()
        .filter(|h| !positions.contains_key(**h))
        .map(|h| h.to_string())
        .collect()
}
