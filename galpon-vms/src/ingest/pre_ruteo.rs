//! Pre-ruteo route plan parser
//!
//! The route planner exports a fixed layout: four title rows, headers on the
//! fifth row (index 4), data from the sixth, and column A left blank as a
//! gutter. Dates arrive as Excel serial numbers.

use std::collections::HashMap;

use calamine::Data;

use super::workbook::{
    cell_to_date_rfc3339, cell_to_f64, cell_to_opt_string, cell_to_string, first_sheet_cells,
    header_positions, missing_headers, row_is_empty,
};
use super::IngestError;
use crate::models::PreRuteoRecord;

pub const REQUIRED_HEADERS: [&str; 16] = [
    "Código cliente",
    "Razón social",
    "Domicilio",
    "Tipo de Cliente",
    "Fecha de Reparto",
    "Codigo Reparto",
    "Máquina",
    "Chofer",
    "Fecha De Pedido",
    "Codigo de Pedido",
    "Ventana Horaria",
    "Arribo",
    "Partida",
    "Peso (kg)",
    "Volumen (m3)",
    "Dinero ($)",
];

const HEADER_ROW: usize = 4;
const DATA_ROW: usize = 5;
const MIN_ROWS: usize = 6;

#[derive(Debug)]
pub struct PreRuteoParse {
    pub records: Vec<PreRuteoRecord>,
    /// Rows dropped for lacking a codigo de pedido
    pub skipped: usize,
}

pub fn parse_pre_ruteo(bytes: &[u8]) -> Result<PreRuteoParse, IngestError> {
    let grid = first_sheet_cells(bytes)?;
    if grid.len() < MIN_ROWS {
        return Err(IngestError::TooFewRows {
            found: grid.len(),
            required: MIN_ROWS,
        });
    }

    // Headers sit at row index 4; column A is skipped as the blank gutter
    let positions: HashMap<String, usize> = header_positions(&grid[HEADER_ROW])
        .into_iter()
        .filter(|&(_, idx)| idx >= 1)
        .collect();

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
    let date = |row: &[Data], name: &str| -> Option<String> {
        positions
            .get(name)
            .and_then(|&idx| row.get(idx))
            .and_then(cell_to_date_rfc3339)
    };

    let mut records = Vec::new();
    let mut skipped = 0;

    for row in grid.iter().skip(DATA_ROW) {
        if row.len() <= 1 || row_is_empty(&row[1..]) {
            continue;
        }
        let codigo_pedido = match text(row, "Codigo de Pedido") {
            Some(c) => c,
            None => {
                skipped += 1;
                continue;
            }
        };

        records.push(PreRuteoRecord {
            codigo_cliente: text(row, "Código cliente"),
            razon_social: text(row, "Razón social"),
            domicilio: text(row, "Domicilio"),
            tipo_cliente: text(row, "Tipo de Cliente"),
            fecha_reparto: date(row, "Fecha de Reparto"),
            codigo_reparto: text(row, "Codigo Reparto"),
            maquina: text(row, "Máquina"),
            chofer: text(row, "Chofer"),
            fecha_pedido: date(row, "Fecha De Pedido"),
            codigo_pedido,
            ventana_horaria: text(row, "Ventana Horaria"),
            arribo: date(row, "Arribo"),
            partida: date(row, "Partida"),
            peso_kg: number(row, "Peso (kg)"),
            volumen_m3: number(row, "Volumen (m3)"),
            dinero: number(row, "Dinero ($)"),
            raw_data: raw_row_json(&positions, row),
        });
    }

    Ok(PreRuteoParse { records, skipped })
}

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
