//! Verification report workbook
//!
//! Two sheets. "Verificación" lists every tracking number of the shipment
//! exactly once: scanned packages first in scan order, then the unscanned
//! remainder labelled FALTANTE (in both sheets), FUERA_COBERTURA (manifest
//! only) or PREVIO (route plan only). "Resumen" totals the outcomes.

use std::collections::{HashMap, HashSet};

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use galpon_common::time;

use crate::db::records::{StoredPreAlerta, StoredPreRuteo};
use crate::models::{PreAlertaRecord, PreRuteoRecord, ScanStatus, ScannedPackage};

const HEADERS: [&str; 15] = [
    "Tracking Number",
    "Estado",
    "Fecha Escaneo",
    "Escaneado Por",
    "PA - Cliente",
    "PA - Ciudad",
    "PA - Dirección",
    "PA - CP",
    "PA - Peso",
    "PA - Valor",
    "PR - Razón Social",
    "PR - Domicilio",
    "PR - Chofer",
    "PR - Fecha Reparto",
    "PR - Peso (kg)",
];

pub fn verification_workbook(
    scans: &[ScannedPackage],
    pre_alertas: &[StoredPreAlerta],
    pre_ruteos: &[StoredPreRuteo],
) -> Result<Vec<u8>, XlsxError> {
    let pa_map: HashMap<&str, &PreAlertaRecord> = pre_alertas
        .iter()
        .map(|pa| (pa.record.tracking_number.as_str(), &pa.record))
        .collect();
    let pr_map: HashMap<&str, &PreRuteoRecord> = pre_ruteos
        .iter()
        .map(|pr| (pr.record.codigo_pedido.as_str(), &pr.record))
        .collect();
    let scanned: HashSet<&str> = scans.iter().map(|s| s.tracking_number.as_str()).collect();

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet().set_name("Verificación")?;

    let header_format = Format::new().set_bold();
    for (col, header) in HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    let mut row: u32 = 1;
    for scan in scans {
        let tracking = scan.tracking_number.as_str();
        write_row(
            sheet,
            row,
            tracking,
            scan.status.as_str(),
            Some(&time::format_datetime_ar(scan.scanned_at)),
            Some(&scan.scanned_by),
            pa_map.get(tracking).copied(),
            pr_map.get(tracking).copied(),
        )?;
        row += 1;
    }

    for pa in pre_alertas {
        let tracking = pa.record.tracking_number.as_str();
        if scanned.contains(tracking) {
            continue;
        }
        let pr = pr_map.get(tracking).copied();
        let estado = if pr.is_some() { "FALTANTE" } else { "FUERA_COBERTURA" };
        write_row(sheet, row, tracking, estado, None, None, Some(&pa.record), pr)?;
        row += 1;
    }

    for pr in pre_ruteos {
        let tracking = pr.record.codigo_pedido.as_str();
        if scanned.contains(tracking) || pa_map.contains_key(tracking) {
            continue;
        }
        write_row(sheet, row, tracking, "PREVIO", None, None, None, Some(&pr.record))?;
        row += 1;
    }

    // Summary counters follow membership, not scan outcomes: a scanned
    // FUERA_COBERTURA package still counts under "Fuera de Cobertura"
    let ok = count_status(scans, ScanStatus::Ok);
    let sobrantes = count_status(scans, ScanStatus::Sobrante);
    let faltantes = pre_alertas
        .iter()
        .filter(|pa| {
            let t = pa.record.tracking_number.as_str();
            pr_map.contains_key(t) && !scanned.contains(t)
        })
        .count() as i64;
    let fuera = pre_alertas
        .iter()
        .filter(|pa| !pr_map.contains_key(pa.record.tracking_number.as_str()))
        .count() as i64;
    let previos = pre_ruteos
        .iter()
        .filter(|pr| !pa_map.contains_key(pr.record.codigo_pedido.as_str()))
        .count() as i64;
    let total = ok + faltantes + sobrantes + fuera + previos;

    let resumen = workbook.add_worksheet().set_name("Resumen")?;
    resumen.write_string_with_format(0, 0, "Métrica", &header_format)?;
    resumen.write_string_with_format(0, 1, "Cantidad", &header_format)?;
    resumen.write_string_with_format(0, 2, "Porcentaje", &header_format)?;

    let metrics: [(&str, i64); 6] = [
        ("Total Escaneados", scans.len() as i64),
        ("OK", ok),
        ("Faltantes", faltantes),
        ("Sobrantes", sobrantes),
        ("Fuera de Cobertura", fuera),
        ("Previos", previos),
    ];
    for (idx, (name, count)) in metrics.iter().enumerate() {
        let row = idx as u32 + 1;
        resumen.write_string(row, 0, *name)?;
        resumen.write_number(row, 1, *count as f64)?;
        resumen.write_string(row, 2, &percent_label(*count, total))?;
    }

    workbook.save_to_buffer()
}

fn count_status(scans: &[ScannedPackage], status: ScanStatus) -> i64 {
    scans.iter().filter(|s| s.status == status).count() as i64
}

fn percent_label(count: i64, total: i64) -> String {
    if total > 0 {
        format!("{:.2}%", (count as f64 / total as f64) * 100.0)
    } else {
        "0%".to_string()
    }
}

/// Stored route-plan dates are RFC3339; anything else is shown verbatim
fn render_date(value: &str) -> String {
    match time::parse_rfc3339(value) {
        Some(ts) => time::format_date_ar(ts),
        None => value.to_string(),
    }
}

#[allow(clippy::too_many_arguments)]
fn write_row(
    sheet: &mut Worksheet,
    row: u32,
    tracking: &str,
    estado: &str,
    fecha_escaneo: Option<&str>,
    escaneado_por: Option<&str>,
    pa: Option<&PreAlertaRecord>,
    pr: Option<&PreRuteoRecord>,
) -> Result<(), XlsxError> {
    sheet.write_string(row, 0, tracking)?;
    sheet.write_string(row, 1, estado)?;
    opt_string(sheet, row, 2, fecha_escaneo)?;
    opt_string(sheet, row, 3, escaneado_por)?;

    if let Some(pa) = pa {
        opt_string(sheet, row, 4, pa.buyer.as_deref())?;
        opt_string(sheet, row, 5, pa.buyer_city.as_deref())?;
        opt_string(sheet, row, 6, pa.buyer_address1.as_deref())?;
        opt_string(sheet, row, 7, pa.buyer_zip.as_deref())?;
        opt_number(sheet, row, 8, pa.weight)?;
        opt_number(sheet, row, 9, pa.value)?;
    }
    if let Some(pr) = pr {
        opt_string(sheet, row, 10, pr.razon_social.as_deref())?;
        opt_string(sheet, row, 11, pr.domicilio.as_deref())?;
        opt_string(sheet, row, 12, pr.chofer.as_deref())?;
        if let Some(fecha) = pr.fecha_reparto.as_deref() {
            sheet.write_string(row, 13, &render_date(fecha))?;
        }
        opt_number(sheet, row, 14, pr.peso_kg)?;
    }
    Ok(())
}

fn opt_string(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: Option<&str>,
) -> Result<(), XlsxError> {
    if let Some(value) = value {
        sheet.write_string(row, col, value)?;
    }
    Ok(())
}

fn opt_number(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: Option<f64>,
) -> Result<(), XlsxError> {
    if let Some(value) = value {
        sheet.write_number(row, col, value)?;
    }
    Ok(())
}
