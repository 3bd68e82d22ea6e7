//! Sorting progress workbook
//!
//! "Clasificación" lists every package in delivery order (vehicle, then stop
//! number); "Resumen" shows per-vehicle progress.

use rust_xlsxwriter::{Format, Workbook, XlsxError};

use galpon_common::time;

use crate::models::PaqueteClasificacion;
use crate::stats::VehicleProgress;

const PAQUETE_HEADERS: [(&str, f64); 7] = [
    ("Vehículo", 15.0),
    ("Orden", 8.0),
    ("Orden Visita", 12.0),
    ("Tracking Number", 20.0),
    ("Escaneado", 10.0),
    ("Fecha Escaneo", 20.0),
    ("Escaneado Por", 25.0),
];

const RESUMEN_HEADERS: [(&str, f64); 5] = [
    ("Vehículo", 15.0),
    ("Total Paquetes", 15.0),
    ("Escaneados", 12.0),
    ("Pendientes", 12.0),
    ("Progreso %", 12.0),
];

/// `paquetes` must already be in delivery order, `progress` ordered by vehicle
pub fn clasificacion_workbook(
    paquetes: &[PaqueteClasificacion],
    progress: &[VehicleProgress],
) -> Result<Vec<u8>, XlsxError> {
    let header_format = Format::new().set_bold();

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet().set_name("Clasificación")?;
    for (col, (header, width)) in PAQUETE_HEADERS.iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *header, &header_format)?;
        sheet.set_column_width(col, *width)?;
    }

    for (idx, paquete) in paquetes.iter().enumerate() {
        let row = idx as u32 + 1;
        sheet.write_string(row, 0, &paquete.vehiculo)?;
        sheet.write_number(row, 1, paquete.orden_numerico as f64)?;
        sheet.write_string(row, 2, &paquete.orden_visita)?;
        sheet.write_string(row, 3, &paquete.tracking_number)?;
        sheet.write_string(row, 4, if paquete.escaneado { "SÍ" } else { "NO" })?;
        if let Some(ts) = paquete.escaneado_at {
            sheet.write_string(row, 5, &time::format_datetime_ar(ts))?;
        }
        if let Some(por) = paquete.escaneado_por.as_deref() {
            sheet.write_string(row, 6, por)?;
        }
    }

    let resumen = workbook.add_worksheet().set_name("Resumen")?;
    for (col, (header, width)) in RESUMEN_HEADERS.iter().enumerate() {
        let col = col as u16;
        resumen.write_string_with_format(0, col, *header, &header_format)?;
        resumen.set_column_width(col, *width)?;
    }

    for (idx, vehicle) in progress.iter().enumerate() {
        let row = idx as u32 + 1;
        resumen.write_string(row, 0, &vehicle.vehiculo)?;
        resumen.write_number(row, 1, vehicle.total as f64)?;
        resumen.write_number(row, 2, vehicle.escaneados as f64)?;
        resumen.write_number(row, 3, vehicle.pendientes as f64)?;
        resumen.write_number(row, 4, vehicle.porcentaje as f64)?;
    }

    workbook.save_to_buffer()
}
