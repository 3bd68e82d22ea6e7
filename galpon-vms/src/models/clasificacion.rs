//! Sorting (clasificación) file and per-package rows

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Outcome of a sorting scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClasificacionScanStatus {
    /// Tracking number found and marked scanned
    Clasificado,
    /// Tracking number was already scanned earlier
    YaEscaneado,
    /// Tracking number is not in the active sorting file
    NoEncontrado,
}

impl ClasificacionScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClasificacionScanStatus::Clasificado => "CLASIFICADO",
            ClasificacionScanStatus::YaEscaneado => "YA_ESCANEADO",
            ClasificacionScanStatus::NoEncontrado => "NO_ENCONTRADO",
        }
    }
}

/// An uploaded sorting file for a shipment
///
/// Uploading a new file for the same shipment replaces the previous one
/// together with all its package rows.
#[derive(Debug, Clone, Serialize)]
pub struct ClasificacionArchivo {
    pub id: Uuid,
    pub shipment_id: Uuid,
    pub provider_id: Uuid,
    pub total_rows: i64,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
    pub finalizado: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalizado_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalizado_por: Option<String>,
}

/// One package row within a sorting file
#[derive(Debug, Clone, Serialize)]
pub struct PaqueteClasificacion {
    pub id: Uuid,
    pub clasificacion_id: Uuid,
    pub tracking_number: String,
    pub vehiculo: String,
    pub orden_visita: String,
    /// Sequential position within the vehicle, used for export ordering
    pub orden_numerico: i64,
    pub escaneado: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escaneado_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escaneado_por: Option<String>,
}

/// Parsed row from a sorting spreadsheet before persistence
#[derive(Debug, Clone, PartialEq)]
pub struct ClasificacionRow {
    pub tracking_number: String,
    pub vehiculo: String,
    pub orden_visita: String,
    pub orden_numerico: i64,
}
