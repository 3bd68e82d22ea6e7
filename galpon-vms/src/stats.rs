//! Statistics over verification scans and sorting progress
//!
//! Counts are always recomputed from storage rather than cached; this module
//! only shapes raw counters into response payloads.

use serde::Serialize;

/// Integer percentage, rounded to nearest, 0 when the denominator is empty
pub fn percent_rounded(part: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as i64
}

/// Percentage with fractional precision, 0.0 when the denominator is empty
pub fn percent(part: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (part as f64 / total as f64) * 100.0
}

/// Verification progress for one shipment
///
/// `expected` is the pre-alerta row count; `faltante` counts pre-alerta rows
/// never scanned. The four outcome counters partition `total_scanned`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct VerificationStats {
    pub expected: i64,
    pub total_scanned: i64,
    pub ok: i64,
    pub sobrante: i64,
    pub fuera_cobertura: i64,
    pub previo: i64,
    pub faltante: i64,
}

impl VerificationStats {
    /// Packages with any discrepancy outcome
    pub fn issues(&self) -> i64 {
        self.sobrante + self.fuera_cobertura + self.previo
    }
}

/// Overall sorting progress for one clasificación
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ClasificacionStats {
    pub total: i64,
    pub escaneados: i64,
    pub pendientes: i64,
    pub porcentaje: i64,
}

impl ClasificacionStats {
    pub fn from_counts(total: i64, escaneados: i64) -> Self {
        Self {
            total,
            escaneados,
            pendientes: total - escaneados,
            porcentaje: percent_rounded(escaneados, total),
        }
    }
}

/// Per-vehicle sorting progress row
#[derive(Debug, Clone, Serialize)]
pub struct VehicleProgress {
    pub vehiculo: String,
    pub total: i64,
    pub escaneados: i64,
    pub pendientes: i64,
    pub porcentaje: i64,
}

impl VehicleProgress {
    pub fn from_counts(vehiculo: String, total: i64, escaneados: i64) -> Self {
        Self {
            vehiculo,
            total,
            escaneados,
            pendientes: total - escaneados,
            porcentaje: percent_rounded(escaneados, total),
        }
    }
}

/// Corpus-wide scan totals shown on the shipment list
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct GlobalScanStats {
    pub total_packages: i64,
    pub ok_packages: i64,
    pub issues_packages: i64,
}
