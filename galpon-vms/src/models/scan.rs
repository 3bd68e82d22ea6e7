//! Scan outcome types for verification and sorting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Verification scan outcome
///
/// Derived from membership of the tracking number in the two loaded
/// spreadsheets, see [`crate::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanStatus {
    /// Present in both pre-alerta and pre-ruteo
    Ok,
    /// Present in neither sheet
    Sobrante,
    /// Only in pre-alerta: manifested but not routed
    FueraCobertura,
    /// Only in pre-ruteo: routed from an earlier manifest
    Previo,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Ok => "OK",
            ScanStatus::Sobrante => "SOBRANTE",
            ScanStatus::FueraCobertura => "FUERA_COBERTURA",
            ScanStatus::Previo => "PREVIO",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OK" => Some(ScanStatus::Ok),
            "SOBRANTE" => Some(ScanStatus::Sobrante),
            "FUERA_COBERTURA" => Some(ScanStatus::FueraCobertura),
            "PREVIO" => Some(ScanStatus::Previo),
            _ => None,
        }
    }
}

/// Persisted verification scan
#[derive(Debug, Clone, Serialize)]
pub struct ScannedPackage {
    pub id: Uuid,
    pub shipment_id: Uuid,
    pub tracking_number: String,
    pub status: ScanStatus,
    pub scanned_at: DateTime<Utc>,
    pub scanned_by: String,
}

/// Result returned to the scanning station
///
/// `already_scanned` is true when the tracking number had been scanned
/// before on this shipment; in that case `status` and `scanned_at` describe
/// the original scan, not this attempt.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub tracking_number: String,
    pub status: ScanStatus,
    pub already_scanned: bool,
    pub scanned_at: DateTime<Utc>,
}
