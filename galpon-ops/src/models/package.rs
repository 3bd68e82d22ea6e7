//! Package tracking through the warehouse
//!
//! A package carries its current provider, location, and status; every
//! status change also appends an immutable row to the movement history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Package lifecycle status
///
/// ENTREGADO is terminal: delivered packages reject further deliver and
/// transfer calls. The other three count as physically present for the
/// location contents check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackageStatus {
    Ingresado,
    Almacenado,
    EnTraspaso,
    Entregado,
}

impl PackageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageStatus::Ingresado => "INGRESADO",
            PackageStatus::Almacenado => "ALMACENADO",
            PackageStatus::EnTraspaso => "EN_TRASPASO",
            PackageStatus::Entregado => "ENTREGADO",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INGRESADO" => Some(PackageStatus::Ingresado),
            "ALMACENADO" => Some(PackageStatus::Almacenado),
            "EN_TRASPASO" => Some(PackageStatus::EnTraspaso),
            "ENTREGADO" => Some(PackageStatus::Entregado),
            _ => None,
        }
    }

    /// Whether the package still occupies warehouse space
    pub fn is_active(&self) -> bool {
        !matches!(self, PackageStatus::Entregado)
    }
}

/// Movement history action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementAction {
    Ingreso,
    Traspaso,
    Salida,
}

impl MovementAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementAction::Ingreso => "INGRESO",
            MovementAction::Traspaso => "TRASPASO",
            MovementAction::Salida => "SALIDA",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INGRESO" => Some(MovementAction::Ingreso),
            "TRASPASO" => Some(MovementAction::Traspaso),
            "SALIDA" => Some(MovementAction::Salida),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Package {
    pub id: Uuid,
    pub tracking_number: String,
    pub current_provider_id: Option<Uuid>,
    pub current_location_id: Option<Uuid>,
    pub status: PackageStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Package joined with its current provider and location names
#[derive(Debug, Clone, Serialize)]
pub struct PackageDetail {
    #[serde(flatten)]
    pub package: Package,
    pub provider_name: Option<String>,
    pub warehouse_name: Option<String>,
    pub location_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackageMovement {
    pub id: Uuid,
    pub package_id: Uuid,
    pub action: MovementAction,
    pub from_provider_id: Option<Uuid>,
    pub to_provider_id: Option<Uuid>,
    pub from_location_id: Option<Uuid>,
    pub to_location_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Movement with endpoint names resolved, newest first in detail views
#[derive(Debug, Clone, Serialize)]
pub struct MovementDetail {
    #[serde(flatten)]
    pub movement: PackageMovement,
    pub from_provider_name: Option<String>,
    pub to_provider_name: Option<String>,
    pub from_location_name: Option<String>,
    pub to_location_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entregado_is_not_active() {
        assert!(PackageStatus::Ingresado.is_active());
        assert!(PackageStatus::Almacenado.is_active());
        assert!(PackageStatus::EnTraspaso.is_active());
        assert!(!PackageStatus::Entregado.is_active());
    }

    #[test]
    fn test_status_round_trip_through_str() {
        for status in [
            PackageStatus::Ingresado,
            PackageStatus::Almacenado,
            PackageStatus::EnTraspaso,
            PackageStatus::Entregado,
        ] {
            assert_eq!(PackageStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PackageStatus::parse("PERDIDO"), None);
    }

    #[test]
    fn test_action_round_trip_through_str() {
        for action in [
            MovementAction::Ingreso,
            MovementAction::Traspaso,
            MovementAction::Salida,
        ] {
            assert_eq!(MovementAction::parse(action.as_str()), Some(action));
        }
        assert_eq!(MovementAction::parse("DEVOLUCION"), None);
    }

    #[test]
    fn test_serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&PackageStatus::EnTraspaso).unwrap();
        assert_eq!(json, "\"EN_TRASPASO\"");
        let back: PackageStatus = serde_json::from_str("\"ALMACENADO\"").unwrap();
        assert_eq!(back, PackageStatus::Almacenado);
    }
}
