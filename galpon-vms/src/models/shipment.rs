//! Shipment (lote) lifecycle state machine
//!
//! A shipment progresses through 4 defined states:
//! PRE_ALERTA → PRE_RUTEO → VERIFICACION → FINALIZADO

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shipment lifecycle state
///
/// Each state is entered by exactly one action: PRE_ALERTA by the pre-alerta
/// upload that creates the shipment, PRE_RUTEO by the pre-ruteo upload,
/// VERIFICACION by the first verification scan, FINALIZADO by the explicit
/// finalize call. FINALIZADO is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    /// Pre-alerta manifest loaded, awaiting route plan
    PreAlerta,
    /// Pre-ruteo plan loaded, awaiting first scan
    PreRuteo,
    /// Physical verification in progress
    Verificacion,
    /// Closed; no further scans or uploads accepted
    Finalizado,
}

impl ShipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::PreAlerta => "PRE_ALERTA",
            ShipmentStatus::PreRuteo => "PRE_RUTEO",
            ShipmentStatus::Verificacion => "VERIFICACION",
            ShipmentStatus::Finalizado => "FINALIZADO",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PRE_ALERTA" => Some(ShipmentStatus::PreAlerta),
            "PRE_RUTEO" => Some(ShipmentStatus::PreRuteo),
            "VERIFICACION" => Some(ShipmentStatus::Verificacion),
            "FINALIZADO" => Some(ShipmentStatus::Finalizado),
            _ => None,
        }
    }

    /// Whether moving from `self` to `next` is a legal forward step
    pub fn can_transition_to(&self, next: ShipmentStatus) -> bool {
        matches!(
            (self, next),
            (ShipmentStatus::PreAlerta, ShipmentStatus::PreRuteo)
                | (ShipmentStatus::PreRuteo, ShipmentStatus::Verificacion)
                | (ShipmentStatus::Verificacion, ShipmentStatus::Finalizado)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ShipmentStatus::Finalizado)
    }
}

/// Shipment row as stored
#[derive(Debug, Clone, Serialize)]
pub struct Shipment {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub shipment_date: String,
    pub status: ShipmentStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<DateTime<Utc>>,
}

impl Shipment {
    pub fn is_finalized(&self) -> bool {
        self.status.is_terminal()
    }
}
