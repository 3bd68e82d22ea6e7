//! Reexpedición (reforwarding) movements and their scanned labels
//!
//! An INGRESO movement owns a batch of etiquetas scanned into a location.
//! EGRESO movements consume etiquetas from one origin INGRESO; as labels
//! leave, the origin's estado degrades ACTIVO -> EGRESADO_PARCIAL ->
//! EGRESADO_TOTAL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TipoMovimiento {
    Ingreso,
    Egreso,
}

impl TipoMovimiento {
    pub fn as_str(&self) -> &'static str {
        match self {
            TipoMovimiento::Ingreso => "INGRESO",
            TipoMovimiento::Egreso => "EGRESO",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INGRESO" => Some(TipoMovimiento::Ingreso),
            "EGRESO" => Some(TipoMovimiento::Egreso),
            _ => None,
        }
    }
}

/// Why freight entered the reexpedición area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubtipoIngreso {
    Retornos,
    PendienteRetiro,
    Pickup,
    InsumosWh,
}

impl SubtipoIngreso {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubtipoIngreso::Retornos => "RETORNOS",
            SubtipoIngreso::PendienteRetiro => "PENDIENTE_RETIRO",
            SubtipoIngreso::Pickup => "PICKUP",
            SubtipoIngreso::InsumosWh => "INSUMOS_WH",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RETORNOS" => Some(SubtipoIngreso::Retornos),
            "PENDIENTE_RETIRO" => Some(SubtipoIngreso::PendienteRetiro),
            "PICKUP" => Some(SubtipoIngreso::Pickup),
            "INSUMOS_WH" => Some(SubtipoIngreso::InsumosWh),
            _ => None,
        }
    }

    /// Display form used in notification messages
    pub fn human_label(&self) -> &'static str {
        match self {
            SubtipoIngreso::Retornos => "Retornos",
            SubtipoIngreso::PendienteRetiro => "Pendiente de Retiro",
            SubtipoIngreso::Pickup => "Pickup",
            SubtipoIngreso::InsumosWh => "Insumos WH",
        }
    }
}

/// How freight left the reexpedición area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubtipoEgreso {
    EntregaParcial,
    EntregaTotal,
}

impl SubtipoEgreso {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubtipoEgreso::EntregaParcial => "ENTREGA_PARCIAL",
            SubtipoEgreso::EntregaTotal => "ENTREGA_TOTAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ENTREGA_PARCIAL" => Some(SubtipoEgreso::EntregaParcial),
            "ENTREGA_TOTAL" => Some(SubtipoEgreso::EntregaTotal),
            _ => None,
        }
    }

    /// Display form used in notification messages
    pub fn human_label(&self) -> &'static str {
        match self {
            SubtipoEgreso::EntregaParcial => "Entrega Parcial",
            SubtipoEgreso::EntregaTotal => "Entrega Total",
        }
    }
}

/// How much of an INGRESO batch has left the warehouse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EstadoMovimiento {
    Activo,
    EgresadoParcial,
    EgresadoTotal,
}

impl EstadoMovimiento {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoMovimiento::Activo => "ACTIVO",
            EstadoMovimiento::EgresadoParcial => "EGRESADO_PARCIAL",
            EstadoMovimiento::EgresadoTotal => "EGRESADO_TOTAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVO" => Some(EstadoMovimiento::Activo),
            "EGRESADO_PARCIAL" => Some(EstadoMovimiento::EgresadoParcial),
            "EGRESADO_TOTAL" => Some(EstadoMovimiento::EgresadoTotal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EstadoEtiqueta {
    Activo,
    EgresadoTotal,
}

impl EstadoEtiqueta {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoEtiqueta::Activo => "ACTIVO",
            EstadoEtiqueta::EgresadoTotal => "EGRESADO_TOTAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVO" => Some(EstadoEtiqueta::Activo),
            "EGRESADO_TOTAL" => Some(EstadoEtiqueta::EgresadoTotal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Movimiento {
    pub id: Uuid,
    pub tipo: TipoMovimiento,
    pub subtipo_ingreso: Option<SubtipoIngreso>,
    pub subtipo_egreso: Option<SubtipoEgreso>,
    pub warehouse_id: Uuid,
    pub location_id: Uuid,
    pub cantidad: i64,
    pub cantidad_egresada: i64,
    pub estado: EstadoMovimiento,
    pub notas: Option<String>,
    pub movimiento_origen_id: Option<Uuid>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Movement with location names and its etiquetas, the API response shape
#[derive(Debug, Clone, Serialize)]
pub struct MovimientoDetail {
    #[serde(flatten)]
    pub movimiento: Movimiento,
    pub warehouse_name: String,
    pub location_name: String,
    pub etiquetas: Vec<Etiqueta>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Etiqueta {
    pub id: Uuid,
    pub movimiento_id: Uuid,
    pub tracking_number: String,
    pub estado: EstadoEtiqueta,
    pub escaneado_at: DateTime<Utc>,
    pub egresado_at: Option<DateTime<Utc>>,
}
