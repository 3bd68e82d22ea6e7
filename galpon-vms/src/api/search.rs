//! Tracking number lookup across clasificaciones

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use galpon_common::Operator;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::{db, AppState};

#[derive(Debug, Deserialize)]
pub struct TrackingQuery {
    pub tracking: String,
}

/// GET /api/vms/search-tracking response
///
/// `found: false` is a successful answer, not an error. When found, the hit
/// is broken out into shipment, vehicle assignment, and sorting-scan facets.
#[derive(Debug, Serialize)]
pub struct TrackingSearchResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lote: Option<LoteInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transporte: Option<TransporteInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proveedor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clasificacion: Option<ClasificacionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escaneo: Option<EscaneoInfo>,
}

#[derive(Debug, Serialize)]
pub struct LoteInfo {
    pub id: Uuid,
    pub fecha: String,
    pub fecha_formateada: String,
}

#[derive(Debug, Serialize)]
pub struct TransporteInfo {
    pub vehiculo: String,
    pub orden: i64,
    pub orden_visita: String,
}

#[derive(Debug, Serialize)]
pub struct ClasificacionInfo {
    pub id: Uuid,
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
    pub finalizado: bool,
}

#[derive(Debug, Serialize)]
pub struct EscaneoInfo {
    pub escaneado: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escaneado_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escaneado_por: Option<String>,
}

/// GET /api/vms/search-tracking?tracking=...
///
/// Finds which vehicle a package was assigned to. Matching is
/// case-insensitive and searches the newest clasificación first.
pub async fn search_tracking(
    State(state): State<AppState>,
    operator: Operator,
    Query(query): Query<TrackingQuery>,
) -> ApiResult<Json<TrackingSearchResponse>> {
    let tracking = query.tracking.trim();
    if tracking.is_empty() {
        return Err(ApiError::BadRequest("tracking must not be empty".to_string()));
    }

    let scope = operator.vms_scope()?;
    let hit = db::clasificacion::search_by_tracking(&state.db, tracking, scope.filter()).await?;

    let Some(hit) = hit else {
        return Ok(Json(TrackingSearchResponse {
            found: false,
            message: Some(format!("Tracking {tracking} is not in any clasificación")),
            tracking_number: None,
            lote: None,
            transporte: None,
            proveedor: None,
            clasificacion: None,
            escaneo: None,
        }));
    };

    let fecha_formateada = NaiveDate::parse_from_str(&hit.shipment_date, "%Y-%m-%d")
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|_| hit.shipment_date.clone());

    Ok(Json(TrackingSearchResponse {
        found: true,
        message: None,
        tracking_number: Some(hit.paquete.tracking_number.clone()),
        lote: Some(LoteInfo {
            id: hit.archivo.shipment_id,
            fecha: hit.shipment_date.clone(),
            fecha_formateada,
        }),
        transporte: Some(TransporteInfo {
            vehiculo: hit.paquete.vehiculo.clone(),
            orden: hit.paquete.orden_numerico,
            orden_visita: hit.paquete.orden_visita.clone(),
        }),
        proveedor: Some(hit.provider_name.clone()),
        clasificacion: Some(ClasificacionInfo {
            id: hit.archivo.id,
            uploaded_at: hit.archivo.uploaded_at,
            finalizado: hit.archivo.finalizado,
        }),
        escaneo: Some(EscaneoInfo {
            escaneado: hit.paquete.escaneado,
            escaneado_at: hit.paquete.escaneado_at,
            escaneado_por: hit.paquete.escaneado_por.clone(),
        }),
    }))
}

pub fn search_routes() -> Router<AppState> {
    Router::new().route("/api/vms/search-tracking", get(search_tracking))
}
