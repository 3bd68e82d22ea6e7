//! Shipment list, lifecycle, and report endpoints

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use galpon_common::Operator;
use serde::Serialize;
use uuid::Uuid;

use crate::db::shipments::ShipmentListRow;
use crate::error::{ApiError, ApiResult};
use crate::models::ClasificacionArchivo;
use crate::stats::GlobalScanStats;
use crate::{db, export, AppState};

/// Hours a shipment stays on the scanner's active list, settings override
const DEFAULT_ACTIVE_WINDOW_HOURS: i64 = 48;

/// GET /api/vms/shipments response
#[derive(Debug, Serialize)]
pub struct ShipmentListResponse {
    pub shipments: Vec<ShipmentListRow>,
    pub stats: GlobalScanStats,
}

/// GET /api/vms/shipments/{id}/clasificacion response
#[derive(Debug, Serialize)]
pub struct ShipmentClasificacionResponse {
    pub clasificacion: Option<ClasificacionArchivo>,
}

/// GET /api/vms/shipments
///
/// Provider-scoped shipment list, newest first, with corpus-wide scan totals.
pub async fn list_shipments(
    State(state): State<AppState>,
    operator: Operator,
) -> ApiResult<Json<ShipmentListResponse>> {
    let scope = operator.vms_scope()?;
    let shipments = db::shipments::list_shipments(&state.db, &scope).await?;
    let stats = db::scans::global_scan_stats(&state.db, scope.filter()).await?;

    Ok(Json(ShipmentListResponse { shipments, stats }))
}

/// GET /api/vms/shipments/active
///
/// Unfinished shipments of the operator's provider from the active window,
/// for station bootstrapping. Requires a provider-scoped operator.
pub async fn list_active_shipments(
    State(state): State<AppState>,
    operator: Operator,
) -> ApiResult<Json<Vec<ShipmentListRow>>> {
    let provider_id = operator
        .provider_id
        .ok_or(galpon_common::operator::IdentityError::NoProvider)?;

    let window_hours = galpon_common::db::get_setting(&state.db, "vms_active_window_hours")
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(DEFAULT_ACTIVE_WINDOW_HOURS);

    let shipments =
        db::shipments::list_active_shipments(&state.db, provider_id, window_hours).await?;
    Ok(Json(shipments))
}

/// DELETE /api/vms/shipments/{id}
///
/// Removes the shipment and everything hanging off it.
pub async fn delete_shipment(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let shipment = db::shipments::load_shipment(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Shipment not found: {id}")))?;
    operator.check_provider_access(shipment.provider_id)?;

    db::shipments::delete_shipment(&state.db, id).await?;
    tracing::info!(shipment_id = %id, operator = %operator.name, "Shipment deleted");

    Ok(Json(serde_json::json!({ "deleted": true, "shipment_id": id })))
}

/// GET /api/vms/shipments/{id}/clasificacion
///
/// Newest sorting file for the shipment, or null when none was uploaded.
pub async fn shipment_clasificacion(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ShipmentClasificacionResponse>> {
    let shipment = db::shipments::load_shipment(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Shipment not found: {id}")))?;
    operator.check_provider_access(shipment.provider_id)?;

    let clasificacion = db::clasificacion::latest_for_shipment(&state.db, id).await?;
    Ok(Json(ShipmentClasificacionResponse { clasificacion }))
}

/// GET /api/vms/shipments/{id}/report
///
/// Verification report workbook as an attachment download.
pub async fn shipment_report(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let shipment = db::shipments::load_shipment(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Shipment not found: {id}")))?;
    operator.check_provider_access(shipment.provider_id)?;

    let scans = db::scans::list_scans(&state.db, id).await?;
    let pre_alertas = db::records::list_pre_alerta(&state.db, id).await?;
    let pre_ruteos = db::records::list_pre_ruteo(&state.db, id).await?;

    let bytes = export::verification_workbook(&scans, &pre_alertas, &pre_ruteos)?;
    let filename = export::attachment_filename("verificacion", &shipment.shipment_date, id);

    tracing::info!(shipment_id = %id, rows = scans.len(), "Verification report generated");

    let headers = [
        (header::CONTENT_TYPE, export::XLSX_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];
    Ok((headers, bytes))
}

pub fn shipment_routes() -> Router<AppState> {
    Router::new()
        .route("/api/vms/shipments", get(list_shipments))
        .route("/api/vms/shipments/active", get(list_active_shipments))
        .route(
            "/api/vms/shipments/:id",
            axum::routing::delete(delete_shipment),
        )
        .route(
            "/api/vms/shipments/:id/clasificacion",
            get(shipment_clasificacion),
        )
        .route("/api/vms/shipments/:id/report", get(shipment_report))
}
