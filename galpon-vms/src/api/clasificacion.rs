//! Sorting (clasificación) endpoints

use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use galpon_common::Operator;
use serde::Serialize;
use uuid::Uuid;

use crate::classify;
use crate::db::clasificacion::ClasificacionListRow;
use crate::error::{ApiError, ApiResult};
use crate::ingest;
use crate::models::{ClasificacionArchivo, ClasificacionScanStatus, PaqueteClasificacion};
use crate::stats::{ClasificacionStats, VehicleProgress};
use crate::{db, export, AppState};

/// POST /api/vms/clasificacion/upload response
#[derive(Debug, Serialize)]
pub struct ClasificacionUploadResponse {
    pub clasificacion_id: Uuid,
    pub total_rows: usize,
    pub total_vehiculos: usize,
    pub paquetes_por_vehiculo: Vec<VehiculoCount>,
    pub skipped_invalid: usize,
    pub skipped_not_ok: usize,
}

#[derive(Debug, Serialize)]
pub struct VehiculoCount {
    pub vehiculo: String,
    pub paquetes: usize,
}

/// POST /api/vms/clasificacion/scan request
#[derive(Debug, serde::Deserialize)]
pub struct ClasificacionScanRequest {
    pub clasificacion_id: Uuid,
    pub tracking_number: String,
}

/// POST /api/vms/clasificacion/scan response
#[derive(Debug, Serialize)]
pub struct ClasificacionScanResponse {
    pub status: ClasificacionScanStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paquete: Option<PaqueteClasificacion>,
}

/// GET /api/vms/clasificacion/{id}/stats response
#[derive(Debug, Serialize)]
pub struct ClasificacionStatsResponse {
    pub clasificacion_id: Uuid,
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
    pub uploaded_by: String,
    pub stats: ClasificacionStats,
    pub vehiculos: Vec<VehicleProgress>,
    pub total_vehiculos: usize,
}

/// POST /api/vms/clasificacion/{id}/finalize response
#[derive(Debug, Serialize)]
pub struct ClasificacionFinalizeResponse {
    pub clasificacion_id: Uuid,
    pub finalizado: bool,
    pub stats: ClasificacionStats,
}

/// GET /api/vms/clasificaciones response
#[derive(Debug, Serialize)]
pub struct ClasificacionListResponse {
    pub clasificaciones: Vec<ClasificacionListRow>,
    pub total: usize,
}

/// POST /api/vms/clasificacion/upload
///
/// Multipart fields: `file` (.xlsx), `shipment_id`. Only packages scanned OK
/// during verification survive into the sorting file; a re-upload replaces
/// the previous clasificación entirely.
pub async fn upload_clasificacion(
    State(state): State<AppState>,
    operator: Operator,
    mut multipart: Multipart,
) -> ApiResult<Json<ClasificacionUploadResponse>> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut shipment_id: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => file_bytes = Some(field.bytes().await?.to_vec()),
            "shipment_id" => shipment_id = Some(field.text().await?),
            _ => {}
        }
    }

    let file_bytes =
        file_bytes.ok_or_else(|| ApiError::BadRequest("Missing file field".to_string()))?;
    let shipment_id = shipment_id
        .ok_or_else(|| ApiError::BadRequest("Missing shipment_id field".to_string()))?;
    let shipment_id = Uuid::parse_str(shipment_id.trim())
        .map_err(|_| ApiError::BadRequest(format!("Invalid shipment_id: {shipment_id}")))?;

    let shipment = db::shipments::load_shipment(&state.db, shipment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Shipment not found: {shipment_id}")))?;
    operator.check_provider_access(shipment.provider_id)?;

    if !shipment.is_finalized() {
        return Err(ApiError::BadRequest(format!(
            "Clasificación requires a FINALIZADO shipment, found {}",
            shipment.status.as_str()
        )));
    }

    let ok_trackings = db::scans::ok_tracking_set(&state.db, shipment_id).await?;
    let parsed = ingest::parse_clasificacion(&file_bytes, &ok_trackings)?;

    if parsed.rows.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "No usable rows: {} invalid, {} not scanned OK",
            parsed.skipped_invalid, parsed.skipped_not_ok
        )));
    }

    let archivo = db::clasificacion::replace_clasificacion(
        &state.db,
        shipment_id,
        shipment.provider_id,
        &operator.name,
        &parsed.rows,
    )
    .await?;

    let paquetes_por_vehiculo: Vec<VehiculoCount> = parsed
        .vehicle_counts()
        .into_iter()
        .map(|(vehiculo, paquetes)| VehiculoCount { vehiculo, paquetes })
        .collect();

    tracing::info!(
        clasificacion_id = %archivo.id,
        shipment_id = %shipment_id,
        rows = parsed.rows.len(),
        vehicles = paquetes_por_vehiculo.len(),
        skipped_invalid = parsed.skipped_invalid,
        skipped_not_ok = parsed.skipped_not_ok,
        "Clasificación uploaded"
    );

    Ok(Json(ClasificacionUploadResponse {
        clasificacion_id: archivo.id,
        total_rows: parsed.rows.len(),
        total_vehiculos: paquetes_por_vehiculo.len(),
        paquetes_por_vehiculo,
        skipped_invalid: parsed.skipped_invalid,
        skipped_not_ok: parsed.skipped_not_ok,
    }))
}

/// POST /api/vms/clasificacion/scan
///
/// Marks one package as sorted. The three outcomes are data, not errors:
/// CLASIFICADO, YA_ESCANEADO (with the original scan), NO_ENCONTRADO.
pub async fn scan_clasificacion(
    State(state): State<AppState>,
    operator: Operator,
    Json(request): Json<ClasificacionScanRequest>,
) -> ApiResult<Json<ClasificacionScanResponse>> {
    let archivo = load_scoped(&state, &operator, request.clasificacion_id).await?;

    if archivo.finalizado {
        return Err(ApiError::Conflict(
            "Clasificación is finalized and no longer accepts scans".to_string(),
        ));
    }

    let tracking = classify::normalize_scan(&request.tracking_number);
    if tracking.is_empty() {
        return Err(ApiError::BadRequest("tracking_number must not be empty".to_string()));
    }

    let paquete = match db::clasificacion::find_paquete(&state.db, archivo.id, tracking).await? {
        Some(paquete) => paquete,
        None => {
            return Ok(Json(ClasificacionScanResponse {
                status: ClasificacionScanStatus::NoEncontrado,
                message: "Package is not in this clasificación".to_string(),
                paquete: None,
            }))
        }
    };

    if paquete.escaneado {
        return Ok(Json(ClasificacionScanResponse {
            status: ClasificacionScanStatus::YaEscaneado,
            message: "Package was already sorted".to_string(),
            paquete: Some(paquete),
        }));
    }

    let marked =
        db::clasificacion::mark_paquete_escaneado(&state.db, paquete.id, &operator.name).await?;
    let refreshed = db::clasificacion::find_paquete(&state.db, archivo.id, tracking)
        .await?
        .ok_or_else(|| ApiError::Internal("Package vanished mid-scan".to_string()))?;

    if !marked {
        // Lost the race to another station
        return Ok(Json(ClasificacionScanResponse {
            status: ClasificacionScanStatus::YaEscaneado,
            message: "Package was already sorted".to_string(),
            paquete: Some(refreshed),
        }));
    }

    tracing::debug!(
        clasificacion_id = %archivo.id,
        tracking = %refreshed.tracking_number,
        vehiculo = %refreshed.vehiculo,
        "Package sorted"
    );

    Ok(Json(ClasificacionScanResponse {
        status: ClasificacionScanStatus::Clasificado,
        message: format!("Assign to {}", refreshed.vehiculo),
        paquete: Some(refreshed),
    }))
}

/// GET /api/vms/clasificacion/{id}/stats
pub async fn clasificacion_stats(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ClasificacionStatsResponse>> {
    let archivo = load_scoped(&state, &operator, id).await?;

    let stats = db::clasificacion::clasificacion_stats(&state.db, id).await?;
    let vehiculos = db::clasificacion::vehicle_progress(&state.db, id).await?;

    Ok(Json(ClasificacionStatsResponse {
        clasificacion_id: archivo.id,
        uploaded_at: archivo.uploaded_at,
        uploaded_by: archivo.uploaded_by,
        stats,
        total_vehiculos: vehiculos.len(),
        vehiculos,
    }))
}

/// GET /api/vms/clasificacion/{id}/paquetes
pub async fn clasificacion_paquetes(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    load_scoped(&state, &operator, id).await?;

    let paquetes = db::clasificacion::list_paquetes(&state.db, id).await?;
    Ok(Json(serde_json::json!({ "paquetes": paquetes })))
}

/// POST /api/vms/clasificacion/{id}/finalize
pub async fn finalize_clasificacion(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ClasificacionFinalizeResponse>> {
    let archivo = load_scoped(&state, &operator, id).await?;

    if archivo.finalizado {
        return Err(ApiError::Conflict("Clasificación is already finalized".to_string()));
    }
    if !db::clasificacion::finalize_clasificacion(&state.db, id, &operator.name).await? {
        return Err(ApiError::Conflict("Clasificación is already finalized".to_string()));
    }

    let stats = db::clasificacion::clasificacion_stats(&state.db, id).await?;
    tracing::info!(
        clasificacion_id = %id,
        operator = %operator.name,
        escaneados = stats.escaneados,
        pendientes = stats.pendientes,
        "Clasificación finalized"
    );

    Ok(Json(ClasificacionFinalizeResponse {
        clasificacion_id: id,
        finalizado: true,
        stats,
    }))
}

/// GET /api/vms/clasificacion/{id}/export
///
/// Sorting progress workbook as an attachment download.
pub async fn export_clasificacion(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let archivo = load_scoped(&state, &operator, id).await?;

    let shipment = db::shipments::load_shipment(&state.db, archivo.shipment_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("Shipment not found: {}", archivo.shipment_id))
        })?;

    let paquetes = db::clasificacion::list_paquetes(&state.db, id).await?;
    let progress = db::clasificacion::vehicle_progress(&state.db, id).await?;

    let bytes = export::clasificacion_workbook(&paquetes, &progress)?;
    let filename = export::attachment_filename("clasificacion", &shipment.shipment_date, id);

    let headers = [
        (header::CONTENT_TYPE, export::XLSX_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];
    Ok((headers, bytes))
}

/// GET /api/vms/clasificaciones
///
/// Every clasificación visible to the caller with shipment and provider
/// context, most recently updated first.
pub async fn list_clasificaciones(
    State(state): State<AppState>,
    operator: Operator,
) -> ApiResult<Json<ClasificacionListResponse>> {
    let scope = operator.vms_scope()?;
    let clasificaciones =
        db::clasificacion::list_clasificaciones(&state.db, scope.filter()).await?;
    let total = clasificaciones.len();

    Ok(Json(ClasificacionListResponse {
        clasificaciones,
        total,
    }))
}

async fn load_scoped(
    state: &AppState,
    operator: &Operator,
    id: Uuid,
) -> ApiResult<ClasificacionArchivo> {
    let archivo = db::clasificacion::load_clasificacion(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Clasificación not found: {id}")))?;
    operator.check_provider_access(archivo.provider_id)?;
    Ok(archivo)
}

pub fn clasificacion_routes() -> Router<AppState> {
    Router::new()
        .route("/api/vms/clasificacion/upload", post(upload_clasificacion))
        .route("/api/vms/clasificacion/scan", post(scan_clasificacion))
        .route("/api/vms/clasificacion/:id/stats", get(clasificacion_stats))
        .route(
            "/api/vms/clasificacion/:id/paquetes",
            get(clasificacion_paquetes),
        )
        .route(
            "/api/vms/clasificacion/:id/finalize",
            post(finalize_clasificacion),
        )
        .route(
            "/api/vms/clasificacion/:id/export",
            get(export_clasificacion),
        )
        .route("/api/vms/clasificaciones", get(list_clasificaciones))
}
