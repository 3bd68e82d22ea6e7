//! Pre-ruteo route plan upload and listing

use axum::{
    extract::{Multipart, Query, State},
    routing::{get, post},
    Json, Router,
};
use galpon_common::Operator;
use serde::Serialize;
use uuid::Uuid;

use super::pre_alerta::RecordListQuery;
use crate::db::records::StoredPreRuteo;
use crate::db::shipments::TransitionOutcome;
use crate::error::{ApiError, ApiResult};
use crate::ingest;
use crate::models::ShipmentStatus;
use crate::{db, AppState};

/// POST /api/vms/pre-ruteo/upload response
#[derive(Debug, Serialize)]
pub struct PreRuteoUploadResponse {
    pub shipment_id: Uuid,
    pub status: ShipmentStatus,
    pub inserted: u64,
    pub skipped: usize,
}

/// POST /api/vms/pre-ruteo/upload
///
/// Multipart fields: `file` (.xlsx), `shipment_id`. The shipment must still
/// be in PRE_ALERTA; a successful upload moves it to PRE_RUTEO.
pub async fn upload_pre_ruteo(
    State(state): State<AppState>,
    operator: Operator,
    mut multipart: Multipart,
) -> ApiResult<Json<PreRuteoUploadResponse>> {
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

    if shipment.status != ShipmentStatus::PreAlerta {
        return Err(ApiError::Conflict(format!(
            "Pre-ruteo requires a PRE_ALERTA shipment, found {}",
            shipment.status.as_str()
        )));
    }

    let parsed = ingest::parse_pre_ruteo(&file_bytes)?;

    let inserted =
        db::records::insert_pre_ruteo_records(&state.db, shipment_id, &parsed.records).await?;

    match db::shipments::transition_shipment(&state.db, shipment_id, ShipmentStatus::PreRuteo)
        .await?
    {
        TransitionOutcome::Applied => {}
        TransitionOutcome::NotFound => {
            return Err(ApiError::NotFound(format!("Shipment not found: {shipment_id}")))
        }
        TransitionOutcome::Illegal { from } => {
            return Err(ApiError::Conflict(format!(
                "Cannot move shipment from {} to PRE_RUTEO",
                from.as_str()
            )))
        }
    }

    tracing::info!(
        shipment_id = %shipment_id,
        inserted,
        skipped = parsed.skipped,
        "Pre-ruteo uploaded"
    );

    Ok(Json(PreRuteoUploadResponse {
        shipment_id,
        status: ShipmentStatus::PreRuteo,
        inserted,
        skipped: parsed.skipped,
    }))
}

/// GET /api/vms/pre-ruteo?shipment_id=
pub async fn list_pre_ruteo(
    State(state): State<AppState>,
    operator: Operator,
    Query(query): Query<RecordListQuery>,
) -> ApiResult<Json<Vec<StoredPreRuteo>>> {
    let shipment = db::shipments::load_shipment(&state.db, query.shipment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Shipment not found: {}", query.shipment_id)))?;
    operator.check_provider_access(shipment.provider_id)?;

    let records = db::records::list_pre_ruteo(&state.db, query.shipment_id).await?;
    Ok(Json(records))
}

pub fn pre_ruteo_routes() -> Router<AppState> {
    Router::new()
        .route("/api/vms/pre-ruteo/upload", post(upload_pre_ruteo))
        .route("/api/vms/pre-ruteo", get(list_pre_ruteo))
}
