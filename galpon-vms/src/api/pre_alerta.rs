//! Pre-alerta manifest upload and listing

use axum::{
    extract::{Multipart, Query, State},
    routing::{get, post},
    Json, Router,
};
use galpon_common::Operator;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::records::StoredPreAlerta;
use crate::error::{ApiError, ApiResult};
use crate::ingest;
use crate::models::ShipmentStatus;
use crate::{db, AppState};

/// POST /api/vms/pre-alerta/upload response
#[derive(Debug, Serialize)]
pub struct PreAlertaUploadResponse {
    pub shipment_id: Uuid,
    pub status: ShipmentStatus,
    pub inserted: u64,
    pub skipped: usize,
}

#[derive(Debug, Deserialize)]
pub struct RecordListQuery {
    pub shipment_id: Uuid,
}

/// POST /api/vms/pre-alerta/upload
///
/// Multipart fields: `file` (.xlsx), `provider_id`, `shipment_date`.
/// Creates the shipment in PRE_ALERTA and stores the manifest rows.
pub async fn upload_pre_alerta(
    State(state): State<AppState>,
    operator: Operator,
    mut multipart: Multipart,
) -> ApiResult<Json<PreAlertaUploadResponse>> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut provider_id: Option<String> = None;
    let mut shipment_date: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => file_bytes = Some(field.bytes().await?.to_vec()),
            "provider_id" => provider_id = Some(field.text().await?),
            "shipment_date" => shipment_date = Some(field.text().await?),
            _ => {}
        }
    }

    let file_bytes =
        file_bytes.ok_or_else(|| ApiError::BadRequest("Missing file field".to_string()))?;
    let provider_id = provider_id
        .ok_or_else(|| ApiError::BadRequest("Missing provider_id field".to_string()))?;
    let shipment_date = shipment_date
        .ok_or_else(|| ApiError::BadRequest("Missing shipment_date field".to_string()))?;

    let provider_id = Uuid::parse_str(provider_id.trim())
        .map_err(|_| ApiError::BadRequest(format!("Invalid provider_id: {provider_id}")))?;
    let shipment_date = shipment_date.trim().to_string();
    if shipment_date.is_empty() {
        return Err(ApiError::BadRequest("shipment_date must not be empty".to_string()));
    }

    operator.check_provider_access(provider_id)?;
    if !db::shipments::provider_exists(&state.db, provider_id).await? {
        return Err(ApiError::BadRequest(format!("Unknown provider: {provider_id}")));
    }

    // Parse fully before touching the database; a bad file persists nothing
    let parsed = ingest::parse_pre_alerta(&file_bytes)?;

    let shipment =
        db::shipments::create_shipment(&state.db, provider_id, &shipment_date, &operator.name)
            .await?;
    let inserted =
        db::records::insert_pre_alerta_records(&state.db, shipment.id, &parsed.records).await?;

    tracing::info!(
        shipment_id = %shipment.id,
        provider_id = %provider_id,
        inserted,
        skipped = parsed.skipped,
        "Pre-alerta uploaded"
    );

    Ok(Json(PreAlertaUploadResponse {
        shipment_id: shipment.id,
        status: shipment.status,
        inserted,
        skipped: parsed.skipped,
    }))
}

/// GET /api/vms/pre-alerta?shipment_id=
pub async fn list_pre_alerta(
    State(state): State<AppState>,
    operator: Operator,
    Query(query): Query<RecordListQuery>,
) -> ApiResult<Json<Vec<StoredPreAlerta>>> {
    let shipment = db::shipments::load_shipment(&state.db, query.shipment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Shipment not found: {}", query.shipment_id)))?;
    operator.check_provider_access(shipment.provider_id)?;

    let records = db::records::list_pre_alerta(&state.db, query.shipment_id).await?;
    Ok(Json(records))
}

pub fn pre_alerta_routes() -> Router<AppState> {
    Router::new()
        .route("/api/vms/pre-alerta/upload", post(upload_pre_alerta))
        .route("/api/vms/pre-alerta", get(list_pre_alerta))
}
