//! Verification scanning endpoints

use axum::{extract::State, routing::post, Json, Router};
use galpon_common::Operator;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classify;
use crate::db::shipments::TransitionOutcome;
use crate::error::{ApiError, ApiResult};
use crate::models::{ScanResult, ShipmentStatus};
use crate::stats::VerificationStats;
use crate::{db, AppState};

/// POST /api/vms/verification/scan request
#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub shipment_id: Uuid,
    pub tracking_number: String,
}

/// POST /api/vms/verification/scan response
#[derive(Debug, Serialize)]
pub struct ScanResponse {
    #[serde(flatten)]
    pub result: ScanResult,
    pub stats: VerificationStats,
}

/// POST /api/vms/verification/finalize request
#[derive(Debug, Deserialize)]
pub struct FinalizeRequest {
    pub shipment_id: Uuid,
}

/// POST /api/vms/verification/finalize response
#[derive(Debug, Serialize)]
pub struct FinalizeResponse {
    pub shipment_id: Uuid,
    pub status: ShipmentStatus,
    pub stats: VerificationStats,
}

/// POST /api/vms/verification/scan
///
/// Classifies one tracking number against the shipment's two sheets and
/// records the scan. Re-scanning a tracking returns the original outcome
/// with `already_scanned` set and leaves the counters untouched.
pub async fn scan(
    State(state): State<AppState>,
    operator: Operator,
    Json(request): Json<ScanRequest>,
) -> ApiResult<Json<ScanResponse>> {
    let shipment = db::shipments::load_shipment(&state.db, request.shipment_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("Shipment not found: {}", request.shipment_id))
        })?;
    operator.check_provider_access(shipment.provider_id)?;

    if !matches!(
        shipment.status,
        ShipmentStatus::PreRuteo | ShipmentStatus::Verificacion
    ) {
        return Err(ApiError::Conflict(format!(
            "Shipment in {} does not accept verification scans",
            shipment.status.as_str()
        )));
    }

    let tracking = classify::normalize_scan(&request.tracking_number);
    if tracking.is_empty() {
        return Err(ApiError::BadRequest("tracking_number must not be empty".to_string()));
    }

    if let Some(existing) = db::scans::find_scan(&state.db, shipment.id, tracking).await? {
        return duplicate_response(&state, existing).await;
    }

    let (in_pre_alerta, in_pre_ruteo) =
        db::records::tracking_membership(&state.db, shipment.id, tracking).await?;
    let status = classify::classify(in_pre_alerta, in_pre_ruteo);

    let scan = match db::scans::insert_scan(&state.db, shipment.id, tracking, status, &operator.name)
        .await?
    {
        Some(scan) => scan,
        // Another station inserted the same tracking in between
        None => {
            let existing = db::scans::find_scan(&state.db, shipment.id, tracking)
                .await?
                .ok_or_else(|| ApiError::Internal("Scan vanished after conflict".to_string()))?;
            return duplicate_response(&state, existing).await;
        }
    };

    if shipment.status == ShipmentStatus::PreRuteo {
        // First scan opens verification; a concurrent first scan may have
        // already done so, which is fine
        let outcome =
            db::shipments::transition_shipment(&state.db, shipment.id, ShipmentStatus::Verificacion)
                .await?;
        if matches!(outcome, TransitionOutcome::Applied) {
            tracing::info!(shipment_id = %shipment.id, "Shipment entered VERIFICACION");
        }
    }

    tracing::debug!(
        shipment_id = %shipment.id,
        tracking = %scan.tracking_number,
        status = scan.status.as_str(),
        "Package scanned"
    );

    let stats = db::scans::verification_stats(&state.db, shipment.id).await?;
    Ok(Json(ScanResponse {
        result: ScanResult {
            tracking_number: scan.tracking_number,
            status: scan.status,
            already_scanned: false,
            scanned_at: scan.scanned_at,
        },
        stats,
    }))
}

async fn duplicate_response(
    state: &AppState,
    existing: crate::models::ScannedPackage,
) -> ApiResult<Json<ScanResponse>> {
    let stats = db::scans::verification_stats(&state.db, existing.shipment_id).await?;
    Ok(Json(ScanResponse {
        result: ScanResult {
            tracking_number: existing.tracking_number,
            status: existing.status,
            already_scanned: true,
            scanned_at: existing.scanned_at,
        },
        stats,
    }))
}

/// POST /api/vms/verification/finalize
///
/// Closes verification for a shipment; only VERIFICACION shipments qualify,
/// so a shipment that never saw a scan cannot be finalized.
pub async fn finalize(
    State(state): State<AppState>,
    operator: Operator,
    Json(request): Json<FinalizeRequest>,
) -> ApiResult<Json<FinalizeResponse>> {
    let shipment = db::shipments::load_shipment(&state.db, request.shipment_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("Shipment not found: {}", request.shipment_id))
        })?;
    operator.check_provider_access(shipment.provider_id)?;

    match db::shipments::transition_shipment(&state.db, shipment.id, ShipmentStatus::Finalizado)
        .await?
    {
        TransitionOutcome::Applied => {}
        TransitionOutcome::NotFound => {
            return Err(ApiError::NotFound(format!(
                "Shipment not found: {}",
                request.shipment_id
            )))
        }
        TransitionOutcome::Illegal { from } => {
            return Err(ApiError::Conflict(format!(
                "Cannot finalize shipment in {}",
                from.as_str()
            )))
        }
    }

    let stats = db::scans::verification_stats(&state.db, shipment.id).await?;
    tracing::info!(
        shipment_id = %shipment.id,
        operator = %operator.name,
        scanned = stats.total_scanned,
        faltante = stats.faltante,
        "Verification finalized"
    );

    Ok(Json(FinalizeResponse {
        shipment_id: shipment.id,
        status: ShipmentStatus::Finalizado,
        stats,
    }))
}

pub fn verification_routes() -> Router<AppState> {
    Router::new()
        .route("/api/vms/verification/scan", post(scan))
        .route("/api/vms/verification/finalize", post(finalize))
}
