//! Package tracking endpoints
//!
//! Lookup endpoints accept either the package row id or the carrier
//! tracking number in the path, since stations mostly work from scans.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use galpon_common::pagination::{PageInfo, PageParams, PageRequest};
use galpon_common::Operator;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db;
use crate::db::packages::{PackageFilters, PackageOutcome};
use crate::error::{ApiError, ApiResult};
use crate::models::{MovementDetail, PackageDetail, PackageStatus};
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 25;

#[derive(Debug, Deserialize)]
pub struct PackageListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub tracking_number: Option<String>,
    pub provider_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub status: Option<PackageStatus>,
}

/// GET /api/packages response
#[derive(Debug, Serialize)]
pub struct PackageListResponse {
    pub packages: Vec<PackageDetail>,
    pub pagination: PageInfo,
}

/// GET /api/packages/{id} response
#[derive(Debug, Serialize)]
pub struct PackageWithMovements {
    #[serde(flatten)]
    pub package: PackageDetail,
    pub movements: Vec<MovementDetail>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePackage {
    pub tracking_number: Option<String>,
    pub provider_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct DeliverBody {
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransferBody {
    pub to_provider_id: Option<Uuid>,
    pub to_location_id: Option<Uuid>,
    pub notes: Option<String>,
}

async fn check_refs(
    state: &AppState,
    provider_id: Option<Uuid>,
    location_id: Option<Uuid>,
) -> Result<(), ApiError> {
    if let Some(provider_id) = provider_id {
        db::catalog::load_provider(&state.db, provider_id)
            .await?
            .ok_or_else(|| ApiError::BadRequest(format!("Provider not found: {provider_id}")))?;
    }
    if let Some(location_id) = location_id {
        db::storage::load_location(&state.db, location_id)
            .await?
            .ok_or_else(|| ApiError::BadRequest(format!("Location not found: {location_id}")))?;
    }
    Ok(())
}

/// GET /api/packages
pub async fn list_packages(
    State(state): State<AppState>,
    _operator: Operator,
    Query(query): Query<PackageListQuery>,
) -> ApiResult<Json<PackageListResponse>> {
    let page = PageRequest::from_params(
        PageParams {
            page: query.page,
            limit: query.limit,
        },
        DEFAULT_PAGE_SIZE,
    );
    let filters = PackageFilters {
        tracking: query.tracking_number,
        provider_id: query.provider_id,
        location_id: query.location_id,
        status: query.status,
    };
    let (packages, total) =
        db::packages::list_packages(&state.db, &filters, page.limit, page.offset).await?;

    Ok(Json(PackageListResponse {
        packages,
        pagination: page.info(total),
    }))
}

/// POST /api/packages
pub async fn create_package(
    State(state): State<AppState>,
    operator: Operator,
    Json(body): Json<CreatePackage>,
) -> ApiResult<(StatusCode, Json<PackageDetail>)> {
    let tracking = body
        .tracking_number
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Tracking number is required".to_string()))?;
    check_refs(&state, body.provider_id, body.location_id).await?;

    let package = db::packages::create_package(
        &state.db,
        tracking,
        body.provider_id,
        body.location_id,
        body.notes.as_deref(),
    )
    .await?
    .ok_or_else(|| ApiError::Conflict(format!("Package already exists: {tracking}")))?;
    tracing::info!(package_id = %package.package.id, tracking = %tracking, operator = %operator.name, "Package created");

    Ok((StatusCode::CREATED, Json(package)))
}

/// GET /api/packages/{id}
///
/// Package detail plus full movement history, newest first.
pub async fn get_package(
    State(state): State<AppState>,
    _operator: Operator,
    Path(key): Path<String>,
) -> ApiResult<Json<PackageWithMovements>> {
    let package = db::packages::load_package(&state.db, &key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Package not found: {key}")))?;
    let movements = db::packages::list_movements(&state.db, package.package.id).await?;

    Ok(Json(PackageWithMovements { package, movements }))
}

/// POST /api/packages/{id}/deliver
pub async fn deliver_package(
    State(state): State<AppState>,
    operator: Operator,
    Path(key): Path<String>,
    body: Option<Json<DeliverBody>>,
) -> ApiResult<Json<PackageDetail>> {
    operator.require_admin()?;
    let notes = body.and_then(|Json(b)| b.notes);

    let outcome = db::packages::deliver_package(&state.db, &key, notes.as_deref()).await?;
    match outcome {
        PackageOutcome::Applied(package) => {
            tracing::info!(package_id = %package.package.id, operator = %operator.name, "Package delivered");
            Ok(Json(*package))
        }
        PackageOutcome::NotFound => Err(ApiError::NotFound(format!("Package not found: {key}"))),
        PackageOutcome::AlreadyDelivered => Err(ApiError::BadRequest(
            "Package already delivered".to_string(),
        )),
    }
}

/// POST /api/packages/{id}/transfer
pub async fn transfer_package(
    State(state): State<AppState>,
    operator: Operator,
    Path(key): Path<String>,
    Json(body): Json<TransferBody>,
) -> ApiResult<Json<PackageDetail>> {
    operator.require_admin()?;
    check_refs(&state, body.to_provider_id, body.to_location_id).await?;

    let outcome = db::packages::transfer_package(
        &state.db,
        &key,
        body.to_provider_id,
        body.to_location_id,
        body.notes.as_deref(),
    )
    .await?;
    match outcome {
        PackageOutcome::Applied(package) => {
            tracing::info!(package_id = %package.package.id, operator = %operator.name, "Package transferred");
            Ok(Json(*package))
        }
        PackageOutcome::NotFound => Err(ApiError::NotFound(format!("Package not found: {key}"))),
        PackageOutcome::AlreadyDelivered => Err(ApiError::BadRequest(
            "Cannot transfer a delivered package".to_string(),
        )),
    }
}

pub fn package_routes() -> Router<AppState> {
    Router::new()
        .route("/api/packages", get(list_packages).post(create_package))
        .route("/api/packages/:id", get(get_package))
        .route("/api/packages/:id/deliver", post(deliver_package))
        .route("/api/packages/:id/transfer", post(transfer_package))
}
