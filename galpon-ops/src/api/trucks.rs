//! Truck catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use galpon_common::pagination::{PageInfo, PageParams, PageRequest};
use galpon_common::Operator;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::Truck;
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 10;

/// GET /api/trucks response
#[derive(Debug, Serialize)]
pub struct TruckListResponse {
    pub trucks: Vec<Truck>,
    pub pagination: PageInfo,
}

#[derive(Debug, Deserialize)]
pub struct TruckBody {
    pub license_plate: Option<String>,
}

/// GET /api/trucks
pub async fn list_trucks(
    State(state): State<AppState>,
    _operator: Operator,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<TruckListResponse>> {
    let page = PageRequest::from_params(params, DEFAULT_PAGE_SIZE);
    let (trucks, total) = db::catalog::list_trucks(&state.db, page.limit, page.offset).await?;

    Ok(Json(TruckListResponse {
        trucks,
        pagination: page.info(total),
    }))
}

/// POST /api/trucks
pub async fn create_truck(
    State(state): State<AppState>,
    operator: Operator,
    Json(body): Json<TruckBody>,
) -> ApiResult<(StatusCode, Json<Truck>)> {
    let license_plate = body
        .license_plate
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("License plate is required".to_string()))?;

    let truck = db::catalog::create_truck(&state.db, license_plate)
        .await?
        .ok_or_else(|| ApiError::Conflict(format!("Truck already exists: {license_plate}")))?;
    tracing::info!(truck_id = %truck.id, plate = %truck.license_plate, operator = %operator.name, "Truck created");

    Ok((StatusCode::CREATED, Json(truck)))
}

/// GET /api/trucks/{id}
pub async fn get_truck(
    State(state): State<AppState>,
    _operator: Operator,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Truck>> {
    let truck = db::catalog::load_truck(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Truck not found: {id}")))?;
    Ok(Json(truck))
}

/// PUT /api/trucks/{id}
pub async fn update_truck(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<Uuid>,
    Json(body): Json<TruckBody>,
) -> ApiResult<Json<Truck>> {
    let license_plate = body
        .license_plate
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("License plate is required".to_string()))?;

    db::catalog::load_truck(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Truck not found: {id}")))?;

    let updated = db::catalog::update_truck(&state.db, id, license_plate).await?;
    if !updated {
        return Err(ApiError::Conflict(format!(
            "Truck already exists: {license_plate}"
        )));
    }

    let truck = db::catalog::load_truck(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Truck not found: {id}")))?;
    tracing::info!(truck_id = %id, operator = %operator.name, "Truck updated");
    Ok(Json(truck))
}

/// DELETE /api/trucks/{id}
pub async fn delete_truck(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    db::catalog::load_truck(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Truck not found: {id}")))?;

    if db::catalog::truck_in_use(&state.db, id).await? {
        return Err(ApiError::BadRequest(
            "Truck has entries attached".to_string(),
        ));
    }

    db::catalog::delete_truck(&state.db, id).await?;
    tracing::info!(truck_id = %id, operator = %operator.name, "Truck deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

pub fn truck_routes() -> Router<AppState> {
    Router::new()
        .route("/api/trucks", get(list_trucks).post(create_truck))
        .route(
            "/api/trucks/:id",
            get(get_truck).put(update_truck).delete(delete_truck),
        )
}
