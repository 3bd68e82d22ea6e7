//! Inventory endpoints
//!
//! Inventory rows tie a gate entry's cargo to the shelf it ended up on.

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
use crate::models::{InventoryDetail, InventoryStatus, NotificationKind};
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 25;

#[derive(Debug, Deserialize)]
pub struct InventoryListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub location_id: Option<Uuid>,
    pub entry_id: Option<Uuid>,
}

/// GET /api/inventory response
#[derive(Debug, Serialize)]
pub struct InventoryListResponse {
    pub inventory: Vec<InventoryDetail>,
    pub pagination: PageInfo,
}

#[derive(Debug, Deserialize)]
pub struct InventoryBody {
    pub entry_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub quantity: Option<i64>,
    pub status: Option<InventoryStatus>,
}

struct ValidatedInventory {
    entry_id: Uuid,
    location_id: Uuid,
    quantity: i64,
    status: InventoryStatus,
}

async fn validate_body(
    state: &AppState,
    body: &InventoryBody,
) -> Result<ValidatedInventory, ApiError> {
    let entry_id = body.entry_id.ok_or_else(|| {
        ApiError::BadRequest("Entry, location and quantity are required".to_string())
    })?;
    let location_id = body.location_id.ok_or_else(|| {
        ApiError::BadRequest("Entry, location and quantity are required".to_string())
    })?;
    let quantity = body.quantity.ok_or_else(|| {
        ApiError::BadRequest("Entry, location and quantity are required".to_string())
    })?;
    if quantity < 0 {
        return Err(ApiError::BadRequest(
            "Quantity must not be negative".to_string(),
        ));
    }

    db::entries::load_entry(&state.db, entry_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest(format!("Entry not found: {entry_id}")))?;
    db::storage::load_location(&state.db, location_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest(format!("Location not found: {location_id}")))?;

    Ok(ValidatedInventory {
        entry_id,
        location_id,
        quantity,
        status: body.status.unwrap_or(InventoryStatus::Stored),
    })
}

/// GET /api/inventory
pub async fn list_inventory(
    State(state): State<AppState>,
    _operator: Operator,
    Query(query): Query<InventoryListQuery>,
) -> ApiResult<Json<InventoryListResponse>> {
    let page = PageRequest::from_params(
        PageParams {
            page: query.page,
            limit: query.limit,
        },
        DEFAULT_PAGE_SIZE,
    );
    let (inventory, total) = db::inventory::list_inventory(
        &state.db,
        query.location_id,
        query.entry_id,
        page.limit,
        page.offset,
    )
    .await?;

    Ok(Json(InventoryListResponse {
        inventory,
        pagination: page.info(total),
    }))
}

/// POST /api/inventory
pub async fn create_inventory(
    State(state): State<AppState>,
    operator: Operator,
    Json(body): Json<InventoryBody>,
) -> ApiResult<(StatusCode, Json<InventoryDetail>)> {
    let valid = validate_body(&state, &body).await?;

    let detail = db::inventory::create_inventory(
        &state.db,
        valid.entry_id,
        valid.location_id,
        valid.quantity,
        valid.status,
    )
    .await?;

    db::notifications::fan_out(
        &state.db,
        NotificationKind::NewInventory,
        &format!(
            "Nuevo registro de inventario: {} - {}/{}",
            detail.provider_name, detail.warehouse_name, detail.location_name
        ),
    )
    .await?;
    tracing::info!(inventory_id = %detail.item.id, operator = %operator.name, "Inventory created");

    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/inventory/{id}
pub async fn get_inventory(
    State(state): State<AppState>,
    _operator: Operator,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<InventoryDetail>> {
    let detail = db::inventory::load_inventory(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Inventory record not found: {id}")))?;
    Ok(Json(detail))
}

/// PUT /api/inventory/{id}
pub async fn update_inventory(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<Uuid>,
    Json(body): Json<InventoryBody>,
) -> ApiResult<Json<InventoryDetail>> {
    operator.require_admin()?;

    db::inventory::load_inventory(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Inventory record not found: {id}")))?;
    let valid = validate_body(&state, &body).await?;

    db::inventory::update_inventory(
        &state.db,
        id,
        valid.entry_id,
        valid.location_id,
        valid.quantity,
        valid.status,
    )
    .await?;

    let detail = db::inventory::load_inventory(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Inventory record not found: {id}")))?;
    tracing::info!(inventory_id = %id, operator = %operator.name, "Inventory updated");
    Ok(Json(detail))
}

/// DELETE /api/inventory/{id}
pub async fn delete_inventory(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    operator.require_admin()?;

    db::inventory::load_inventory(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Inventory record not found: {id}")))?;

    db::inventory::delete_inventory(&state.db, id).await?;
    tracing::info!(inventory_id = %id, operator = %operator.name, "Inventory deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/api/inventory", get(list_inventory).post(create_inventory))
        .route(
            "/api/inventory/:id",
            get(get_inventory)
                .put(update_inventory)
                .delete(delete_inventory),
        )
}
