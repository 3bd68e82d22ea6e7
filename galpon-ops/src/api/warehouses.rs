//! Warehouse endpoints, mutation is admin only

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
use crate::models::{Warehouse, WarehouseDetail};
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 25;

/// GET /api/warehouses response
#[derive(Debug, Serialize)]
pub struct WarehouseListResponse {
    pub warehouses: Vec<Warehouse>,
    pub pagination: PageInfo,
}

#[derive(Debug, Deserialize)]
pub struct WarehouseBody {
    pub name: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
}

impl WarehouseBody {
    fn name(&self) -> Result<&str, ApiError> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ApiError::BadRequest("Warehouse name is required".to_string()))
    }
}

/// GET /api/warehouses
pub async fn list_warehouses(
    State(state): State<AppState>,
    _operator: Operator,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<WarehouseListResponse>> {
    let page = PageRequest::from_params(params, DEFAULT_PAGE_SIZE);
    let (warehouses, total) =
        db::storage::list_warehouses(&state.db, page.limit, page.offset).await?;

    Ok(Json(WarehouseListResponse {
        warehouses,
        pagination: page.info(total),
    }))
}

/// POST /api/warehouses
pub async fn create_warehouse(
    State(state): State<AppState>,
    operator: Operator,
    Json(body): Json<WarehouseBody>,
) -> ApiResult<(StatusCode, Json<Warehouse>)> {
    operator.require_admin()?;
    let name = body.name()?;

    let warehouse = db::storage::create_warehouse(
        &state.db,
        name,
        body.address.as_deref(),
        body.description.as_deref(),
    )
    .await?;
    tracing::info!(warehouse_id = %warehouse.id, name = %warehouse.name, operator = %operator.name, "Warehouse created");

    Ok((StatusCode::CREATED, Json(warehouse)))
}

/// GET /api/warehouses/{id}
///
/// Includes the warehouse's locations.
pub async fn get_warehouse(
    State(state): State<AppState>,
    _operator: Operator,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WarehouseDetail>> {
    let warehouse = db::storage::load_warehouse_detail(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Warehouse not found: {id}")))?;
    Ok(Json(warehouse))
}

/// PUT /api/warehouses/{id}
pub async fn update_warehouse(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<Uuid>,
    Json(body): Json<WarehouseBody>,
) -> ApiResult<Json<Warehouse>> {
    operator.require_admin()?;
    let name = body.name()?;

    db::storage::load_warehouse(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Warehouse not found: {id}")))?;

    db::storage::update_warehouse(
        &state.db,
        id,
        name,
        body.address.as_deref(),
        body.description.as_deref(),
    )
    .await?;

    let warehouse = db::storage::load_warehouse(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Warehouse not found: {id}")))?;
    tracing::info!(warehouse_id = %id, operator = %operator.name, "Warehouse updated");
    Ok(Json(warehouse))
}

/// DELETE /api/warehouses/{id}
pub async fn delete_warehouse(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    operator.require_admin()?;

    db::storage::load_warehouse(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Warehouse not found: {id}")))?;

    if db::storage::warehouse_has_locations(&state.db, id).await? {
        return Err(ApiError::BadRequest(
            "Warehouse has locations attached".to_string(),
        ));
    }

    db::storage::delete_warehouse(&state.db, id).await?;
    tracing::info!(warehouse_id = %id, operator = %operator.name, "Warehouse deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

pub fn warehouse_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/warehouses",
            get(list_warehouses).post(create_warehouse),
        )
        .route(
            "/api/warehouses/:id",
            get(get_warehouse)
                .put(update_warehouse)
                .delete(delete_warehouse),
        )
}
