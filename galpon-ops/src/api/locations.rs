//! Location endpoints, mutation is admin only
//!
//! `check-contents` backs the delete confirmation dialog: it reports what
//! is still sitting at a location before anyone tries to remove it.

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
use crate::models::{LocationContents, LocationWithWarehouse};
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 25;

#[derive(Debug, Deserialize)]
pub struct LocationListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub warehouse_id: Option<Uuid>,
}

/// GET /api/locations response
#[derive(Debug, Serialize)]
pub struct LocationListResponse {
    pub locations: Vec<LocationWithWarehouse>,
    pub pagination: PageInfo,
}

/// GET /api/locations/{id}/check-contents response
#[derive(Debug, Serialize)]
pub struct CheckContentsResponse {
    pub has_contents: bool,
    pub details: ContentsDetails,
}

#[derive(Debug, Serialize)]
pub struct ContentsDetails {
    pub inventory_count: i64,
    pub packages_count: i64,
    pub reexpedicion_count: i64,
    pub total_items: i64,
}

impl From<LocationContents> for CheckContentsResponse {
    fn from(contents: LocationContents) -> Self {
        Self {
            has_contents: contents.has_contents(),
            details: ContentsDetails {
                inventory_count: contents.inventory_count,
                packages_count: contents.packages_count,
                reexpedicion_count: contents.reexpedicion_count,
                total_items: contents.total(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LocationBody {
    pub warehouse_id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl LocationBody {
    async fn validate(&self, state: &AppState) -> Result<(Uuid, &str), ApiError> {
        let warehouse_id = self.warehouse_id.ok_or_else(|| {
            ApiError::BadRequest("Warehouse and location name are required".to_string())
        })?;
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                ApiError::BadRequest("Warehouse and location name are required".to_string())
            })?;

        db::storage::load_warehouse(&state.db, warehouse_id)
            .await?
            .ok_or_else(|| ApiError::BadRequest(format!("Warehouse not found: {warehouse_id}")))?;

        Ok((warehouse_id, name))
    }
}

/// GET /api/locations
pub async fn list_locations(
    State(state): State<AppState>,
    _operator: Operator,
    Query(query): Query<LocationListQuery>,
) -> ApiResult<Json<LocationListResponse>> {
    let page = PageRequest::from_params(
        PageParams {
            page: query.page,
            limit: query.limit,
        },
        DEFAULT_PAGE_SIZE,
    );
    let (locations, total) =
        db::storage::list_locations(&state.db, query.warehouse_id, page.limit, page.offset).await?;

    Ok(Json(LocationListResponse {
        locations,
        pagination: page.info(total),
    }))
}

/// POST /api/locations
pub async fn create_location(
    State(state): State<AppState>,
    operator: Operator,
    Json(body): Json<LocationBody>,
) -> ApiResult<(StatusCode, Json<LocationWithWarehouse>)> {
    operator.require_admin()?;
    let (warehouse_id, name) = body.validate(&state).await?;

    let location =
        db::storage::create_location(&state.db, warehouse_id, name, body.description.as_deref())
            .await?;
    let detail = db::storage::load_location(&state.db, location.id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Location not found: {}", location.id)))?;
    tracing::info!(location_id = %location.id, name = %location.name, operator = %operator.name, "Location created");

    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/locations/{id}
pub async fn get_location(
    State(state): State<AppState>,
    _operator: Operator,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<LocationWithWarehouse>> {
    let location = db::storage::load_location(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Location not found: {id}")))?;
    Ok(Json(location))
}

/// GET /api/locations/{id}/check-contents
pub async fn check_contents(
    State(state): State<AppState>,
    _operator: Operator,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CheckContentsResponse>> {
    db::storage::load_location(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Location not found: {id}")))?;

    let contents = db::storage::location_contents(&state.db, id).await?;
    Ok(Json(contents.into()))
}

/// PUT /api/locations/{id}
pub async fn update_location(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<Uuid>,
    Json(body): Json<LocationBody>,
) -> ApiResult<Json<LocationWithWarehouse>> {
    operator.require_admin()?;

    db::storage::load_location(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Location not found: {id}")))?;
    let (warehouse_id, name) = body.validate(&state).await?;

    db::storage::update_location(&state.db, id, warehouse_id, name, body.description.as_deref())
        .await?;

    let location = db::storage::load_location(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Location not found: {id}")))?;
    tracing::info!(location_id = %id, operator = %operator.name, "Location updated");
    Ok(Json(location))
}

/// DELETE /api/locations/{id}
pub async fn delete_location(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    operator.require_admin()?;

    db::storage::load_location(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Location not found: {id}")))?;

    let contents = db::storage::location_contents(&state.db, id).await?;
    if contents.has_contents() {
        return Err(ApiError::BadRequest(format!(
            "Location still holds {} item(s)",
            contents.total()
        )));
    }

    db::storage::delete_location(&state.db, id).await?;
    tracing::info!(location_id = %id, operator = %operator.name, "Location deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

pub fn location_routes() -> Router<AppState> {
    Router::new()
        .route("/api/locations", get(list_locations).post(create_location))
        .route(
            "/api/locations/:id",
            get(get_location)
                .put(update_location)
                .delete(delete_location),
        )
        .route("/api/locations/:id/check-contents", get(check_contents))
}
