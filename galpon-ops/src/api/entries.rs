//! Gate entry endpoints
//!
//! An entry is one truck visit for one provider. Week and month are
//! stamped server side at create and update time.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use galpon_common::pagination::{PageInfo, PageParams, PageRequest};
use galpon_common::Operator;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db;
use crate::db::entries::EntryFilters;
use crate::error::{ApiError, ApiResult};
use crate::models::EntryWithRefs;
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct EntryListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub provider_id: Option<Uuid>,
    pub truck_id: Option<Uuid>,
    pub week: Option<i64>,
    pub month: Option<i64>,
}

/// GET /api/entries response
#[derive(Debug, Serialize)]
pub struct EntryListResponse {
    pub entries: Vec<EntryWithRefs>,
    pub pagination: PageInfo,
}

/// GET /api/entries/filter-options response
#[derive(Debug, Serialize)]
pub struct FilterOptionsResponse {
    pub weeks: Vec<i64>,
    pub months: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct EntryBody {
    pub provider_id: Option<Uuid>,
    pub truck_id: Option<Uuid>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub departure_time: Option<DateTime<Utc>>,
}

struct ValidatedEntry {
    provider_id: Uuid,
    truck_id: Uuid,
    arrival_time: Option<DateTime<Utc>>,
    departure_time: Option<DateTime<Utc>>,
}

/// Shared create/update validation: both references must resolve and the
/// times must be ordered when both are present.
async fn validate_body(state: &AppState, body: &EntryBody) -> Result<ValidatedEntry, ApiError> {
    let provider_id = body
        .provider_id
        .ok_or_else(|| ApiError::BadRequest("Provider and truck are required".to_string()))?;
    let truck_id = body
        .truck_id
        .ok_or_else(|| ApiError::BadRequest("Provider and truck are required".to_string()))?;

    db::catalog::load_provider(&state.db, provider_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest(format!("Provider not found: {provider_id}")))?;
    db::catalog::load_truck(&state.db, truck_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest(format!("Truck not found: {truck_id}")))?;

    if let (Some(arrival), Some(departure)) = (body.arrival_time, body.departure_time) {
        if departure < arrival {
            return Err(ApiError::BadRequest(
                "Departure time must not precede arrival time".to_string(),
            ));
        }
    }

    Ok(ValidatedEntry {
        provider_id,
        truck_id,
        arrival_time: body.arrival_time,
        departure_time: body.departure_time,
    })
}

/// GET /api/entries
pub async fn list_entries(
    State(state): State<AppState>,
    _operator: Operator,
    Query(query): Query<EntryListQuery>,
) -> ApiResult<Json<EntryListResponse>> {
    let page = PageRequest::from_params(
        PageParams {
            page: query.page,
            limit: query.limit,
        },
        DEFAULT_PAGE_SIZE,
    );
    let filters = EntryFilters {
        provider_id: query.provider_id,
        truck_id: query.truck_id,
        week: query.week,
        month: query.month,
    };
    let (entries, total) =
        db::entries::list_entries(&state.db, &filters, page.limit, page.offset).await?;

    Ok(Json(EntryListResponse {
        entries,
        pagination: page.info(total),
    }))
}

/// POST /api/entries
pub async fn create_entry(
    State(state): State<AppState>,
    operator: Operator,
    Json(body): Json<EntryBody>,
) -> ApiResult<(StatusCode, Json<EntryWithRefs>)> {
    let valid = validate_body(&state, &body).await?;

    let entry = db::entries::create_entry(
        &state.db,
        valid.provider_id,
        valid.truck_id,
        valid.arrival_time,
        valid.departure_time,
    )
    .await?;
    let detail = db::entries::load_entry(&state.db, entry.id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Entry not found: {}", entry.id)))?;

    db::notifications::fan_out(
        &state.db,
        crate::models::NotificationKind::NewEntry,
        &format!(
            "Nueva entrada registrada: {} - {}",
            detail.provider.name, detail.truck.license_plate
        ),
    )
    .await?;
    tracing::info!(entry_id = %entry.id, operator = %operator.name, "Entry created");

    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/entries/filter-options
pub async fn filter_options(
    State(state): State<AppState>,
    _operator: Operator,
) -> ApiResult<Json<FilterOptionsResponse>> {
    let (weeks, months) = db::entries::filter_options(&state.db).await?;
    Ok(Json(FilterOptionsResponse { weeks, months }))
}

/// GET /api/entries/{id}
pub async fn get_entry(
    State(state): State<AppState>,
    _operator: Operator,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<EntryWithRefs>> {
    let entry = db::entries::load_entry(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Entry not found: {id}")))?;
    Ok(Json(entry))
}

/// PUT /api/entries/{id}
///
/// Full replace: week, month, and duration are restamped from the update
/// moment and the new times.
pub async fn update_entry(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<Uuid>,
    Json(body): Json<EntryBody>,
) -> ApiResult<Json<EntryWithRefs>> {
    db::entries::load_entry(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Entry not found: {id}")))?;
    let valid = validate_body(&state, &body).await?;

    db::entries::update_entry(
        &state.db,
        id,
        valid.provider_id,
        valid.truck_id,
        valid.arrival_time,
        valid.departure_time,
    )
    .await?;

    let entry = db::entries::load_entry(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Entry not found: {id}")))?;
    tracing::info!(entry_id = %id, operator = %operator.name, "Entry updated");
    Ok(Json(entry))
}

/// DELETE /api/entries/{id}
pub async fn delete_entry(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    db::entries::load_entry(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Entry not found: {id}")))?;

    if db::entries::entry_has_inventory(&state.db, id).await? {
        return Err(ApiError::BadRequest(
            "Entry has inventory records attached".to_string(),
        ));
    }

    db::entries::delete_entry(&state.db, id).await?;
    tracing::info!(entry_id = %id, operator = %operator.name, "Entry deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

pub fn entry_routes() -> Router<AppState> {
    Router::new()
        .route("/api/entries", get(list_entries).post(create_entry))
        .route("/api/entries/filter-options", get(filter_options))
        .route(
            "/api/entries/:id",
            get(get_entry).put(update_entry).delete(delete_entry),
        )
}
