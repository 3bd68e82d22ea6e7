//! Barcode label endpoints
//!
//! Labels are pre-printed stickers for the two carriers the warehouse
//! serves, so issuing and destroying them is restricted to admins.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use galpon_common::pagination::{PageInfo, PageParams, PageRequest};
use galpon_common::Operator;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db;
use crate::db::labels::LabelFilters;
use crate::error::{ApiError, ApiResult};
use crate::models::{LABEL_PROVIDERS, Label, ProviderLabelCount};
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 25;

#[derive(Debug, Deserialize)]
pub struct LabelListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub provider_name: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// GET /api/labels response
#[derive(Debug, Serialize)]
pub struct LabelListResponse {
    pub labels: Vec<Label>,
    pub pagination: PageInfo,
    pub counts_by_provider: Vec<ProviderLabelCount>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLabel {
    pub provider_name: Option<String>,
    pub description: Option<String>,
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid {field}: {value}")))
}

/// GET /api/labels
pub async fn list_labels(
    State(state): State<AppState>,
    _operator: Operator,
    Query(query): Query<LabelListQuery>,
) -> ApiResult<Json<LabelListResponse>> {
    let page = PageRequest::from_params(
        PageParams {
            page: query.page,
            limit: query.limit,
        },
        DEFAULT_PAGE_SIZE,
    );
    let filters = LabelFilters {
        provider_name: query.provider_name,
        start_date: query
            .start_date
            .as_deref()
            .map(|d| parse_date(d, "start_date"))
            .transpose()?,
        end_date: query
            .end_date
            .as_deref()
            .map(|d| parse_date(d, "end_date"))
            .transpose()?,
    };

    let (labels, total) = db::labels::list_labels(&state.db, &filters, page.limit, page.offset).await?;
    let counts_by_provider = db::labels::counts_by_provider(&state.db, &filters).await?;

    Ok(Json(LabelListResponse {
        labels,
        pagination: page.info(total),
        counts_by_provider,
    }))
}

/// POST /api/labels
pub async fn create_label(
    State(state): State<AppState>,
    operator: Operator,
    Json(body): Json<CreateLabel>,
) -> ApiResult<(StatusCode, Json<Label>)> {
    operator.require_admin()?;

    let provider_name = body
        .provider_name
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Provider name is required".to_string()))?;
    if !LABEL_PROVIDERS.contains(&provider_name) {
        return Err(ApiError::BadRequest(format!(
            "Provider must be one of: {}",
            LABEL_PROVIDERS.join(", ")
        )));
    }

    let label =
        db::labels::create_label(&state.db, provider_name, body.description.as_deref().unwrap_or(""))
            .await?;
    tracing::info!(label_id = %label.id, barcode = %label.barcode, operator = %operator.name, "Label created");

    Ok((StatusCode::CREATED, Json(label)))
}

/// GET /api/labels/{id}
pub async fn get_label(
    State(state): State<AppState>,
    _operator: Operator,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Label>> {
    let label = db::labels::load_label(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Label not found: {id}")))?;
    Ok(Json(label))
}

/// DELETE /api/labels/{id}
pub async fn delete_label(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    operator.require_admin()?;

    let deleted = db::labels::delete_label(&state.db, id).await?;
    if !deleted {
        return Err(ApiError::NotFound(format!("Label not found: {id}")));
    }

    tracing::info!(label_id = %id, operator = %operator.name, "Label deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

pub fn label_routes() -> Router<AppState> {
    Router::new()
        .route("/api/labels", get(list_labels).post(create_label))
        .route("/api/labels/:id", get(get_label).delete(delete_label))
}
