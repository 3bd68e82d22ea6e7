//! Provider catalog endpoints

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
use crate::models::{NotificationKind, Provider};
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 10;

/// GET /api/providers response
#[derive(Debug, Serialize)]
pub struct ProviderListResponse {
    pub providers: Vec<Provider>,
    pub pagination: PageInfo,
}

#[derive(Debug, Deserialize)]
pub struct CreateProvider {
    pub name: Option<String>,
    pub responsible: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProvider {
    pub name: Option<String>,
    pub responsible: Option<String>,
}

/// GET /api/providers
pub async fn list_providers(
    State(state): State<AppState>,
    _operator: Operator,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<ProviderListResponse>> {
    let page = PageRequest::from_params(params, DEFAULT_PAGE_SIZE);
    let (providers, total) =
        db::catalog::list_providers(&state.db, page.limit, page.offset).await?;

    Ok(Json(ProviderListResponse {
        providers,
        pagination: page.info(total),
    }))
}

/// POST /api/providers
pub async fn create_provider(
    State(state): State<AppState>,
    operator: Operator,
    Json(body): Json<CreateProvider>,
) -> ApiResult<(StatusCode, Json<Provider>)> {
    let name = body
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Provider name is required".to_string()))?;
    let responsible = body
        .responsible
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    let provider = db::catalog::create_provider(&state.db, name, responsible)
        .await?
        .ok_or_else(|| ApiError::Conflict(format!("Provider already exists: {name}")))?;

    db::notifications::fan_out(
        &state.db,
        NotificationKind::NewProvider,
        &format!("Nuevo proveedor creado: {}", provider.name),
    )
    .await?;
    tracing::info!(provider_id = %provider.id, name = %provider.name, operator = %operator.name, "Provider created");

    Ok((StatusCode::CREATED, Json(provider)))
}

/// GET /api/providers/{id}
pub async fn get_provider(
    State(state): State<AppState>,
    _operator: Operator,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Provider>> {
    let provider = db::catalog::load_provider(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Provider not found: {id}")))?;
    Ok(Json(provider))
}

/// PUT /api/providers/{id}
pub async fn update_provider(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateProvider>,
) -> ApiResult<Json<Provider>> {
    if body.name.is_none() && body.responsible.is_none() {
        return Err(ApiError::BadRequest(
            "At least one field is required".to_string(),
        ));
    }

    let current = db::catalog::load_provider(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Provider not found: {id}")))?;

    let name = match body.name.as_deref().map(str::trim) {
        Some("") => {
            return Err(ApiError::BadRequest(
                "Provider name must not be empty".to_string(),
            ))
        }
        Some(name) => name.to_string(),
        None => current.name,
    };
    let responsible = body.responsible.or(current.responsible);

    let updated = db::catalog::update_provider(&state.db, id, &name, responsible.as_deref()).await?;
    if !updated {
        return Err(ApiError::Conflict(format!(
            "Provider already exists: {name}"
        )));
    }

    let provider = db::catalog::load_provider(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Provider not found: {id}")))?;
    tracing::info!(provider_id = %id, operator = %operator.name, "Provider updated");
    Ok(Json(provider))
}

/// DELETE /api/providers/{id}
pub async fn delete_provider(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    db::catalog::load_provider(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Provider not found: {id}")))?;

    if db::catalog::provider_in_use(&state.db, id).await? {
        return Err(ApiError::BadRequest(
            "Provider has entries, packages or shipments attached".to_string(),
        ));
    }

    db::catalog::delete_provider(&state.db, id).await?;
    tracing::info!(provider_id = %id, operator = %operator.name, "Provider deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

pub fn provider_routes() -> Router<AppState> {
    Router::new()
        .route("/api/providers", get(list_providers).post(create_provider))
        .route(
            "/api/providers/:id",
            get(get_provider)
                .put(update_provider)
                .delete(delete_provider),
        )
}
