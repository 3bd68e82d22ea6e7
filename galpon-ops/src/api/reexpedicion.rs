//! Reexpedición endpoints
//!
//! One POST serves both flows: an INGRESO scans tracking numbers into a
//! location, an EGRESO hands a selection of those etiquetas back out. The
//! `disponibles` list feeds the egreso picker with origins that still have
//! ACTIVO etiquetas.

use std::collections::HashSet;

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
use crate::db::reexpedicion::{EgresoOutcome, MovimientoFilters};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    EstadoMovimiento, MovimientoDetail, NotificationKind, SubtipoEgreso, SubtipoIngreso,
    TipoMovimiento,
};
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 25;

#[derive(Debug, Deserialize)]
pub struct MovimientoListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub tipo: Option<TipoMovimiento>,
    pub subtipo_ingreso: Option<SubtipoIngreso>,
    pub subtipo_egreso: Option<SubtipoEgreso>,
    pub warehouse_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub estado: Option<EstadoMovimiento>,
    pub tracking_number: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DisponiblesQuery {
    pub warehouse_id: Option<Uuid>,
    pub subtipo_ingreso: Option<SubtipoIngreso>,
}

/// GET /api/reexpedicion response
#[derive(Debug, Serialize)]
pub struct MovimientoListResponse {
    pub movimientos: Vec<MovimientoDetail>,
    pub pagination: PageInfo,
}

#[derive(Debug, Deserialize)]
pub struct CreateMovimiento {
    pub tipo: Option<TipoMovimiento>,
    pub subtipo_ingreso: Option<SubtipoIngreso>,
    pub subtipo_egreso: Option<SubtipoEgreso>,
    pub warehouse_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub tracking_numbers: Option<Vec<String>>,
    pub notas: Option<String>,
    pub movimiento_origen_id: Option<Uuid>,
    pub etiquetas_seleccionadas: Option<Vec<Uuid>>,
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid {field}: {value}")))
}

/// GET /api/reexpedicion
pub async fn list_movimientos(
    State(state): State<AppState>,
    _operator: Operator,
    Query(query): Query<MovimientoListQuery>,
) -> ApiResult<Json<MovimientoListResponse>> {
    let page = PageRequest::from_params(
        PageParams {
            page: query.page,
            limit: query.limit,
        },
        DEFAULT_PAGE_SIZE,
    );
    let filters = MovimientoFilters {
        tipo: query.tipo,
        subtipo_ingreso: query.subtipo_ingreso,
        subtipo_egreso: query.subtipo_egreso,
        warehouse_id: query.warehouse_id,
        location_id: query.location_id,
        estado: query.estado,
        tracking: query.tracking_number,
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

    let (movimientos, total) =
        db::reexpedicion::list_movimientos(&state.db, &filters, page.limit, page.offset).await?;

    Ok(Json(MovimientoListResponse {
        movimientos,
        pagination: page.info(total),
    }))
}

/// GET /api/reexpedicion/disponibles
///
/// Origins an egreso can draw from, carrying only their ACTIVO etiquetas.
pub async fn list_disponibles(
    State(state): State<AppState>,
    _operator: Operator,
    Query(query): Query<DisponiblesQuery>,
) -> ApiResult<Json<Vec<MovimientoDetail>>> {
    let movimientos =
        db::reexpedicion::list_disponibles(&state.db, query.warehouse_id, query.subtipo_ingreso)
            .await?;
    Ok(Json(movimientos))
}

/// GET /api/reexpedicion/{id}
pub async fn get_movimiento(
    State(state): State<AppState>,
    _operator: Operator,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MovimientoDetail>> {
    let movimiento = db::reexpedicion::load_movimiento(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Movimiento not found: {id}")))?;
    Ok(Json(movimiento))
}

/// POST /api/reexpedicion
pub async fn create_movimiento(
    State(state): State<AppState>,
    operator: Operator,
    Json(body): Json<CreateMovimiento>,
) -> ApiResult<(StatusCode, Json<MovimientoDetail>)> {
    let (tipo, warehouse_id, location_id) =
        match (body.tipo, body.warehouse_id, body.location_id) {
            (Some(tipo), Some(warehouse_id), Some(location_id)) => {
                (tipo, warehouse_id, location_id)
            }
            _ => {
                return Err(ApiError::BadRequest(
                    "Tipo, warehouse and location are required".to_string(),
                ))
            }
        };

    db::storage::load_warehouse(&state.db, warehouse_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest(format!("Warehouse not found: {warehouse_id}")))?;
    db::storage::load_location(&state.db, location_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest(format!("Location not found: {location_id}")))?;

    let detail = match tipo {
        TipoMovimiento::Ingreso => {
            create_ingreso(&state, &operator, warehouse_id, location_id, &body).await?
        }
        TipoMovimiento::Egreso => {
            create_egreso(&state, &operator, warehouse_id, location_id, &body).await?
        }
    };

    Ok((StatusCode::CREATED, Json(detail)))
}

async fn create_ingreso(
    state: &AppState,
    operator: &Operator,
    warehouse_id: Uuid,
    location_id: Uuid,
    body: &CreateMovimiento,
) -> Result<MovimientoDetail, ApiError> {
    let subtipo = body
        .subtipo_ingreso
        .ok_or_else(|| ApiError::BadRequest("Subtipo de ingreso is required".to_string()))?;

    let tracking_numbers: Vec<String> = body
        .tracking_numbers
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if tracking_numbers.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one tracking number is required".to_string(),
        ));
    }

    let unique: HashSet<&str> = tracking_numbers.iter().map(String::as_str).collect();
    if unique.len() != tracking_numbers.len() {
        return Err(ApiError::BadRequest(
            "Duplicate tracking numbers in the same movimiento".to_string(),
        ));
    }

    let detail = db::reexpedicion::create_ingreso(
        &state.db,
        subtipo,
        warehouse_id,
        location_id,
        &tracking_numbers,
        body.notas.as_deref(),
        &operator.id.to_string(),
    )
    .await?;

    db::notifications::fan_out(
        &state.db,
        NotificationKind::NewReexpedicion,
        &format!(
            "Nuevo ingreso de reexpedición: {} - {} etiqueta(s) en {}",
            subtipo.human_label(),
            tracking_numbers.len(),
            detail.location_name
        ),
    )
    .await?;
    tracing::info!(
        movimiento_id = %detail.movimiento.id,
        etiquetas = tracking_numbers.len(),
        operator = %operator.name,
        "Reexpedición ingreso created"
    );

    Ok(detail)
}

async fn create_egreso(
    state: &AppState,
    operator: &Operator,
    warehouse_id: Uuid,
    location_id: Uuid,
    body: &CreateMovimiento,
) -> Result<MovimientoDetail, ApiError> {
    let subtipo = body
        .subtipo_egreso
        .ok_or_else(|| ApiError::BadRequest("Subtipo de egreso is required".to_string()))?;
    let origen_id = body
        .movimiento_origen_id
        .ok_or_else(|| ApiError::BadRequest("Origin movimiento is required".to_string()))?;

    let seleccion = body
        .etiquetas_seleccionadas
        .as_deref()
        .unwrap_or_default()
        .to_vec();
    if seleccion.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one etiqueta must be selected".to_string(),
        ));
    }

    let outcome = db::reexpedicion::create_egreso(
        &state.db,
        subtipo,
        warehouse_id,
        location_id,
        origen_id,
        &seleccion,
        body.notas.as_deref(),
        &operator.id.to_string(),
    )
    .await?;

    let detail = match outcome {
        EgresoOutcome::Created(detail) => *detail,
        EgresoOutcome::OriginNotFound => {
            return Err(ApiError::NotFound(format!(
                "Origin movimiento not found: {origen_id}"
            )))
        }
        EgresoOutcome::Unavailable => {
            return Err(ApiError::BadRequest(
                "Some selected etiquetas are no longer available".to_string(),
            ))
        }
    };

    db::notifications::fan_out(
        &state.db,
        NotificationKind::NewReexpedicion,
        &format!(
            "Nuevo egreso de reexpedición: {} - {} etiqueta(s) desde {}",
            subtipo.human_label(),
            seleccion.len(),
            detail.location_name
        ),
    )
    .await?;
    tracing::info!(
        movimiento_id = %detail.movimiento.id,
        origen_id = %origen_id,
        etiquetas = seleccion.len(),
        operator = %operator.name,
        "Reexpedición egreso created"
    );

    Ok(detail)
}

pub fn reexpedicion_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/reexpedicion",
            get(list_movimientos).post(create_movimiento),
        )
        .route("/api/reexpedicion/disponibles", get(list_disponibles))
        .route("/api/reexpedicion/:id", get(get_movimiento))
}
