//! Dashboard statistics endpoint

use axum::{extract::State, routing::get, Json, Router};
use galpon_common::Operator;
use serde::Serialize;

use crate::db;
use crate::db::entries::{MonthCount, ProviderCount};
use crate::error::ApiResult;
use crate::AppState;

/// GET /api/stats response
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub entries_by_month: Vec<MonthCount>,
    pub entries_by_provider: Vec<ProviderCount>,
    /// Null until at least one entry has both times recorded
    pub avg_duration: Option<f64>,
}

/// GET /api/stats
pub async fn get_stats(
    State(state): State<AppState>,
    _operator: Operator,
) -> ApiResult<Json<StatsResponse>> {
    let entries_by_month = db::entries::entries_by_month(&state.db).await?;
    let entries_by_provider = db::entries::entries_by_provider(&state.db).await?;
    let avg_duration = db::entries::average_duration(&state.db).await?;

    Ok(Json(StatsResponse {
        entries_by_month,
        entries_by_provider,
        avg_duration,
    }))
}

pub fn stats_routes() -> Router<AppState> {
    Router::new().route("/api/stats", get(get_stats))
}
