//! galpon-vms library interface
//!
//! Exposes the router and domain modules for integration testing.

pub mod api;
pub mod classify;
pub mod db;
pub mod error;
pub mod export;
pub mod ingest;
pub mod models;
pub mod stats;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::{DefaultBodyLimit, FromRef};
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Spreadsheet uploads can run to tens of thousands of rows.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Shared SQLite connection pool
    pub db: SqlitePool,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

// The operator extractor pulls the pool straight out of the state.
impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> SqlitePool {
        state.db.clone()
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::shipment_routes())
        .merge(api::pre_alerta_routes())
        .merge(api::pre_ruteo_routes())
        .merge(api::verification_routes())
        .merge(api::clasificacion_routes())
        .merge(api::search_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
