//! galpon-ops library interface
//!
//! Exposes the router and domain modules for integration testing.

pub mod api;
pub mod db;
pub mod error;
pub mod models;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::FromRef;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

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
        .merge(api::provider_routes())
        .merge(api::truck_routes())
        .merge(api::entry_routes())
        .merge(api::warehouse_routes())
        .merge(api::location_routes())
        .merge(api::package_routes())
        .merge(api::inventory_routes())
        .merge(api::label_routes())
        .merge(api::reexpedicion_routes())
        .merge(api::notification_routes())
        .merge(api::stats_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
