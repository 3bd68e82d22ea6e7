//! Notification feed and preference endpoints
//!
//! Notifications have no read flag. The whole feed counts as unread until
//! the operator marks it read, which simply deletes the rows.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use galpon_common::pagination::{PageInfo, PageParams, PageRequest};
use galpon_common::Operator;
use serde::{Deserialize, Serialize};

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{Notification, NotificationPreferences};
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;

/// GET /api/notifications response
#[derive(Debug, Serialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    pub preferences: NotificationPreferences,
    pub unread_count: i64,
    pub pagination: PageInfo,
}

#[derive(Debug, Deserialize)]
pub struct PatchBody {
    pub action: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePreferencesBody {
    pub new_entry: Option<bool>,
    pub new_provider: Option<bool>,
    pub new_inventory: Option<bool>,
    pub new_reexpedicion: Option<bool>,
}

/// GET /api/notifications
///
/// The operator's own feed, newest first. First touch creates the default
/// preferences row, which also opts the operator into fan-out.
pub async fn list_notifications(
    State(state): State<AppState>,
    operator: Operator,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<NotificationListResponse>> {
    let page = PageRequest::from_params(params, DEFAULT_PAGE_SIZE);

    let preferences = db::notifications::get_or_create_preferences(&state.db, operator.id).await?;
    let (notifications, total) =
        db::notifications::list_notifications(&state.db, operator.id, page.limit, page.offset)
            .await?;

    Ok(Json(NotificationListResponse {
        notifications,
        preferences,
        unread_count: total,
        pagination: page.info(total),
    }))
}

/// PATCH /api/notifications
///
/// `{"action": "mark_as_read"}` clears the operator's feed.
pub async fn patch_notifications(
    State(state): State<AppState>,
    operator: Operator,
    Json(body): Json<PatchBody>,
) -> ApiResult<Json<serde_json::Value>> {
    match body.action.as_deref() {
        Some("mark_as_read") => {
            let cleared = db::notifications::clear_notifications(&state.db, operator.id).await?;
            tracing::info!(operator = %operator.name, cleared, "Notifications marked as read");
            Ok(Json(serde_json::json!({ "success": true })))
        }
        _ => Err(ApiError::BadRequest("Invalid action".to_string())),
    }
}

/// PUT /api/notifications
///
/// Partial update of the preference flags; omitted flags keep their value.
pub async fn update_preferences(
    State(state): State<AppState>,
    operator: Operator,
    Json(body): Json<UpdatePreferencesBody>,
) -> ApiResult<Json<NotificationPreferences>> {
    let current = db::notifications::get_or_create_preferences(&state.db, operator.id).await?;
    let merged = NotificationPreferences {
        new_entry: body.new_entry.unwrap_or(current.new_entry),
        new_provider: body.new_provider.unwrap_or(current.new_provider),
        new_inventory: body.new_inventory.unwrap_or(current.new_inventory),
        new_reexpedicion: body.new_reexpedicion.unwrap_or(current.new_reexpedicion),
    };

    let preferences = db::notifications::update_preferences(&state.db, operator.id, &merged).await?;
    tracing::info!(operator = %operator.name, "Notification preferences updated");
    Ok(Json(preferences))
}

pub fn notification_routes() -> Router<AppState> {
    Router::new().route(
        "/api/notifications",
        get(list_notifications)
            .patch(patch_notifications)
            .put(update_preferences),
    )
}
