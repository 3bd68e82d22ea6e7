//! In-app notifications and per-operator subscription preferences

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event families operators can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    NewEntry,
    NewProvider,
    NewInventory,
    NewReexpedicion,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewEntry => "NEW_ENTRY",
            NotificationKind::NewProvider => "NEW_PROVIDER",
            NotificationKind::NewInventory => "NEW_INVENTORY",
            NotificationKind::NewReexpedicion => "NEW_REEXPEDICION",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NEW_ENTRY" => Some(NotificationKind::NewEntry),
            "NEW_PROVIDER" => Some(NotificationKind::NewProvider),
            "NEW_INVENTORY" => Some(NotificationKind::NewInventory),
            "NEW_REEXPEDICION" => Some(NotificationKind::NewReexpedicion),
            _ => None,
        }
    }

    /// Preference column that gates fan-out for this kind
    pub fn preference_column(&self) -> &'static str {
        match self {
            NotificationKind::NewEntry => "new_entry",
            NotificationKind::NewProvider => "new_provider",
            NotificationKind::NewInventory => "new_inventory",
            NotificationKind::NewReexpedicion => "new_reexpedicion",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub operator_id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Subscription flags, one row per operator, everything on by default
#[derive(Debug, Clone, Copy, Serialize)]
pub struct NotificationPreferences {
    pub new_entry: bool,
    pub new_provider: bool,
    pub new_inventory: bool,
    pub new_reexpedicion: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            new_entry: true,
            new_provider: true,
            new_inventory: true,
            new_reexpedicion: true,
        }
    }
}
