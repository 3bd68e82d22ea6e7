//! Returned-merchandise inventory held at warehouse locations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether the counted stock is still on the shelf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryStatus {
    Stored,
    Removed,
}

impl InventoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryStatus::Stored => "STORED",
            InventoryStatus::Removed => "REMOVED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "STORED" => Some(InventoryStatus::Stored),
            "REMOVED" => Some(InventoryStatus::Removed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryItem {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub location_id: Uuid,
    pub quantity: i64,
    pub status: InventoryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inventory row joined with the names clients display
#[derive(Debug, Clone, Serialize)]
pub struct InventoryDetail {
    #[serde(flatten)]
    pub item: InventoryItem,
    pub provider_name: String,
    pub warehouse_name: String,
    pub location_name: String,
}
