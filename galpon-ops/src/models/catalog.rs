//! Master data rows: providers, trucks, warehouses, locations

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Courier company whose freight moves through the warehouse
#[derive(Debug, Clone, Serialize)]
pub struct Provider {
    pub id: Uuid,
    pub name: String,
    pub responsible: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Truck {
    pub id: Uuid,
    pub license_plate: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Warehouse {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Warehouse with its locations, for detail views
#[derive(Debug, Clone, Serialize)]
pub struct WarehouseDetail {
    #[serde(flatten)]
    pub warehouse: Warehouse,
    pub locations: Vec<Location>,
}

/// Named slot inside a warehouse (shelf, bay, staging area)
#[derive(Debug, Clone, Serialize)]
pub struct Location {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationWithWarehouse {
    #[serde(flatten)]
    pub location: Location,
    pub warehouse: Warehouse,
}

/// What a location currently holds, used to guard deletion
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LocationContents {
    pub inventory_count: i64,
    pub packages_count: i64,
    pub reexpedicion_count: i64,
}

impl LocationContents {
    pub fn total(&self) -> i64 {
        self.inventory_count + self.packages_count + self.reexpedicion_count
    }

    pub fn has_contents(&self) -> bool {
        self.total() > 0
    }
}
