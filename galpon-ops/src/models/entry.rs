//! Gate entry rows
//!
//! An entry records one truck visit. The ISO week and calendar month are
//! stamped when the row is written so the dashboards group by plain integer
//! columns, and the duration is derived once both timestamps are known.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::catalog::{Provider, Truck};

#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub truck_id: Uuid,
    pub arrival_time: Option<DateTime<Utc>>,
    pub departure_time: Option<DateTime<Utc>>,
    pub week: i64,
    pub month: i64,
    pub duration_minutes: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Entry with its provider and truck, the shape list and detail views return
#[derive(Debug, Clone, Serialize)]
pub struct EntryWithRefs {
    #[serde(flatten)]
    pub entry: Entry,
    pub provider: Provider,
    pub truck: Truck,
}
