//! Printable routing labels

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Providers labels may be printed for
pub const LABEL_PROVIDERS: [&str; 2] = ["Urbano", "Ocasa"];

/// A printed label with its server-generated barcode
#[derive(Debug, Clone, Serialize)]
pub struct Label {
    pub id: Uuid,
    pub barcode: String,
    pub provider_name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Per-provider label count shown next to the filtered list
#[derive(Debug, Clone, Serialize)]
pub struct ProviderLabelCount {
    pub provider_name: String,
    pub count: i64,
}
