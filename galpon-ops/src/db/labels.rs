//! Barcode label persistence
//!
//! Barcodes are generated server side from the clock plus a random salt
//! and re-rolled on the rare collision, so operators never type one in.

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use galpon_common::time;
use rand::Rng;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{day_bounds, get_ts, get_uuid};
use crate::models::{Label, ProviderLabelCount};

const BARCODE_ATTEMPTS: usize = 8;

/// Optional list filters; the date range is inclusive on both ends
#[derive(Debug, Clone, Default)]
pub struct LabelFilters {
    pub provider_name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

fn generate_barcode() -> String {
    let millis = time::now().timestamp_millis() % 100_000_000;
    let salt: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("LBL{millis:08}{salt:04}")
}

/// Create a label with a freshly generated barcode
pub async fn create_label(
    pool: &SqlitePool,
    provider_name: &str,
    description: &str,
) -> Result<Label> {
    let now = time::now_rfc3339();
    for _ in 0..BARCODE_ATTEMPTS {
        let id = Uuid::new_v4();
        let barcode = generate_barcode();
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO labels (id, barcode, provider_name, description, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&barcode)
        .bind(provider_name)
        .bind(description)
        .bind(&now)
        .execute(pool)
        .await?;

        if result.rows_affected() == 1 {
            return load_label(pool, id)
                .await?
                .ok_or_else(|| anyhow!("label vanished after insert: {id}"));
        }
        // Barcode collision, roll a new one
    }
    Err(anyhow!("could not generate a unique barcode"))
}

pub async fn load_label(pool: &SqlitePool, id: Uuid) -> Result<Option<Label>> {
    let row = sqlx::query(
        "SELECT id, barcode, provider_name, description, created_at FROM labels WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(row_to_label(&row)?)),
        None => Ok(None),
    }
}

/// Newest-first label page matching the filters, plus the filtered total
pub async fn list_labels(
    pool: &SqlitePool,
    filters: &LabelFilters,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Label>, i64)> {
    let (start, end) = day_bounds(filters.start_date, filters.end_date)?;

    let rows = sqlx::query(&format!(
        r#"
        SELECT id, barcode, provider_name, description, created_at
        FROM labels {LABEL_FILTER}
        ORDER BY created_at DESC LIMIT ?4 OFFSET ?5
        "#
    ))
    .bind(&filters.provider_name)
    .bind(&start)
    .bind(&end)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM labels {LABEL_FILTER}"))
        .bind(&filters.provider_name)
        .bind(&start)
        .bind(&end)
        .fetch_one(pool)
        .await?;

    let labels = rows.iter().map(row_to_label).collect::<Result<_>>()?;
    Ok((labels, total))
}

/// Per-provider label counts over the same filtered set the list shows
pub async fn counts_by_provider(
    pool: &SqlitePool,
    filters: &LabelFilters,
) -> Result<Vec<ProviderLabelCount>> {
    let (start, end) = day_bounds(filters.start_date, filters.end_date)?;

    let rows = sqlx::query(&format!(
        r#"
        SELECT provider_name, COUNT(*) AS count
        FROM labels {LABEL_FILTER}
        GROUP BY provider_name ORDER BY provider_name
        "#
    ))
    .bind(&filters.provider_name)
    .bind(&start)
    .bind(&end)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| ProviderLabelCount {
            provider_name: row.get("provider_name"),
            count: row.get("count"),
        })
        .collect())
}

pub async fn delete_label(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM labels WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

const LABEL_FILTER: &str = r#"
    WHERE (?1 IS NULL OR provider_name = ?1)
      AND (?2 IS NULL OR created_at >= ?2)
      AND (?3 IS NULL OR created_at < ?3)
"#;

fn row_to_label(row: &sqlx::sqlite::SqliteRow) -> Result<Label> {
    Ok(Label {
        id: get_uuid(row, "id")?,
        barcode: row.get("barcode"),
        provider_name: row.get("provider_name"),
        description: row.get("description"),
        created_at: get_ts(row, "created_at")?,
    })
}
