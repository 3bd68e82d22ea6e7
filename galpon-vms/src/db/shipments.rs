//! Shipment persistence and lifecycle transitions

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use galpon_common::time;
use galpon_common::ProviderScope;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{Shipment, ShipmentStatus};

/// Shipment with its provider name and sheet/scan counts, for list views
#[derive(Debug, Clone, serde::Serialize)]
pub struct ShipmentListRow {
    #[serde(flatten)]
    pub shipment: Shipment,
    pub provider_name: String,
    pub pre_alerta_count: i64,
    pub pre_ruteo_count: i64,
    pub scanned_count: i64,
}

/// Outcome of a lifecycle transition attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied,
    NotFound,
    Illegal { from: ShipmentStatus },
}

pub async fn create_shipment(
    pool: &SqlitePool,
    provider_id: Uuid,
    shipment_date: &str,
    created_by: &str,
) -> Result<Shipment> {
    let id = Uuid::new_v4();
    let now = time::now();
    sqlx::query(
        r#"
        INSERT INTO shipments (id, provider_id, shipment_date, status, created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(provider_id.to_string())
    .bind(shipment_date)
    .bind(ShipmentStatus::PreAlerta.as_str())
    .bind(created_by)
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(Shipment {
        id,
        provider_id,
        shipment_date: shipment_date.to_string(),
        status: ShipmentStatus::PreAlerta,
        created_by: created_by.to_string(),
        created_at: now,
        updated_at: now,
        finalized_at: None,
    })
}

/// Check the referenced provider exists before creating a shipment
pub async fn provider_exists(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let row = sqlx::query("SELECT 1 FROM providers WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

pub async fn load_shipment(pool: &SqlitePool, id: Uuid) -> Result<Option<Shipment>> {
    let row = sqlx::query(
        r#"
        SELECT id, provider_id, shipment_date, status, created_by, created_at, updated_at, finalized_at
        FROM shipments
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(row_to_shipment(&row)?)),
        None => Ok(None),
    }
}

/// Load, validate, and apply a lifecycle transition
///
/// The UPDATE is guarded by the current status, so a transition racing with
/// another request cannot apply twice; the loser reports `Illegal`.
pub async fn transition_shipment(
    pool: &SqlitePool,
    id: Uuid,
    next: ShipmentStatus,
) -> Result<TransitionOutcome> {
    let shipment = match load_shipment(pool, id).await? {
        Some(s) => s,
        None => return Ok(TransitionOutcome::NotFound),
    };
    if !shipment.status.can_transition_to(next) {
        return Ok(TransitionOutcome::Illegal {
            from: shipment.status,
        });
    }

    let now = time::now_rfc3339();
    let finalized_at = next.is_terminal().then(|| now.clone());
    let result = sqlx::query(
        r#"
        UPDATE shipments
        SET status = ?, updated_at = ?, finalized_at = COALESCE(?, finalized_at)
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(next.as_str())
    .bind(&now)
    .bind(&finalized_at)
    .bind(id.to_string())
    .bind(shipment.status.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(TransitionOutcome::Illegal {
            from: shipment.status,
        });
    }
    Ok(TransitionOutcome::Applied)
}

pub async fn delete_shipment(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM shipments WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Provider-scoped shipment list, newest first
pub async fn list_shipments(
    pool: &SqlitePool,
    scope: &ProviderScope,
) -> Result<Vec<ShipmentListRow>> {
    let provider = scope.filter().map(|p| p.to_string());
    let rows = sqlx::query(&format!(
        "{LIST_SELECT} WHERE (?1 IS NULL OR s.provider_id = ?1) ORDER BY s.created_at DESC"
    ))
    .bind(&provider)
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_list_row).collect()
}

/// Unfinished shipments for one provider created inside the active window
pub async fn list_active_shipments(
    pool: &SqlitePool,
    provider_id: Uuid,
    window_hours: i64,
) -> Result<Vec<ShipmentListRow>> {
    let cutoff = (time::now() - Duration::hours(window_hours)).to_rfc3339();
    let rows = sqlx::query(&format!(
        "{LIST_SELECT} \
         WHERE s.provider_id = ?1 AND s.status != ?2 AND s.created_at >= ?3 \
         ORDER BY s.created_at DESC"
    ))
    .bind(provider_id.to_string())
    .bind(ShipmentStatus::Finalizado.as_str())
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_list_row).collect()
}

const LIST_SELECT: &str = r#"
    SELECT s.id, s.provider_id, s.shipment_date, s.status, s.created_by,
           s.created_at, s.updated_at, s.finalized_at,
           p.name AS provider_name,
           (SELECT COUNT(*) FROM pre_alerta_records r WHERE r.shipment_id = s.id) AS pre_alerta_count,
           (SELECT COUNT(*) FROM pre_ruteo_records r WHERE r.shipment_id = s.id) AS pre_ruteo_count,
           (SELECT COUNT(*) FROM scanned_packages r WHERE r.shipment_id = s.id) AS scanned_count
    FROM shipments s
    JOIN providers p ON p.id = s.provider_id
"#;

fn row_to_list_row(row: &sqlx::sqlite::SqliteRow) -> Result<ShipmentListRow> {
    Ok(ShipmentListRow {
        shipment: row_to_shipment(row)?,
        provider_name: row.get("provider_name"),
        pre_alerta_count: row.get("pre_alerta_count"),
        pre_ruteo_count: row.get("pre_ruteo_count"),
        scanned_count: row.get("scanned_count"),
    })
}

pub(crate) fn row_to_shipment(row: &sqlx::sqlite::SqliteRow) -> Result<Shipment> {
    let id: String = row.get("id");
    let provider_id: String = row.get("provider_id");
    let status: String = row.get("status");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");
    let finalized_at: Option<String> = row.get("finalized_at");

    Ok(Shipment {
        id: Uuid::parse_str(&id)?,
        provider_id: Uuid::parse_str(&provider_id)?,
        shipment_date: row.get("shipment_date"),
        status: ShipmentStatus::parse(&status)
            .ok_or_else(|| anyhow!("unknown shipment status: {status}"))?,
        created_by: row.get("created_by"),
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
        finalized_at: finalized_at.as_deref().map(parse_ts).transpose()?,
    })
}

pub(crate) fn parse_ts(value: &str) -> Result<DateTime<Utc>> {
    time::parse_rfc3339(value).ok_or_else(|| anyhow!("invalid timestamp in database: {value}"))
}
