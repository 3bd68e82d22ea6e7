//! Provider and truck persistence
//!
//! Both tables carry a UNIQUE name column; creation uses INSERT OR IGNORE
//! and reports a duplicate through `None` instead of racing a lookup.

use anyhow::Result;
use galpon_common::time;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{get_ts, get_uuid};
use crate::models::{Provider, Truck};

pub async fn create_provider(
    pool: &SqlitePool,
    name: &str,
    responsible: Option<&str>,
) -> Result<Option<Provider>> {
    let id = Uuid::new_v4();
    let now = time::now();
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO providers (id, name, responsible, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(name)
    .bind(responsible)
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    Ok(Some(Provider {
        id,
        name: name.to_string(),
        responsible: responsible.map(str::to_string),
        created_at: now,
        updated_at: now,
    }))
}

pub async fn load_provider(pool: &SqlitePool, id: Uuid) -> Result<Option<Provider>> {
    let row = sqlx::query(
        "SELECT id, name, responsible, created_at, updated_at FROM providers WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(row_to_provider(&row)?)),
        None => Ok(None),
    }
}

/// Alphabetical provider page plus the unfiltered total
pub async fn list_providers(
    pool: &SqlitePool,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Provider>, i64)> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, responsible, created_at, updated_at
        FROM providers
        ORDER BY name ASC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM providers")
        .fetch_one(pool)
        .await?;

    let providers = rows.iter().map(row_to_provider).collect::<Result<_>>()?;
    Ok((providers, total))
}

/// Apply a full update; `false` means the name collided with another provider.
///
/// Callers load the row first, so a zero-row OR IGNORE update can only mean
/// the UNIQUE(name) constraint skipped it.
pub async fn update_provider(
    pool: &SqlitePool,
    id: Uuid,
    name: &str,
    responsible: Option<&str>,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE OR IGNORE providers SET name = ?, responsible = ?, updated_at = ? WHERE id = ?",
    )
    .bind(name)
    .bind(responsible)
    .bind(time::now_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_provider(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM providers WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Whether entries, packages, or shipments still reference the provider
pub async fn provider_in_use(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let refs: i64 = sqlx::query_scalar(
        r#"
        SELECT (SELECT COUNT(*) FROM entries WHERE provider_id = ?1)
             + (SELECT COUNT(*) FROM packages WHERE current_provider_id = ?1)
             + (SELECT COUNT(*) FROM shipments WHERE provider_id = ?1)
        "#,
    )
    .bind(id.to_string())
    .fetch_one(pool)
    .await?;
    Ok(refs > 0)
}

pub async fn create_truck(pool: &SqlitePool, license_plate: &str) -> Result<Option<Truck>> {
    let id = Uuid::new_v4();
    let now = time::now();
    let result = sqlx::query(
        "INSERT OR IGNORE INTO trucks (id, license_plate, created_at) VALUES (?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(license_plate)
    .bind(now.to_rfc3339())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    Ok(Some(Truck {
        id,
        license_plate: license_plate.to_string(),
        created_at: now,
    }))
}

pub async fn load_truck(pool: &SqlitePool, id: Uuid) -> Result<Option<Truck>> {
    let row = sqlx::query("SELECT id, license_plate, created_at FROM trucks WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(row_to_truck(&row)?)),
        None => Ok(None),
    }
}

pub async fn list_trucks(pool: &SqlitePool, limit: i64, offset: i64) -> Result<(Vec<Truck>, i64)> {
    let rows = sqlx::query(
        r#"
        SELECT id, license_plate, created_at
        FROM trucks
        ORDER BY license_plate ASC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trucks")
        .fetch_one(pool)
        .await?;

    let trucks = rows.iter().map(row_to_truck).collect::<Result<_>>()?;
    Ok((trucks, total))
}

/// Apply a plate change; `false` means the plate collided with another truck
pub async fn update_truck(pool: &SqlitePool, id: Uuid, license_plate: &str) -> Result<bool> {
    let result = sqlx::query("UPDATE OR IGNORE trucks SET license_plate = ? WHERE id = ?")
        .bind(license_plate)
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_truck(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM trucks WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn truck_in_use(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let refs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries WHERE truck_id = ?")
        .bind(id.to_string())
        .fetch_one(pool)
        .await?;
    Ok(refs > 0)
}

pub(crate) fn row_to_provider(row: &sqlx::sqlite::SqliteRow) -> Result<Provider> {
    Ok(Provider {
        id: get_uuid(row, "id")?,
        name: row.get("name"),
        responsible: row.get("responsible"),
        created_at: get_ts(row, "created_at")?,
        updated_at: get_ts(row, "updated_at")?,
    })
}

pub(crate) fn row_to_truck(row: &sqlx::sqlite::SqliteRow) -> Result<Truck> {
    Ok(Truck {
        id: get_uuid(row, "id")?,
        license_plate: row.get("license_plate"),
        created_at: get_ts(row, "created_at")?,
    })
}
