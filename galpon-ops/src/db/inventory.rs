//! Inventory item persistence
//!
//! Rows come back joined with provider, warehouse, and location names; the
//! NEW_INVENTORY notification message is built from the same detail row.

use anyhow::{anyhow, Result};
use galpon_common::time;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{get_ts, get_uuid};
use crate::models::{InventoryDetail, InventoryItem, InventoryStatus};

pub async fn create_inventory(
    pool: &SqlitePool,
    entry_id: Uuid,
    location_id: Uuid,
    quantity: i64,
    status: InventoryStatus,
) -> Result<InventoryDetail> {
    let id = Uuid::new_v4();
    let now = time::now_rfc3339();
    sqlx::query(
        r#"
        INSERT INTO inventory_items
            (id, entry_id, location_id, quantity, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(entry_id.to_string())
    .bind(location_id.to_string())
    .bind(quantity)
    .bind(status.as_str())
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    load_inventory(pool, id)
        .await?
        .ok_or_else(|| anyhow!("inventory row vanished after insert: {id}"))
}

pub async fn load_inventory(pool: &SqlitePool, id: Uuid) -> Result<Option<InventoryDetail>> {
    let row = sqlx::query(&format!("{INVENTORY_SELECT} WHERE i.id = ?"))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(row_to_detail(&row)?)),
        None => Ok(None),
    }
}

/// Newest-first inventory page, optionally scoped to a location or entry
pub async fn list_inventory(
    pool: &SqlitePool,
    location_id: Option<Uuid>,
    entry_id: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<InventoryDetail>, i64)> {
    let location = location_id.map(|id| id.to_string());
    let entry = entry_id.map(|id| id.to_string());

    let rows = sqlx::query(&format!(
        "{INVENTORY_SELECT} \
         WHERE (?1 IS NULL OR i.location_id = ?1) AND (?2 IS NULL OR i.entry_id = ?2) \
         ORDER BY i.created_at DESC LIMIT ?3 OFFSET ?4"
    ))
    .bind(&location)
    .bind(&entry)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM inventory_items i
        WHERE (?1 IS NULL OR i.location_id = ?1) AND (?2 IS NULL OR i.entry_id = ?2)
        "#,
    )
    .bind(&location)
    .bind(&entry)
    .fetch_one(pool)
    .await?;

    let items = rows.iter().map(row_to_detail).collect::<Result<_>>()?;
    Ok((items, total))
}

pub async fn update_inventory(
    pool: &SqlitePool,
    id: Uuid,
    entry_id: Uuid,
    location_id: Uuid,
    quantity: i64,
    status: InventoryStatus,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE inventory_items
        SET entry_id = ?, location_id = ?, quantity = ?, status = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(entry_id.to_string())
    .bind(location_id.to_string())
    .bind(quantity)
    .bind(status.as_str())
    .bind(time::now_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_inventory(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM inventory_items WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

const INVENTORY_SELECT: &str = r#"
    SELECT i.id, i.entry_id, i.location_id, i.quantity, i.status,
           i.created_at, i.updated_at,
           p.name AS provider_name, w.name AS warehouse_name, l.name AS location_name
    FROM inventory_items i
    JOIN entries e ON e.id = i.entry_id
    JOIN providers p ON p.id = e.provider_id
    JOIN locations l ON l.id = i.location_id
    JOIN warehouses w ON w.id = l.warehouse_id
"#;

fn row_to_detail(row: &sqlx::sqlite::SqliteRow) -> Result<InventoryDetail> {
    let status: String = row.get("status");
    Ok(InventoryDetail {
        item: InventoryItem {
            id: get_uuid(row, "id")?,
            entry_id: get_uuid(row, "entry_id")?,
            location_id: get_uuid(row, "location_id")?,
            quantity: row.get("quantity"),
            status: InventoryStatus::parse(&status)
                .ok_or_else(|| anyhow!("unknown inventory status: {status}"))?,
            created_at: get_ts(row, "created_at")?,
            updated_at: get_ts(row, "updated_at")?,
        },
        provider_name: row.get("provider_name"),
        warehouse_name: row.get("warehouse_name"),
        location_name: row.get("location_name"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::catalog::{create_provider, create_truck};
    use crate::db::entries::create_entry;
    use crate::db::storage::{create_location, create_warehouse};
    use galpon_common::db::init_memory_database;

    async fn seeded() -> (SqlitePool, Uuid, Uuid) {
        let pool = init_memory_database().await.unwrap();
        let provider = create_provider(&pool, "Urbano", None).await.unwrap().unwrap();
        let truck = create_truck(&pool, "AB123CD").await.unwrap().unwrap();
        let entry = create_entry(&pool, provider.id, truck.id, None, None)
            .await
            .unwrap();
        let warehouse = create_warehouse(&pool, "Galpón Norte", None, None)
            .await
            .unwrap();
        let location = create_location(&pool, warehouse.id, "Estante A1", None)
            .await
            .unwrap();
        (pool, entry.id, location.id)
    }

    #[tokio::test]
    async fn test_create_resolves_display_names() {
        let (pool, entry_id, location_id) = seeded().await;

        let detail = create_inventory(&pool, entry_id, location_id, 12, InventoryStatus::Stored)
            .await
            .unwrap();
        assert_eq!(detail.provider_name, "Urbano");
        assert_eq!(detail.warehouse_name, "Galpón Norte");
        assert_eq!(detail.location_name, "Estante A1");
        assert_eq!(detail.item.quantity, 12);
        assert_eq!(detail.item.status, InventoryStatus::Stored);
    }

    #[tokio::test]
    async fn test_list_filters_by_location() {
        let (pool, entry_id, location_id) = seeded().await;
        let warehouse = create_warehouse(&pool, "Galpón Sur", None, None).await.unwrap();
        let other_location = create_location(&pool, warehouse.id, "Piso B", None)
            .await
            .unwrap();

        create_inventory(&pool, entry_id, location_id, 5, InventoryStatus::Stored)
            .await
            .unwrap();
        create_inventory(&pool, entry_id, other_location.id, 7, InventoryStatus::Stored)
            .await
            .unwrap();

        let (all, total) = list_inventory(&pool, None, None, 50, 0).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(all.len(), 2);

        let (scoped, scoped_total) = list_inventory(&pool, Some(location_id), None, 50, 0)
            .await
            .unwrap();
        assert_eq!(scoped_total, 1);
        assert_eq!(scoped[0].item.quantity, 5);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (pool, entry_id, location_id) = seeded().await;
        let detail = create_inventory(&pool, entry_id, location_id, 5, InventoryStatus::Stored)
            .await
            .unwrap();

        assert!(update_inventory(
            &pool,
            detail.item.id,
            entry_id,
            location_id,
            0,
            InventoryStatus::Removed
        )
        .await
        .unwrap());

        let reloaded = load_inventory(&pool, detail.item.id).await.unwrap().unwrap();
        assert_eq!(reloaded.item.quantity, 0);
        assert_eq!(reloaded.item.status, InventoryStatus::Removed);

        assert!(delete_inventory(&pool, detail.item.id).await.unwrap());
        assert!(load_inventory(&pool, detail.item.id).await.unwrap().is_none());
    }
}
