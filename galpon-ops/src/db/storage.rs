//! Warehouse and location persistence, including the contents check that
//! guards location deletion

use anyhow::Result;
use galpon_common::time;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{get_ts, get_uuid};
use crate::models::{
    Location, LocationContents, LocationWithWarehouse, Warehouse, WarehouseDetail,
};

pub async fn create_warehouse(
    pool: &SqlitePool,
    name: &str,
    address: Option<&str>,
    description: Option<&str>,
) -> Result<Warehouse> {
    let id = Uuid::new_v4();
    let now = time::now();
    sqlx::query(
        r#"
        INSERT INTO warehouses (id, name, address, description, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(name)
    .bind(address)
    .bind(description)
    .bind(now.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(Warehouse {
        id,
        name: name.to_string(),
        address: address.map(str::to_string),
        description: description.map(str::to_string),
        created_at: now,
    })
}

pub async fn load_warehouse(pool: &SqlitePool, id: Uuid) -> Result<Option<Warehouse>> {
    let row = sqlx::query(
        "SELECT id, name, address, description, created_at FROM warehouses WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(row_to_warehouse(&row)?)),
        None => Ok(None),
    }
}

/// Warehouse with all its locations, for the detail view
pub async fn load_warehouse_detail(pool: &SqlitePool, id: Uuid) -> Result<Option<WarehouseDetail>> {
    let warehouse = match load_warehouse(pool, id).await? {
        Some(w) => w,
        None => return Ok(None),
    };

    let rows = sqlx::query(
        r#"
        SELECT id, warehouse_id, name, description, created_at
        FROM locations
        WHERE warehouse_id = ?
        ORDER BY name ASC
        "#,
    )
    .bind(id.to_string())
    .fetch_all(pool)
    .await?;

    let locations = rows.iter().map(row_to_location).collect::<Result<_>>()?;
    Ok(Some(WarehouseDetail {
        warehouse,
        locations,
    }))
}

pub async fn list_warehouses(
    pool: &SqlitePool,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Warehouse>, i64)> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, address, description, created_at
        FROM warehouses
        ORDER BY name ASC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM warehouses")
        .fetch_one(pool)
        .await?;

    let warehouses = rows.iter().map(row_to_warehouse).collect::<Result<_>>()?;
    Ok((warehouses, total))
}

pub async fn update_warehouse(
    pool: &SqlitePool,
    id: Uuid,
    name: &str,
    address: Option<&str>,
    description: Option<&str>,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE warehouses SET name = ?, address = ?, description = ? WHERE id = ?",
    )
    .bind(name)
    .bind(address)
    .bind(description)
    .bind(id.to_string())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_warehouse(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM warehouses WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn warehouse_has_locations(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM locations WHERE warehouse_id = ?")
        .bind(id.to_string())
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

pub async fn create_location(
    pool: &SqlitePool,
    warehouse_id: Uuid,
    name: &str,
    description: Option<&str>,
) -> Result<Location> {
    let id = Uuid::new_v4();
    let now = time::now();
    sqlx::query(
        r#"
        INSERT INTO locations (id, warehouse_id, name, description, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(warehouse_id.to_string())
    .bind(name)
    .bind(description)
    .bind(now.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(Location {
        id,
        warehouse_id,
        name: name.to_string(),
        description: description.map(str::to_string),
        created_at: now,
    })
}

pub async fn load_location(pool: &SqlitePool, id: Uuid) -> Result<Option<LocationWithWarehouse>> {
    let row = sqlx::query(&format!("{LOCATION_SELECT} WHERE l.id = ?"))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(row_to_location_with_warehouse(&row)?)),
        None => Ok(None),
    }
}

/// Newest-first location page, optionally restricted to one warehouse
pub async fn list_locations(
    pool: &SqlitePool,
    warehouse_id: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<LocationWithWarehouse>, i64)> {
    let filter = warehouse_id.map(|id| id.to_string());
    let rows = sqlx::query(&format!(
        "{LOCATION_SELECT} \
         WHERE (?1 IS NULL OR l.warehouse_id = ?1) \
         ORDER BY l.created_at DESC LIMIT ?2 OFFSET ?3"
    ))
    .bind(&filter)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM locations WHERE (?1 IS NULL OR warehouse_id = ?1)",
    )
    .bind(&filter)
    .fetch_one(pool)
    .await?;

    let locations = rows
        .iter()
        .map(row_to_location_with_warehouse)
        .collect::<Result<_>>()?;
    Ok((locations, total))
}

pub async fn update_location(
    pool: &SqlitePool,
    id: Uuid,
    warehouse_id: Uuid,
    name: &str,
    description: Option<&str>,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE locations SET warehouse_id = ?, name = ?, description = ? WHERE id = ?",
    )
    .bind(warehouse_id.to_string())
    .bind(name)
    .bind(description)
    .bind(id.to_string())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_location(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM locations WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Count what currently occupies a location: stored inventory, packages in a
/// non-delivered status, and INGRESO movimientos that still hold etiquetas.
pub async fn location_contents(pool: &SqlitePool, id: Uuid) -> Result<LocationContents> {
    let row = sqlx::query(
        r#"
        SELECT
            (SELECT COUNT(*) FROM inventory_items
             WHERE location_id = ?1 AND status = 'STORED') AS inventory_count,
            (SELECT COUNT(*) FROM packages
             WHERE current_location_id = ?1
               AND status IN ('INGRESADO', 'ALMACENADO', 'EN_TRASPASO')) AS packages_count,
            (SELECT COUNT(*) FROM reexpedicion_movimientos
             WHERE location_id = ?1 AND tipo = 'INGRESO'
               AND estado IN ('ACTIVO', 'EGRESADO_PARCIAL')) AS reexpedicion_count
        "#,
    )
    .bind(id.to_string())
    .fetch_one(pool)
    .await?;

    Ok(LocationContents {
        inventory_count: row.get("inventory_count"),
        packages_count: row.get("packages_count"),
        reexpedicion_count: row.get("reexpedicion_count"),
    })
}

const LOCATION_SELECT: &str = r#"
    SELECT l.id, l.warehouse_id, l.name, l.description, l.created_at,
           w.id AS w_id, w.name AS w_name, w.address AS w_address,
           w.description AS w_description, w.created_at AS w_created_at
    FROM locations l
    JOIN warehouses w ON w.id = l.warehouse_id
"#;

pub(crate) fn row_to_warehouse(row: &sqlx::sqlite::SqliteRow) -> Result<Warehouse> {
    Ok(Warehouse {
        id: get_uuid(row, "id")?,
        name: row.get("name"),
        address: row.get("address"),
        description: row.get("description"),
        created_at: get_ts(row, "created_at")?,
    })
}

pub(crate) fn row_to_location(row: &sqlx::sqlite::SqliteRow) -> Result<Location> {
    Ok(Location {
        id: get_uuid(row, "id")?,
        warehouse_id: get_uuid(row, "warehouse_id")?,
        name: row.get("name"),
        description: row.get("description"),
        created_at: get_ts(row, "created_at")?,
    })
}

fn row_to_location_with_warehouse(row: &sqlx::sqlite::SqliteRow) -> Result<LocationWithWarehouse> {
    Ok(LocationWithWarehouse {
        location: row_to_location(row)?,
        warehouse: Warehouse {
            id: get_uuid(row, "w_id")?,
            name: row.get("w_name"),
            address: row.get("w_address"),
            description: row.get("w_description"),
            created_at: get_ts(row, "w_created_at")?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use galpon_common::db::init_memory_database;

    async fn seeded() -> (SqlitePool, Warehouse, Location) {
        let pool = init_memory_database().await.unwrap();
        let warehouse = create_warehouse(&pool, "Galpón Norte", Some("Ruta 8 km 30"), None)
            .await
            .unwrap();
        let location = create_location(&pool, warehouse.id, "Estante A1", None)
            .await
            .unwrap();
        (pool, warehouse, location)
    }

    #[tokio::test]
    async fn test_warehouse_detail_includes_locations() {
        let (pool, warehouse, location) = seeded().await;
        create_location(&pool, warehouse.id, "Estante A2", Some("altillo"))
            .await
            .unwrap();

        let detail = load_warehouse_detail(&pool, warehouse.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detail.locations.len(), 2);
        assert_eq!(detail.locations[0].name, "Estante A1");
        assert_eq!(detail.locations[0].id, location.id);
    }

    #[tokio::test]
    async fn test_location_list_filters_by_warehouse() {
        let (pool, warehouse, _) = seeded().await;
        let other = create_warehouse(&pool, "Galpón Sur", None, None).await.unwrap();
        create_location(&pool, other.id, "Piso B", None).await.unwrap();

        let (all, total) = list_locations(&pool, None, 50, 0).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(all.len(), 2);

        let (scoped, scoped_total) = list_locations(&pool, Some(warehouse.id), 50, 0)
            .await
            .unwrap();
        assert_eq!(scoped_total, 1);
        assert_eq!(scoped[0].warehouse.name, "Galpón Norte");
    }

    #[tokio::test]
    async fn test_empty_location_reports_no_contents() {
        let (pool, _, location) = seeded().await;

        let contents = location_contents(&pool, location.id).await.unwrap();
        assert!(!contents.has_contents());
        assert_eq!(contents.total(), 0);
    }

    #[tokio::test]
    async fn test_warehouse_with_locations_detected() {
        let (pool, warehouse, location) = seeded().await;
        assert!(warehouse_has_locations(&pool, warehouse.id).await.unwrap());

        assert!(delete_location(&pool, location.id).await.unwrap());
        assert!(!warehouse_has_locations(&pool, warehouse.id).await.unwrap());
        assert!(delete_warehouse(&pool, warehouse.id).await.unwrap());
    }
}
