//! Package persistence and movement history
//!
//! Deliver and transfer run inside a transaction with a status-guarded
//! UPDATE, so two stations racing over the same package cannot both record
//! the change; the loser observes zero rows and reports AlreadyDelivered.

use anyhow::{anyhow, Result};
use galpon_common::time;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{get_opt_uuid, get_ts, get_uuid};
use crate::models::{
    MovementAction, MovementDetail, Package, PackageDetail, PackageMovement, PackageStatus,
};

/// Optional list filters, all combined with AND
#[derive(Debug, Clone, Default)]
pub struct PackageFilters {
    /// Case-insensitive tracking number substring
    pub tracking: Option<String>,
    pub provider_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub status: Option<PackageStatus>,
}

/// Outcome of a deliver or transfer attempt
#[derive(Debug)]
pub enum PackageOutcome {
    Applied(Box<PackageDetail>),
    NotFound,
    AlreadyDelivered,
}

/// Create a package and its INGRESO movement; `None` means the tracking
/// number already exists.
pub async fn create_package(
    pool: &SqlitePool,
    tracking_number: &str,
    provider_id: Option<Uuid>,
    location_id: Option<Uuid>,
    notes: Option<&str>,
) -> Result<Option<PackageDetail>> {
    let id = Uuid::new_v4();
    let now = time::now_rfc3339();

    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO packages
            (id, tracking_number, current_provider_id, current_location_id,
             status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(tracking_number)
    .bind(provider_id.map(|u| u.to_string()))
    .bind(location_id.map(|u| u.to_string()))
    .bind(PackageStatus::Ingresado.as_str())
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    sqlx::query(
        r#"
        INSERT INTO package_movements
            (id, package_id, action, to_provider_id, to_location_id, notes, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(id.to_string())
    .bind(MovementAction::Ingreso.as_str())
    .bind(provider_id.map(|u| u.to_string()))
    .bind(location_id.map(|u| u.to_string()))
    .bind(notes)
    .bind(&now)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    let detail = load_package(pool, &id.to_string())
        .await?
        .ok_or_else(|| anyhow!("package vanished after insert: {id}"))?;
    Ok(Some(detail))
}

/// Look a package up by row id or tracking number
pub async fn load_package(pool: &SqlitePool, key: &str) -> Result<Option<PackageDetail>> {
    let row = sqlx::query(&format!(
        "{PACKAGE_SELECT} WHERE p.id = ?1 OR p.tracking_number = ?1"
    ))
    .bind(key)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(row_to_detail(&row)?)),
        None => Ok(None),
    }
}

/// Newest-first package page matching the filters, plus the filtered total
pub async fn list_packages(
    pool: &SqlitePool,
    filters: &PackageFilters,
    limit: i64,
    offset: i64,
) -> Result<(Vec<PackageDetail>, i64)> {
    let provider = filters.provider_id.map(|id| id.to_string());
    let location = filters.location_id.map(|id| id.to_string());
    let status = filters.status.map(|s| s.as_str());

    let rows = sqlx::query(&format!(
        "{PACKAGE_SELECT} {PACKAGE_FILTER} ORDER BY p.created_at DESC LIMIT ?5 OFFSET ?6"
    ))
    .bind(&filters.tracking)
    .bind(&provider)
    .bind(&location)
    .bind(status)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 =
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM packages p {PACKAGE_FILTER}"))
            .bind(&filters.tracking)
            .bind(&provider)
            .bind(&location)
            .bind(status)
            .fetch_one(pool)
            .await?;

    let packages = rows.iter().map(row_to_detail).collect::<Result<_>>()?;
    Ok((packages, total))
}

/// Mark a package delivered and record the SALIDA movement
pub async fn deliver_package(
    pool: &SqlitePool,
    key: &str,
    notes: Option<&str>,
) -> Result<PackageOutcome> {
    let pkg = match load_package(pool, key).await? {
        Some(p) => p,
        None => return Ok(PackageOutcome::NotFound),
    };
    if pkg.package.status == PackageStatus::Entregado {
        return Ok(PackageOutcome::AlreadyDelivered);
    }

    let now = time::now_rfc3339();
    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        "UPDATE packages SET status = ?, updated_at = ? WHERE id = ? AND status != ?",
    )
    .bind(PackageStatus::Entregado.as_str())
    .bind(&now)
    .bind(pkg.package.id.to_string())
    .bind(PackageStatus::Entregado.as_str())
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        // Lost the race to a concurrent deliver
        return Ok(PackageOutcome::AlreadyDelivered);
    }

    sqlx::query(
        r#"
        INSERT INTO package_movements
            (id, package_id, action, from_provider_id, from_location_id, notes, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(pkg.package.id.to_string())
    .bind(MovementAction::Salida.as_str())
    .bind(pkg.package.current_provider_id.map(|u| u.to_string()))
    .bind(pkg.package.current_location_id.map(|u| u.to_string()))
    .bind(notes)
    .bind(&now)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    let detail = load_package(pool, &pkg.package.id.to_string())
        .await?
        .ok_or_else(|| anyhow!("package vanished mid-deliver: {}", pkg.package.id))?;
    Ok(PackageOutcome::Applied(Box::new(detail)))
}

/// Hand a package to another provider/location and record the TRASPASO
pub async fn transfer_package(
    pool: &SqlitePool,
    key: &str,
    to_provider_id: Option<Uuid>,
    to_location_id: Option<Uuid>,
    notes: Option<&str>,
) -> Result<PackageOutcome> {
    let pkg = match load_package(pool, key).await? {
        Some(p) => p,
        None => return Ok(PackageOutcome::NotFound),
    };
    if pkg.package.status == PackageStatus::Entregado {
        return Ok(PackageOutcome::AlreadyDelivered);
    }

    let now = time::now_rfc3339();
    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        r#"
        UPDATE packages
        SET current_provider_id = ?, current_location_id = ?, status = ?, updated_at = ?
        WHERE id = ? AND status != ?
        "#,
    )
    .bind(to_provider_id.map(|u| u.to_string()))
    .bind(to_location_id.map(|u| u.to_string()))
    .bind(PackageStatus::EnTraspaso.as_str())
    .bind(&now)
    .bind(pkg.package.id.to_string())
    .bind(PackageStatus::Entregado.as_str())
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(PackageOutcome::AlreadyDelivered);
    }

    sqlx::query(
        r#"
        INSERT INTO package_movements
            (id, package_id, action, from_provider_id, to_provider_id,
             from_location_id, to_location_id, notes, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(pkg.package.id.to_string())
    .bind(MovementAction::Traspaso.as_str())
    .bind(pkg.package.current_provider_id.map(|u| u.to_string()))
    .bind(to_provider_id.map(|u| u.to_string()))
    .bind(pkg.package.current_location_id.map(|u| u.to_string()))
    .bind(to_location_id.map(|u| u.to_string()))
    .bind(notes)
    .bind(&now)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    let detail = load_package(pool, &pkg.package.id.to_string())
        .await?
        .ok_or_else(|| anyhow!("package vanished mid-transfer: {}", pkg.package.id))?;
    Ok(PackageOutcome::Applied(Box::new(detail)))
}

/// Movement history for one package, newest first
pub async fn list_movements(pool: &SqlitePool, package_id: Uuid) -> Result<Vec<MovementDetail>> {
    let rows = sqlx::query(
        r#"
        SELECT m.id, m.package_id, m.action, m.from_provider_id, m.to_provider_id,
               m.from_location_id, m.to_location_id, m.notes, m.created_at,
               fp.name AS from_provider_name, tp.name AS to_provider_name,
               fl.name AS from_location_name, tl.name AS to_location_name
        FROM package_movements m
        LEFT JOIN providers fp ON fp.id = m.from_provider_id
        LEFT JOIN providers tp ON tp.id = m.to_provider_id
        LEFT JOIN locations fl ON fl.id = m.from_location_id
        LEFT JOIN locations tl ON tl.id = m.to_location_id
        WHERE m.package_id = ?
        ORDER BY m.created_at DESC, m.rowid DESC
        "#,
    )
    .bind(package_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_movement).collect()
}

const PACKAGE_SELECT: &str = r#"
    SELECT p.id, p.tracking_number, p.current_provider_id, p.current_location_id,
           p.status, p.created_at, p.updated_at,
           pr.name AS provider_name, l.name AS location_name, w.name AS warehouse_name
    FROM packages p
    LEFT JOIN providers pr ON pr.id = p.current_provider_id
    LEFT JOIN locations l ON l.id = p.current_location_id
    LEFT JOIN warehouses w ON w.id = l.warehouse_id
"#;

const PACKAGE_FILTER: &str = r#"
    WHERE (?1 IS NULL OR p.tracking_number LIKE '%' || ?1 || '%')
      AND (?2 IS NULL OR p.current_provider_id = ?2)
      AND (?3 IS NULL OR p.current_location_id = ?3)
      AND (?4 IS NULL OR p.status = ?4)
"#;

fn row_to_detail(row: &sqlx::sqlite::SqliteRow) -> Result<PackageDetail> {
    let status: String = row.get("status");
    Ok(PackageDetail {
        package: Package {
            id: get_uuid(row, "id")?,
            tracking_number: row.get("tracking_number"),
            current_provider_id: get_opt_uuid(row, "current_provider_id")?,
            current_location_id: get_opt_uuid(row, "current_location_id")?,
            status: PackageStatus::parse(&status)
                .ok_or_else(|| anyhow!("unknown package status: {status}"))?,
            created_at: get_ts(row, "created_at")?,
            updated_at: get_ts(row, "updated_at")?,
        },
        provider_name: row.get("provider_name"),
        warehouse_name: row.get("warehouse_name"),
        location_name: row.get("location_name"),
    })
}

fn row_to_movement(row: &sqlx::sqlite::SqliteRow) -> Result<MovementDetail> {
    let action: String = row.get("action");
    Ok(MovementDetail {
        movement: PackageMovement {
            id: get_uuid(row, "id")?,
            package_id: get_uuid(row, "package_id")?,
            action: MovementAction::parse(&action)
                .ok_or_else(|| anyhow!("unknown movement action: {action}"))?,
            from_provider_id: get_opt_uuid(row, "from_provider_id")?,
            to_provider_id: get_opt_uuid(row, "to_provider_id")?,
            from_location_id: get_opt_uuid(row, "from_location_id")?,
            to_location_id: get_opt_uuid(row, "to_location_id")?,
            notes: row.get("notes"),
            created_at: get_ts(row, "created_at")?,
        },
        from_provider_name: row.get("from_provider_name"),
        to_provider_name: row.get("to_provider_name"),
        from_location_name: row.get("from_location_name"),
        to_location_name: row.get("to_location_name"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::catalog::create_provider;
    use crate::db::storage::{create_location, create_warehouse};
    use galpon_common::db::init_memory_database;

    async fn seeded() -> (SqlitePool, Uuid, Uuid) {
        let pool = init_memory_database().await.unwrap();
        let provider = create_provider(&pool, "Urbano", None).await.unwrap().unwrap();
        let warehouse = create_warehouse(&pool, "Galpón Norte", None, None)
            .await
            .unwrap();
        let location = create_location(&pool, warehouse.id, "Estante A1", None)
            .await
            .unwrap();
        (pool, provider.id, location.id)
    }

    #[tokio::test]
    async fn test_create_records_ingreso_movement() {
        let (pool, provider_id, location_id) = seeded().await;

        let detail = create_package(&pool, "AR001", Some(provider_id), Some(location_id), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detail.package.status, PackageStatus::Ingresado);
        assert_eq!(detail.provider_name.as_deref(), Some("Urbano"));
        assert_eq!(detail.location_name.as_deref(), Some("Estante A1"));
        assert_eq!(detail.warehouse_name.as_deref(), Some("Galpón Norte"));

        let movements = list_movements(&pool, detail.package.id).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].movement.action, MovementAction::Ingreso);
        assert_eq!(movements[0].to_provider_name.as_deref(), Some("Urbano"));
    }

    #[tokio::test]
    async fn test_duplicate_tracking_rejected() {
        let (pool, provider_id, _) = seeded().await;
        create_package(&pool, "AR001", Some(provider_id), None, None)
            .await
            .unwrap()
            .unwrap();

        let dup = create_package(&pool, "AR001", None, None, None).await.unwrap();
        assert!(dup.is_none());
    }

    #[tokio::test]
    async fn test_lookup_by_id_or_tracking() {
        let (pool, provider_id, _) = seeded().await;
        let created = create_package(&pool, "AR001", Some(provider_id), None, None)
            .await
            .unwrap()
            .unwrap();

        let by_tracking = load_package(&pool, "AR001").await.unwrap().unwrap();
        assert_eq!(by_tracking.package.id, created.package.id);

        let by_id = load_package(&pool, &created.package.id.to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_id.package.tracking_number, "AR001");

        assert!(load_package(&pool, "AR999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deliver_then_redeliver() {
        let (pool, provider_id, location_id) = seeded().await;
        create_package(&pool, "AR001", Some(provider_id), Some(location_id), None)
            .await
            .unwrap()
            .unwrap();

        let outcome = deliver_package(&pool, "AR001", Some("retirado por cliente"))
            .await
            .unwrap();
        let delivered = match outcome {
            PackageOutcome::Applied(d) => d,
            other => panic!("expected Applied, got {other:?}"),
        };
        assert_eq!(delivered.package.status, PackageStatus::Entregado);

        let movements = list_movements(&pool, delivered.package.id).await.unwrap();
        assert_eq!(movements[0].movement.action, MovementAction::Salida);
        assert_eq!(movements[0].from_location_name.as_deref(), Some("Estante A1"));

        let again = deliver_package(&pool, "AR001", None).await.unwrap();
        assert!(matches!(again, PackageOutcome::AlreadyDelivered));

        let missing = deliver_package(&pool, "AR404", None).await.unwrap();
        assert!(matches!(missing, PackageOutcome::NotFound));
    }

    #[tokio::test]
    async fn test_transfer_moves_provider_and_location() {
        let (pool, provider_id, location_id) = seeded().await;
        let ocasa = create_provider(&pool, "Ocasa", None).await.unwrap().unwrap();
        create_package(&pool, "AR001", Some(provider_id), Some(location_id), None)
            .await
            .unwrap()
            .unwrap();

        let outcome = transfer_package(&pool, "AR001", Some(ocasa.id), None, Some("a Ocasa"))
            .await
            .unwrap();
        let moved = match outcome {
            PackageOutcome::Applied(d) => d,
            other => panic!("expected Applied, got {other:?}"),
        };
        assert_eq!(moved.package.status, PackageStatus::EnTraspaso);
        assert_eq!(moved.provider_name.as_deref(), Some("Ocasa"));
        assert_eq!(moved.package.current_location_id, None);

        let movements = list_movements(&pool, moved.package.id).await.unwrap();
        assert_eq!(movements[0].movement.action, MovementAction::Traspaso);
        assert_eq!(movements[0].from_provider_name.as_deref(), Some("Urbano"));
        assert_eq!(movements[0].to_provider_name.as_deref(), Some("Ocasa"));
    }

    #[tokio::test]
    async fn test_transfer_blocked_after_delivery() {
        let (pool, provider_id, _) = seeded().await;
        create_package(&pool, "AR001", Some(provider_id), None, None)
            .await
            .unwrap()
            .unwrap();
        deliver_package(&pool, "AR001", None).await.unwrap();

        let outcome = transfer_package(&pool, "AR001", None, None, None).await.unwrap();
        assert!(matches!(outcome, PackageOutcome::AlreadyDelivered));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let (pool, provider_id, location_id) = seeded().await;
        create_package(&pool, "AR-100", Some(provider_id), Some(location_id), None)
            .await
            .unwrap()
            .unwrap();
        create_package(&pool, "BR-200", None, None, None)
            .await
            .unwrap()
            .unwrap();
        deliver_package(&pool, "BR-200", None).await.unwrap();

        // Substring match is case-insensitive
        let filters = PackageFilters {
            tracking: Some("ar-".to_string()),
            ..Default::default()
        };
        let (hits, total) = list_packages(&pool, &filters, 50, 0).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(hits[0].package.tracking_number, "AR-100");

        let filters = PackageFilters {
            status: Some(PackageStatus::Entregado),
            ..Default::default()
        };
        let (delivered, _) = list_packages(&pool, &filters, 50, 0).await.unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].package.tracking_number, "BR-200");

        let filters = PackageFilters {
            provider_id: Some(provider_id),
            ..Default::default()
        };
        let (by_provider, _) = list_packages(&pool, &filters, 50, 0).await.unwrap();
        assert_eq!(by_provider.len(), 1);
    }
}
