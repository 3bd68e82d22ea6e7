//! Verification scan persistence and counters

use std::collections::HashSet;

use anyhow::{anyhow, Result};
use galpon_common::time;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::shipments::parse_ts;
use crate::models::{ScanStatus, ScannedPackage};
use crate::stats::{GlobalScanStats, VerificationStats};

pub async fn find_scan(
    pool: &SqlitePool,
    shipment_id: Uuid,
    tracking: &str,
) -> Result<Option<ScannedPackage>> {
    let row = sqlx::query(
        r#"
        SELECT id, shipment_id, tracking_number, status, scanned_at, scanned_by
        FROM scanned_packages
        WHERE shipment_id = ? AND tracking_number = ?
        "#,
    )
    .bind(shipment_id.to_string())
    .bind(tracking)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(row_to_scan(&row)?)),
        None => Ok(None),
    }
}

/// Insert a scan, relying on the UNIQUE pair for idempotency
///
/// Returns `None` when another request inserted the same tracking first;
/// callers re-read the existing row and report it as a duplicate.
pub async fn insert_scan(
    pool: &SqlitePool,
    shipment_id: Uuid,
    tracking: &str,
    status: ScanStatus,
    scanned_by: &str,
) -> Result<Option<ScannedPackage>> {
    let id = Uuid::new_v4();
    let now = time::now();
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO scanned_packages
            (id, shipment_id, tracking_number, status, scanned_at, scanned_by)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(shipment_id.to_string())
    .bind(tracking)
    .bind(status.as_str())
    .bind(now.to_rfc3339())
    .bind(scanned_by)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    Ok(Some(ScannedPackage {
        id,
        shipment_id,
        tracking_number: tracking.to_string(),
        status,
        scanned_at: now,
        scanned_by: scanned_by.to_string(),
    }))
}

/// All scans for a shipment in scan order
pub async fn list_scans(pool: &SqlitePool, shipment_id: Uuid) -> Result<Vec<ScannedPackage>> {
    let rows = sqlx::query(
        r#"
        SELECT id, shipment_id, tracking_number, status, scanned_at, scanned_by
        FROM scanned_packages
        WHERE shipment_id = ?
        ORDER BY scanned_at ASC, tracking_number ASC
        "#,
    )
    .bind(shipment_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_scan).collect()
}

/// Tracking numbers scanned OK, used to filter the sorting sheet
pub async fn ok_tracking_set(pool: &SqlitePool, shipment_id: Uuid) -> Result<HashSet<String>> {
    let rows = sqlx::query(
        "SELECT tracking_number FROM scanned_packages WHERE shipment_id = ? AND status = ?",
    )
    .bind(shipment_id.to_string())
    .bind(ScanStatus::Ok.as_str())
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| row.get::<String, _>("tracking_number"))
        .collect())
}

/// Recompute verification counters for a shipment
pub async fn verification_stats(
    pool: &SqlitePool,
    shipment_id: Uuid,
) -> Result<VerificationStats> {
    let row = sqlx::query(
        r#"
        SELECT
            (SELECT COUNT(*) FROM pre_alerta_records WHERE shipment_id = ?1) AS expected,
            (SELECT COUNT(*) FROM scanned_packages WHERE shipment_id = ?1) AS total_scanned,
            (SELECT COUNT(*) FROM scanned_packages WHERE shipment_id = ?1 AND status = 'OK') AS ok,
            (SELECT COUNT(*) FROM scanned_packages WHERE shipment_id = ?1 AND status = 'SOBRANTE') AS sobrante,
            (SELECT COUNT(*) FROM scanned_packages WHERE shipment_id = ?1 AND status = 'FUERA_COBERTURA') AS fuera_cobertura,
            (SELECT COUNT(*) FROM scanned_packages WHERE shipment_id = ?1 AND status = 'PREVIO') AS previo,
            (SELECT COUNT(*) FROM pre_alerta_records pa
             WHERE pa.shipment_id = ?1
               AND NOT EXISTS (SELECT 1 FROM scanned_packages sp
                               WHERE sp.shipment_id = pa.shipment_id
                                 AND sp.tracking_number = pa.tracking_number)) AS faltante
        "#,
    )
    .bind(shipment_id.to_string())
    .fetch_one(pool)
    .await?;

    Ok(VerificationStats {
        expected: row.get("expected"),
        total_scanned: row.get("total_scanned"),
        ok: row.get("ok"),
        sobrante: row.get("sobrante"),
        fuera_cobertura: row.get("fuera_cobertura"),
        previo: row.get("previo"),
        faltante: row.get("faltante"),
    })
}

/// Scan totals across all shipments visible to the caller
pub async fn global_scan_stats(
    pool: &SqlitePool,
    provider_filter: Option<Uuid>,
) -> Result<GlobalScanStats> {
    let provider = provider_filter.map(|p| p.to_string());
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS total_packages,
               COALESCE(SUM(CASE WHEN sp.status = 'OK' THEN 1 ELSE 0 END), 0) AS ok_packages,
               COALESCE(SUM(CASE WHEN sp.status != 'OK' THEN 1 ELSE 0 END), 0) AS issues_packages
        FROM scanned_packages sp
        JOIN shipments s ON s.id = sp.shipment_id
        WHERE (?1 IS NULL OR s.provider_id = ?1)
        "#,
    )
    .bind(&provider)
    .fetch_one(pool)
    .await?;

    Ok(GlobalScanStats {
        total_packages: row.get("total_packages"),
        ok_packages: row.get("ok_packages"),
        issues_packages: row.get("issues_packages"),
    })
}

fn row_to_scan(row: &sqlx::sqlite::SqliteRow) -> Result<ScannedPackage> {
    let id: String = row.get("id");
    let shipment_id: String = row.get("shipment_id");
    let status: String = row.get("status");
    let scanned_at: String = row.get("scanned_at");

    Ok(ScannedPackage {
        id: Uuid::parse_str(&id)?,
        shipment_id: Uuid::parse_str(&shipment_id)?,
        tracking_number: row.get("tracking_number"),
        status: ScanStatus::parse(&status)
            .ok_or_else(|| anyhow!("unknown scan status: {status}"))?,
        scanned_at: parse_ts(&scanned_at)?,
        scanned_by: row.get("scanned_by"),
    })
}
