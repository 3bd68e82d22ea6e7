//! Clasificación (sorting) persistence

use anyhow::Result;
use galpon_common::time;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::shipments::parse_ts;
use crate::models::{ClasificacionArchivo, ClasificacionRow, PaqueteClasificacion};
use crate::stats::{ClasificacionStats, VehicleProgress};

/// Clasificación with shipment and provider context, for the admin list
#[derive(Debug, Clone, Serialize)]
pub struct ClasificacionListRow {
    #[serde(flatten)]
    pub archivo: ClasificacionArchivo,
    pub shipment_date: String,
    pub shipment_status: String,
    pub provider_name: String,
    pub total: i64,
    pub escaneados: i64,
}

/// Hit returned by the tracking search
#[derive(Debug, Clone)]
pub struct TrackingSearchHit {
    pub paquete: PaqueteClasificacion,
    pub archivo: ClasificacionArchivo,
    pub shipment_date: String,
    pub provider_name: String,
}

/// Store a freshly parsed sorting file, replacing any previous one
///
/// The delete and the inserts run in one transaction, so a scan can never
/// observe a half-replaced clasificación.
pub async fn replace_clasificacion(
    pool: &SqlitePool,
    shipment_id: Uuid,
    provider_id: Uuid,
    uploaded_by: &str,
    rows: &[ClasificacionRow],
) -> Result<ClasificacionArchivo> {
    let id = Uuid::new_v4();
    let now = time::now();
    let now_str = now.to_rfc3339();

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM clasificacion_archivos WHERE shipment_id = ?")
        .bind(shipment_id.to_string())
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO clasificacion_archivos
            (id, shipment_id, provider_id, total_rows, uploaded_by, uploaded_at,
             finalizado, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(shipment_id.to_string())
    .bind(provider_id.to_string())
    .bind(rows.len() as i64)
    .bind(uploaded_by)
    .bind(&now_str)
    .bind(&now_str)
    .bind(&now_str)
    .execute(&mut *tx)
    .await?;

    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO paquetes_clasificacion
                (id, clasificacion_id, tracking_number, vehiculo, orden_visita,
                 orden_numerico, escaneado, created_at)
            VALUES (?, ?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(id.to_string())
        .bind(&row.tracking_number)
        .bind(&row.vehiculo)
        .bind(&row.orden_visita)
        .bind(row.orden_numerico)
        .bind(&now_str)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(ClasificacionArchivo {
        id,
        shipment_id,
        provider_id,
        total_rows: rows.len() as i64,
        uploaded_by: uploaded_by.to_string(),
        uploaded_at: now,
        finalizado: false,
        finalizado_at: None,
        finalizado_por: None,
    })
}

pub async fn load_clasificacion(
    pool: &SqlitePool,
    id: Uuid,
) -> Result<Option<ClasificacionArchivo>> {
    let row = sqlx::query(&format!("{ARCHIVO_SELECT} WHERE id = ?"))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(row_to_archivo(&row)?)),
        None => Ok(None),
    }
}

/// Most recent clasificación for a shipment, if any
pub async fn latest_for_shipment(
    pool: &SqlitePool,
    shipment_id: Uuid,
) -> Result<Option<ClasificacionArchivo>> {
    let row = sqlx::query(&format!(
        "{ARCHIVO_SELECT} WHERE shipment_id = ? ORDER BY created_at DESC LIMIT 1"
    ))
    .bind(shipment_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(row_to_archivo(&row)?)),
        None => Ok(None),
    }
}

/// All clasificaciones visible to the caller, most recently updated first
pub async fn list_clasificaciones(
    pool: &SqlitePool,
    provider_filter: Option<Uuid>,
) -> Result<Vec<ClasificacionListRow>> {
    let provider = provider_filter.map(|p| p.to_string());
    let rows = sqlx::query(
        r#"
        SELECT c.id, c.shipment_id, c.provider_id, c.total_rows, c.uploaded_by,
               c.uploaded_at, c.finalizado, c.finalizado_at, c.finalizado_por,
               s.shipment_date, s.status AS shipment_status,
               p.name AS provider_name,
               (SELECT COUNT(*) FROM paquetes_clasificacion pc
                WHERE pc.clasificacion_id = c.id) AS total,
               (SELECT COUNT(*) FROM paquetes_clasificacion pc
                WHERE pc.clasificacion_id = c.id AND pc.escaneado = 1) AS escaneados
        FROM clasificacion_archivos c
        JOIN shipments s ON s.id = c.shipment_id
        JOIN providers p ON p.id = c.provider_id
        WHERE (?1 IS NULL OR c.provider_id = ?1)
        ORDER BY c.updated_at DESC
        "#,
    )
    .bind(&provider)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(ClasificacionListRow {
                archivo: row_to_archivo(row)?,
                shipment_date: row.get("shipment_date"),
                shipment_status: row.get("shipment_status"),
                provider_name: row.get("provider_name"),
                total: row.get("total"),
                escaneados: row.get("escaneados"),
            })
        })
        .collect()
}

pub async fn find_paquete(
    pool: &SqlitePool,
    clasificacion_id: Uuid,
    tracking: &str,
) -> Result<Option<PaqueteClasificacion>> {
    let row = sqlx::query(&format!(
        "{PAQUETE_SELECT} WHERE clasificacion_id = ? AND tracking_number = ?"
    ))
    .bind(clasificacion_id.to_string())
    .bind(tracking)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(row_to_paquete(&row)?)),
        None => Ok(None),
    }
}

/// Mark a package scanned; false when it was already scanned
pub async fn mark_paquete_escaneado(
    pool: &SqlitePool,
    paquete_id: Uuid,
    scanned_by: &str,
) -> Result<bool> {
    let now = time::now_rfc3339();
    let result = sqlx::query(
        r#"
        UPDATE paquetes_clasificacion
        SET escaneado = 1, escaneado_at = ?, escaneado_por = ?
        WHERE id = ? AND escaneado = 0
        "#,
    )
    .bind(&now)
    .bind(scanned_by)
    .bind(paquete_id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        sqlx::query(
            "UPDATE clasificacion_archivos SET updated_at = ?
             WHERE id = (SELECT clasificacion_id FROM paquetes_clasificacion WHERE id = ?)",
        )
        .bind(&now)
        .bind(paquete_id.to_string())
        .execute(pool)
        .await?;
        return Ok(true);
    }
    Ok(false)
}

/// Mark a clasificación finalized; false when it already was
pub async fn finalize_clasificacion(
    pool: &SqlitePool,
    id: Uuid,
    finalized_by: &str,
) -> Result<bool> {
    let now = time::now_rfc3339();
    let result = sqlx::query(
        r#"
        UPDATE clasificacion_archivos
        SET finalizado = 1, finalizado_at = ?, finalizado_por = ?, updated_at = ?
        WHERE id = ? AND finalizado = 0
        "#,
    )
    .bind(&now)
    .bind(finalized_by)
    .bind(&now)
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Packages of a clasificación ordered for delivery: vehicle, then stop order
pub async fn list_paquetes(
    pool: &SqlitePool,
    clasificacion_id: Uuid,
) -> Result<Vec<PaqueteClasificacion>> {
    let rows = sqlx::query(&format!(
        "{PAQUETE_SELECT} WHERE clasificacion_id = ? ORDER BY vehiculo ASC, orden_numerico ASC"
    ))
    .bind(clasificacion_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_paquete).collect()
}

/// Overall progress counters for a clasificación
pub async fn clasificacion_stats(
    pool: &SqlitePool,
    clasificacion_id: Uuid,
) -> Result<ClasificacionStats> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS total,
               COALESCE(SUM(escaneado), 0) AS escaneados
        FROM paquetes_clasificacion
        WHERE clasificacion_id = ?
        "#,
    )
    .bind(clasificacion_id.to_string())
    .fetch_one(pool)
    .await?;

    Ok(ClasificacionStats::from_counts(
        row.get("total"),
        row.get("escaneados"),
    ))
}

/// Per-vehicle progress, ordered by vehicle name
pub async fn vehicle_progress(
    pool: &SqlitePool,
    clasificacion_id: Uuid,
) -> Result<Vec<VehicleProgress>> {
    let rows = sqlx::query(
        r#"
        SELECT vehiculo,
               COUNT(*) AS total,
               COALESCE(SUM(escaneado), 0) AS escaneados
        FROM paquetes_clasificacion
        WHERE clasificacion_id = ?
        GROUP BY vehiculo
        ORDER BY vehiculo ASC
        "#,
    )
    .bind(clasificacion_id.to_string())
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| {
            VehicleProgress::from_counts(
                row.get("vehiculo"),
                row.get("total"),
                row.get("escaneados"),
            )
        })
        .collect())
}

/// Case-insensitive tracking lookup across clasificaciones
///
/// When a tracking appears in several sorting files the newest wins.
pub async fn search_by_tracking(
    pool: &SqlitePool,
    tracking: &str,
    provider_filter: Option<Uuid>,
) -> Result<Option<TrackingSearchHit>> {
    let provider = provider_filter.map(|p| p.to_string());
    let row = sqlx::query(
        r#"
        SELECT pc.id, pc.clasificacion_id, pc.tracking_number, pc.vehiculo,
               pc.orden_visita, pc.orden_numerico, pc.escaneado, pc.escaneado_at,
               pc.escaneado_por,
               c.id AS c_id, c.shipment_id, c.provider_id, c.total_rows,
               c.uploaded_by, c.uploaded_at, c.finalizado, c.finalizado_at,
               c.finalizado_por,
               s.shipment_date, p.name AS provider_name
        FROM paquetes_clasificacion pc
        JOIN clasificacion_archivos c ON c.id = pc.clasificacion_id
        JOIN shipments s ON s.id = c.shipment_id
        JOIN providers p ON p.id = c.provider_id
        WHERE UPPER(pc.tracking_number) = UPPER(?1)
          AND (?2 IS NULL OR c.provider_id = ?2)
        ORDER BY c.created_at DESC
        LIMIT 1
        "#,
    )
    .bind(tracking)
    .bind(&provider)
    .fetch_optional(pool)
    .await?;

    let row = match row {
        Some(row) => row,
        None => return Ok(None),
    };

    Ok(Some(TrackingSearchHit {
        paquete: row_to_paquete(&row)?,
        archivo: row_to_archivo_prefixed(&row)?,
        shipment_date: row.get("shipment_date"),
        provider_name: row.get("provider_name"),
    }))
}

const ARCHIVO_SELECT: &str = r#"
    SELECT id, shipment_id, provider_id, total_rows, uploaded_by, uploaded_at,
           finalizado, finalizado_at, finalizado_por
    FROM clasificacion_archivos
"#;

const PAQUETE_SELECT: &str = r#"
    SELECT id, clasificacion_id, tracking_number, vehiculo, orden_visita,
           orden_numerico, escaneado, escaneado_at, escaneado_por
    FROM paquetes_clasificacion
"#;

fn row_to_archivo(row: &sqlx::sqlite::SqliteRow) -> Result<ClasificacionArchivo> {
    let id: String = row.get("id");
    archivo_from_parts(row, &id)
}

fn row_to_archivo_prefixed(row: &sqlx::sqlite::SqliteRow) -> Result<ClasificacionArchivo> {
    let id: String = row.get("c_id");
    archivo_from_parts(row, &id)
}

fn archivo_from_parts(row: &sqlx::sqlite::SqliteRow, id: &str) -> Result<ClasificacionArchivo> {
    let shipment_id: String = row.get("shipment_id");
    let provider_id: String = row.get("provider_id");
    let uploaded_at: String = row.get("uploaded_at");
    let finalizado: i64 = row.get("finalizado");
    let finalizado_at: Option<String> = row.get("finalizado_at");

    Ok(ClasificacionArchivo {
        id: Uuid::parse_str(id)?,
        shipment_id: Uuid::parse_str(&shipment_id)?,
        provider_id: Uuid::parse_str(&provider_id)?,
        total_rows: row.get("total_rows"),
        uploaded_by: row.get("uploaded_by"),
        uploaded_at: parse_ts(&uploaded_at)?,
        finalizado: finalizado != 0,
        finalizado_at: finalizado_at.as_deref().map(parse_ts).transpose()?,
        finalizado_por: row.get("finalizado_por"),
    })
}

fn row_to_paquete(row: &sqlx::sqlite::SqliteRow) -> Result<PaqueteClasificacion> {
    let id: String = row.get("id");
    let clasificacion_id: String = row.get("clasificacion_id");
    let escaneado: i64 = row.get("escaneado");
    let escaneado_at: Option<String> = row.get("escaneado_at");

    Ok(PaqueteClasificacion {
        id: Uuid::parse_str(&id)?,
        clasificacion_id: Uuid::parse_str(&clasificacion_id)?,
        tracking_number: row.get("tracking_number"),
        vehiculo: row.get("vehiculo"),
        orden_visita: row.get("orden_visita"),
        orden_numerico: row.get("orden_numerico"),
        escaneado: escaneado != 0,
        escaneado_at: escaneado_at.as_deref().map(parse_ts).transpose()?,
        escaneado_por: row.get("escaneado_por"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::shipments::create_shipment;
    use galpon_common::db::init_memory_database;

    async fn setup() -> (SqlitePool, Uuid, Uuid) {
        let pool = init_memory_database().await.unwrap();
        let provider_id = Uuid::new_v4();
        sqlx::query("INSERT INTO providers (id, name, created_at, updated_at) VALUES (?, 'Urbano', ?, ?)")
            .bind(provider_id.to_string())
            .bind(time::now_rfc3339())
            .bind(time::now_rfc3339())
            .execute(&pool)
            .await
            .unwrap();
        let shipment = create_shipment(&pool, provider_id, "2026-08-20", "maria")
            .await
            .unwrap();
        (pool, shipment.id, provider_id)
    }

    fn row(tracking: &str, vehiculo: &str, orden: i64) -> ClasificacionRow {
        ClasificacionRow {
            tracking_number: tracking.to_string(),
            vehiculo: vehiculo.to_string(),
            orden_visita: format!("Parada {orden}"),
            orden_numerico: orden,
        }
    }

    #[tokio::test]
    async fn test_replace_swaps_the_whole_file() {
        let (pool, shipment_id, provider_id) = setup().await;

        let first = replace_clasificacion(
            &pool,
            shipment_id,
            provider_id,
            "maria",
            &[row("T1", "V1", 1), row("T2", "V1", 2)],
        )
        .await
        .unwrap();

        let second = replace_clasificacion(
            &pool,
            shipment_id,
            provider_id,
            "maria",
            &[row("T9", "V2", 1)],
        )
        .await
        .unwrap();

        assert!(load_clasificacion(&pool, first.id).await.unwrap().is_none());
        assert!(find_paquete(&pool, first.id, "T1").await.unwrap().is_none());

        let latest = latest_for_shipment(&pool, shipment_id).await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
        assert_eq!(latest.total_rows, 1);
    }

    #[tokio::test]
    async fn test_scan_marks_once() {
        let (pool, shipment_id, provider_id) = setup().await;
        replace_clasificacion(&pool, shipment_id, provider_id, "maria", &[row("T1", "V1", 1)])
            .await
            .unwrap();
        let archivo = latest_for_shipment(&pool, shipment_id).await.unwrap().unwrap();
        let paquete = find_paquete(&pool, archivo.id, "T1").await.unwrap().unwrap();
        assert!(!paquete.escaneado);

        assert!(mark_paquete_escaneado(&pool, paquete.id, "jorge").await.unwrap());
        assert!(!mark_paquete_escaneado(&pool, paquete.id, "jorge").await.unwrap());

        let paquete = find_paquete(&pool, archivo.id, "T1").await.unwrap().unwrap();
        assert!(paquete.escaneado);
        assert_eq!(paquete.escaneado_por.as_deref(), Some("jorge"));
        assert!(paquete.escaneado_at.is_some());
    }

    #[tokio::test]
    async fn test_stats_and_vehicle_progress() {
        let (pool, shipment_id, provider_id) = setup().await;
        replace_clasificacion(
            &pool,
            shipment_id,
            provider_id,
            "maria",
            &[
                row("T1", "V1", 1),
                row("T2", "V1", 2),
                row("T3", "V2", 1),
                row("T4", "V2", 2),
            ],
        )
        .await
        .unwrap();
        let archivo = latest_for_shipment(&pool, shipment_id).await.unwrap().unwrap();

        let t1 = find_paquete(&pool, archivo.id, "T1").await.unwrap().unwrap();
        mark_paquete_escaneado(&pool, t1.id, "maria").await.unwrap();

        let stats = clasificacion_stats(&pool, archivo.id).await.unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.escaneados, 1);
        assert_eq!(stats.pendientes, 3);
        assert_eq!(stats.porcentaje, 25);

        let progress = vehicle_progress(&pool, archivo.id).await.unwrap();
        assert_eq!(progress.len(), 2);
        assert_eq!(progress[0].vehiculo, "V1");
        assert_eq!(progress[0].escaneados, 1);
        assert_eq!(progress[1].vehiculo, "V2");
        assert_eq!(progress[1].escaneados, 0);
    }

    #[tokio::test]
    async fn test_finalize_only_once() {
        let (pool, shipment_id, provider_id) = setup().await;
        replace_clasificacion(&pool, shipment_id, provider_id, "maria", &[row("T1", "V1", 1)])
            .await
            .unwrap();
        let archivo = latest_for_shipment(&pool, shipment_id).await.unwrap().unwrap();

        assert!(finalize_clasificacion(&pool, archivo.id, "admin").await.unwrap());
        assert!(!finalize_clasificacion(&pool, archivo.id, "admin").await.unwrap());

        let loaded = load_clasificacion(&pool, archivo.id).await.unwrap().unwrap();
        assert!(loaded.finalizado);
        assert_eq!(loaded.finalizado_por.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_scoped() {
        let (pool, shipment_id, provider_id) = setup().await;
        replace_clasificacion(&pool, shipment_id, provider_id, "maria", &[row("AbC123", "V1", 1)])
            .await
            .unwrap();

        let hit = search_by_tracking(&pool, "abc123", None).await.unwrap().unwrap();
        assert_eq!(hit.paquete.tracking_number, "AbC123");
        assert_eq!(hit.provider_name, "Urbano");
        assert_eq!(hit.shipment_date, "2026-08-20");

        let miss = search_by_tracking(&pool, "abc123", Some(Uuid::new_v4()))
            .await
            .unwrap();
        assert!(miss.is_none());

        let scoped = search_by_tracking(&pool, "ABC123", Some(provider_id))
            .await
            .unwrap();
        assert!(scoped.is_some());
    }
}
