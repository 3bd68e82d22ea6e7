//! Reexpedición movimientos and their scanned etiquetas
//!
//! An INGRESO owns its etiquetas; an EGRESO references an INGRESO as its
//! origin, carries frozen copies of the etiquetas it took, and degrades the
//! origin's estado as ACTIVO etiquetas run out. The egreso transaction
//! re-checks each selected etiqueta with a guarded UPDATE, so a selection
//! that went stale between the pick screen and the submit rolls back whole.

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use galpon_common::time;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{day_bounds, get_opt_ts, get_opt_uuid, get_ts, get_uuid};
use crate::models::{
    EstadoEtiqueta, EstadoMovimiento, Etiqueta, Movimiento, MovimientoDetail, SubtipoEgreso,
    SubtipoIngreso, TipoMovimiento,
};

/// Optional list filters, all combined with AND; the date range is
/// inclusive on both ends.
#[derive(Debug, Clone, Default)]
pub struct MovimientoFilters {
    pub tipo: Option<TipoMovimiento>,
    pub subtipo_ingreso: Option<SubtipoIngreso>,
    pub subtipo_egreso: Option<SubtipoEgreso>,
    pub warehouse_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub estado: Option<EstadoMovimiento>,
    /// Case-insensitive substring over the movimiento's etiquetas
    pub tracking: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Outcome of an egreso attempt
#[derive(Debug)]
pub enum EgresoOutcome {
    Created(Box<MovimientoDetail>),
    OriginNotFound,
    /// At least one selected etiqueta is not ACTIVO in the origin
    Unavailable,
}

/// Create an INGRESO movimiento with one ACTIVO etiqueta per tracking
/// number. Callers pass trimmed, deduplicated tracking numbers.
pub async fn create_ingreso(
    pool: &SqlitePool,
    subtipo: SubtipoIngreso,
    warehouse_id: Uuid,
    location_id: Uuid,
    tracking_numbers: &[String],
    notas: Option<&str>,
    created_by: &str,
) -> Result<MovimientoDetail> {
    let id = Uuid::new_v4();
    let now = time::now_rfc3339();

    let mut tx = pool.begin().await?;
    sqlx::query(
        r#"
        INSERT INTO reexpedicion_movimientos
            (id, tipo, subtipo_ingreso, warehouse_id, location_id, cantidad,
             cantidad_egresada, estado, notas, created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(TipoMovimiento::Ingreso.as_str())
    .bind(subtipo.as_str())
    .bind(warehouse_id.to_string())
    .bind(location_id.to_string())
    .bind(tracking_numbers.len() as i64)
    .bind(EstadoMovimiento::Activo.as_str())
    .bind(notas)
    .bind(created_by)
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    for tracking in tracking_numbers {
        sqlx::query(
            r#"
            INSERT INTO reexpedicion_etiquetas
                (id, movimiento_id, tracking_number, estado, escaneado_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(id.to_string())
        .bind(tracking)
        .bind(EstadoEtiqueta::Activo.as_str())
        .bind(&now)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    load_movimiento(pool, id)
        .await?
        .ok_or_else(|| anyhow!("movimiento vanished after insert: {id}"))
}

/// Create an EGRESO from an origin INGRESO inside one transaction
pub async fn create_egreso(
    pool: &SqlitePool,
    subtipo: SubtipoEgreso,
    warehouse_id: Uuid,
    location_id: Uuid,
    origen_id: Uuid,
    etiquetas_seleccionadas: &[Uuid],
    notas: Option<&str>,
    created_by: &str,
) -> Result<EgresoOutcome> {
    let now = time::now_rfc3339();
    let mut tx = pool.begin().await?;

    let origin = sqlx::query("SELECT id FROM reexpedicion_movimientos WHERE id = ?")
        .bind(origen_id.to_string())
        .fetch_optional(&mut *tx)
        .await?;
    if origin.is_none() {
        return Ok(EgresoOutcome::OriginNotFound);
    }

    let egreso_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO reexpedicion_movimientos
            (id, tipo, subtipo_egreso, warehouse_id, location_id, cantidad,
             cantidad_egresada, estado, notas, movimiento_origen_id,
             created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(egreso_id.to_string())
    .bind(TipoMovimiento::Egreso.as_str())
    .bind(subtipo.as_str())
    .bind(warehouse_id.to_string())
    .bind(location_id.to_string())
    .bind(etiquetas_seleccionadas.len() as i64)
    .bind(EstadoMovimiento::Activo.as_str())
    .bind(notas)
    .bind(origen_id.to_string())
    .bind(created_by)
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    for etiqueta_id in etiquetas_seleccionadas {
        let row = sqlx::query(
            "SELECT tracking_number FROM reexpedicion_etiquetas WHERE id = ? AND movimiento_id = ?",
        )
        .bind(etiqueta_id.to_string())
        .bind(origen_id.to_string())
        .fetch_optional(&mut *tx)
        .await?;
        let tracking: String = match row {
            Some(row) => row.get("tracking_number"),
            None => return Ok(EgresoOutcome::Unavailable),
        };

        let result = sqlx::query(
            r#"
            UPDATE reexpedicion_etiquetas
            SET estado = ?, egresado_at = ?
            WHERE id = ? AND estado = ?
            "#,
        )
        .bind(EstadoEtiqueta::EgresadoTotal.as_str())
        .bind(&now)
        .bind(etiqueta_id.to_string())
        .bind(EstadoEtiqueta::Activo.as_str())
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(EgresoOutcome::Unavailable);
        }

        sqlx::query(
            r#"
            INSERT INTO reexpedicion_etiquetas
                (id, movimiento_id, tracking_number, estado, escaneado_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(egreso_id.to_string())
        .bind(&tracking)
        .bind(EstadoEtiqueta::EgresadoTotal.as_str())
        .bind(&now)
        .execute(&mut *tx)
        .await?;
    }

    let remaining: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM reexpedicion_etiquetas WHERE movimiento_id = ? AND estado = ?",
    )
    .bind(origen_id.to_string())
    .bind(EstadoEtiqueta::Activo.as_str())
    .fetch_one(&mut *tx)
    .await?;

    let nuevo_estado = if remaining == 0 {
        EstadoMovimiento::EgresadoTotal
    } else {
        EstadoMovimiento::EgresadoParcial
    };
    sqlx::query(
        r#"
        UPDATE reexpedicion_movimientos
        SET estado = ?, cantidad_egresada = cantidad_egresada + ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(nuevo_estado.as_str())
    .bind(etiquetas_seleccionadas.len() as i64)
    .bind(&now)
    .bind(origen_id.to_string())
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    let detail = load_movimiento(pool, egreso_id)
        .await?
        .ok_or_else(|| anyhow!("movimiento vanished after insert: {egreso_id}"))?;
    Ok(EgresoOutcome::Created(Box::new(detail)))
}

pub async fn load_movimiento(pool: &SqlitePool, id: Uuid) -> Result<Option<MovimientoDetail>> {
    let row = sqlx::query(&format!("{MOVIMIENTO_SELECT} WHERE m.id = ?"))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => {
            let mut detail = row_to_partial(&row)?;
            detail.etiquetas = etiquetas_for(pool, id, false).await?;
            Ok(Some(detail))
        }
        None => Ok(None),
    }
}

/// Newest-first movimiento page matching the filters, plus the filtered
/// total. Each movimiento carries all of its etiquetas.
pub async fn list_movimientos(
    pool: &SqlitePool,
    filters: &MovimientoFilters,
    limit: i64,
    offset: i64,
) -> Result<(Vec<MovimientoDetail>, i64)> {
    let (start, end) = day_bounds(filters.start_date, filters.end_date)?;
    let warehouse = filters.warehouse_id.map(|id| id.to_string());
    let location = filters.location_id.map(|id| id.to_string());

    let rows = sqlx::query(&format!(
        "{MOVIMIENTO_SELECT} {MOVIMIENTO_FILTER} ORDER BY m.created_at DESC LIMIT ?10 OFFSET ?11"
    ))
    .bind(filters.tipo.map(|t| t.as_str()))
    .bind(filters.subtipo_ingreso.map(|s| s.as_str()))
    .bind(filters.subtipo_egreso.map(|s| s.as_str()))
    .bind(&warehouse)
    .bind(&location)
    .bind(filters.estado.map(|e| e.as_str()))
    .bind(&filters.tracking)
    .bind(&start)
    .bind(&end)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM reexpedicion_movimientos m {MOVIMIENTO_FILTER}"
    ))
    .bind(filters.tipo.map(|t| t.as_str()))
    .bind(filters.subtipo_ingreso.map(|s| s.as_str()))
    .bind(filters.subtipo_egreso.map(|s| s.as_str()))
    .bind(&warehouse)
    .bind(&location)
    .bind(filters.estado.map(|e| e.as_str()))
    .bind(&filters.tracking)
    .bind(&start)
    .bind(&end)
    .fetch_one(pool)
    .await?;

    let mut movimientos = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut detail = row_to_partial(row)?;
        detail.etiquetas = etiquetas_for(pool, detail.movimiento.id, false).await?;
        movimientos.push(detail);
    }
    Ok((movimientos, total))
}

/// INGRESO movimientos that still have something to hand out. Carries only
/// the ACTIVO etiquetas, oldest scan first.
pub async fn list_disponibles(
    pool: &SqlitePool,
    warehouse_id: Option<Uuid>,
    subtipo_ingreso: Option<SubtipoIngreso>,
) -> Result<Vec<MovimientoDetail>> {
    let rows = sqlx::query(&format!(
        r#"
        {MOVIMIENTO_SELECT}
        WHERE m.tipo = 'INGRESO'
          AND m.estado IN ('ACTIVO', 'EGRESADO_PARCIAL')
          AND (?1 IS NULL OR m.warehouse_id = ?1)
          AND (?2 IS NULL OR m.subtipo_ingreso = ?2)
          AND EXISTS (SELECT 1 FROM reexpedicion_etiquetas e
                      WHERE e.movimiento_id = m.id AND e.estado = 'ACTIVO')
        ORDER BY m.created_at DESC
        "#
    ))
    .bind(warehouse_id.map(|id| id.to_string()))
    .bind(subtipo_ingreso.map(|s| s.as_str()))
    .fetch_all(pool)
    .await?;

    let mut movimientos = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut detail = row_to_partial(row)?;
        detail.etiquetas = etiquetas_for(pool, detail.movimiento.id, true).await?;
        movimientos.push(detail);
    }
    Ok(movimientos)
}

async fn etiquetas_for(
    pool: &SqlitePool,
    movimiento_id: Uuid,
    only_activo: bool,
) -> Result<Vec<Etiqueta>> {
    let estado_filter = if only_activo { "AND estado = 'ACTIVO'" } else { "" };
    let rows = sqlx::query(&format!(
        r#"
        SELECT id, movimiento_id, tracking_number, estado, escaneado_at, egresado_at
        FROM reexpedicion_etiquetas
        WHERE movimiento_id = ? {estado_filter}
        ORDER BY escaneado_at ASC, rowid ASC
        "#
    ))
    .bind(movimiento_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_etiqueta).collect()
}

const MOVIMIENTO_SELECT: &str = r#"
    SELECT m.id, m.tipo, m.subtipo_ingreso, m.subtipo_egreso, m.warehouse_id,
           m.location_id, m.cantidad, m.cantidad_egresada, m.estado, m.notas,
           m.movimiento_origen_id, m.created_by, m.created_at, m.updated_at,
           w.name AS warehouse_name, l.name AS location_name
    FROM reexpedicion_movimientos m
    JOIN warehouses w ON w.id = m.warehouse_id
    JOIN locations l ON l.id = m.location_id
"#;

const MOVIMIENTO_FILTER: &str = r#"
    WHERE (?1 IS NULL OR m.tipo = ?1)
      AND (?2 IS NULL OR m.subtipo_ingreso = ?2)
      AND (?3 IS NULL OR m.subtipo_egreso = ?3)
      AND (?4 IS NULL OR m.warehouse_id = ?4)
      AND (?5 IS NULL OR m.location_id = ?5)
      AND (?6 IS NULL OR m.estado = ?6)
      AND (?7 IS NULL OR EXISTS (SELECT 1 FROM reexpedicion_etiquetas e
                                 WHERE e.movimiento_id = m.id
                                   AND e.tracking_number LIKE '%' || ?7 || '%'))
      AND (?8 IS NULL OR m.created_at >= ?8)
      AND (?9 IS NULL OR m.created_at < ?9)
"#;

/// Decode a movimiento row; etiquetas are filled in by the caller
fn row_to_partial(row: &sqlx::sqlite::SqliteRow) -> Result<MovimientoDetail> {
    let tipo: String = row.get("tipo");
    let estado: String = row.get("estado");
    let subtipo_ingreso = row
        .get::<Option<String>, _>("subtipo_ingreso")
        .map(|s| SubtipoIngreso::parse(&s).ok_or_else(|| anyhow!("unknown subtipo_ingreso: {s}")))
        .transpose()?;
    let subtipo_egreso = row
        .get::<Option<String>, _>("subtipo_egreso")
        .map(|s| SubtipoEgreso::parse(&s).ok_or_else(|| anyhow!("unknown subtipo_egreso: {s}")))
        .transpose()?;

    Ok(MovimientoDetail {
        movimiento: Movimiento {
            id: get_uuid(row, "id")?,
            tipo: TipoMovimiento::parse(&tipo)
                .ok_or_else(|| anyhow!("unknown movimiento tipo: {tipo}"))?,
            subtipo_ingreso,
            subtipo_egreso,
            warehouse_id: get_uuid(row, "warehouse_id")?,
            location_id: get_uuid(row, "location_id")?,
            cantidad: row.get("cantidad"),
            cantidad_egresada: row.get("cantidad_egresada"),
            estado: EstadoMovimiento::parse(&estado)
                .ok_or_else(|| anyhow!("unknown movimiento estado: {estado}"))?,
            notas: row.get("notas"),
            movimiento_origen_id: get_opt_uuid(row, "movimiento_origen_id")?,
            created_by: row.get("created_by"),
            created_at: get_ts(row, "created_at")?,
            updated_at: get_ts(row, "updated_at")?,
        },
        warehouse_name: row.get("warehouse_name"),
        location_name: row.get("location_name"),
        etiquetas: Vec::new(),
    })
}

fn row_to_etiqueta(row: &sqlx::sqlite::SqliteRow) -> Result<Etiqueta> {
    let estado: String = row.get("estado");
    Ok(Etiqueta {
        id: get_uuid(row, "id")?,
        movimiento_id: get_uuid(row, "movimiento_id")?,
        tracking_number: row.get("tracking_number"),
        estado: EstadoEtiqueta::parse(&estado)
            .ok_or_else(|| anyhow!("unknown etiqueta estado: {estado}"))?,
        escaneado_at: get_ts(row, "escaneado_at")?,
        egresado_at: get_opt_ts(row, "egresado_at")?,
    })
}
