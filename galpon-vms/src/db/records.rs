//! Pre-alerta and pre-ruteo record persistence

use anyhow::Result;
use galpon_common::time;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{PreAlertaRecord, PreRuteoRecord};

/// Stored pre-alerta row with its identifiers
#[derive(Debug, Clone, Serialize)]
pub struct StoredPreAlerta {
    pub id: Uuid,
    pub shipment_id: Uuid,
    #[serde(flatten)]
    pub record: PreAlertaRecord,
    pub created_at: String,
}

/// Stored pre-ruteo row with its identifiers
#[derive(Debug, Clone, Serialize)]
pub struct StoredPreRuteo {
    pub id: Uuid,
    pub shipment_id: Uuid,
    #[serde(flatten)]
    pub record: PreRuteoRecord,
    pub created_at: String,
}

/// Bulk-insert manifest rows; duplicates within the shipment insert once
///
/// Returns the number of rows actually inserted.
pub async fn insert_pre_alerta_records(
    pool: &SqlitePool,
    shipment_id: Uuid,
    records: &[PreAlertaRecord],
) -> Result<u64> {
    let now = time::now_rfc3339();
    let mut tx = pool.begin().await?;
    let mut inserted = 0u64;

    for record in records {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO pre_alerta_records (
                id, shipment_id, tracking_number, client, country, weight, value,
                buyer_normalized_id, buyer, buyer_address1, buyer_address1_number,
                buyer_address2, buyer_city, buyer_state, buyer_location, buyer_zip,
                buyer_phone, buyer_email, raw_data, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(shipment_id.to_string())
        .bind(&record.tracking_number)
        .bind(&record.client)
        .bind(&record.country)
        .bind(record.weight)
        .bind(record.value)
        .bind(&record.buyer_normalized_id)
        .bind(&record.buyer)
        .bind(&record.buyer_address1)
        .bind(&record.buyer_address1_number)
        .bind(&record.buyer_address2)
        .bind(&record.buyer_city)
        .bind(&record.buyer_state)
        .bind(&record.buyer_location)
        .bind(&record.buyer_zip)
        .bind(&record.buyer_phone)
        .bind(&record.buyer_email)
        .bind(&record.raw_data)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Bulk-insert route plan rows; duplicate pedidos within the shipment insert once
pub async fn insert_pre_ruteo_records(
    pool: &SqlitePool,
    shipment_id: Uuid,
    records: &[PreRuteoRecord],
) -> Result<u64> {
    let now = time::now_rfc3339();
    let mut tx = pool.begin().await?;
    let mut inserted = 0u64;

    for record in records {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO pre_ruteo_records (
                id, shipment_id, codigo_cliente, razon_social, domicilio, tipo_cliente,
                fecha_reparto, codigo_reparto, maquina, chofer, fecha_pedido,
                codigo_pedido, ventana_horaria, arribo, partida, peso_kg, volumen_m3,
                dinero, raw_data, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(shipment_id.to_string())
        .bind(&record.codigo_cliente)
        .bind(&record.razon_social)
        .bind(&record.domicilio)
        .bind(&record.tipo_cliente)
        .bind(&record.fecha_reparto)
        .bind(&record.codigo_reparto)
        .bind(&record.maquina)
        .bind(&record.chofer)
        .bind(&record.fecha_pedido)
        .bind(&record.codigo_pedido)
        .bind(&record.ventana_horaria)
        .bind(&record.arribo)
        .bind(&record.partida)
        .bind(record.peso_kg)
        .bind(record.volumen_m3)
        .bind(record.dinero)
        .bind(&record.raw_data)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Membership of a tracking code in the shipment's two sheets
pub async fn tracking_membership(
    pool: &SqlitePool,
    shipment_id: Uuid,
    tracking: &str,
) -> Result<(bool, bool)> {
    let row = sqlx::query(
        r#"
        SELECT
            EXISTS(SELECT 1 FROM pre_alerta_records
                   WHERE shipment_id = ?1 AND tracking_number = ?2) AS in_pre_alerta,
            EXISTS(SELECT 1 FROM pre_ruteo_records
                   WHERE shipment_id = ?1 AND codigo_pedido = ?2) AS in_pre_ruteo
        "#,
    )
    .bind(shipment_id.to_string())
    .bind(tracking)
    .fetch_one(pool)
    .await?;

    let in_pre_alerta: i64 = row.get("in_pre_alerta");
    let in_pre_ruteo: i64 = row.get("in_pre_ruteo");
    Ok((in_pre_alerta != 0, in_pre_ruteo != 0))
}

pub async fn list_pre_alerta(
    pool: &SqlitePool,
    shipment_id: Uuid,
) -> Result<Vec<StoredPreAlerta>> {
    let rows = sqlx::query(
        r#"
        SELECT id, shipment_id, tracking_number, client, country, weight, value,
               buyer_normalized_id, buyer, buyer_address1, buyer_address1_number,
               buyer_address2, buyer_city, buyer_state, buyer_location, buyer_zip,
               buyer_phone, buyer_email, raw_data, created_at
        FROM pre_alerta_records
        WHERE shipment_id = ?
        ORDER BY tracking_number
        "#,
    )
    .bind(shipment_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let id: String = row.get("id");
            let shipment_id: String = row.get("shipment_id");
            Ok(StoredPreAlerta {
                id: Uuid::parse_str(&id)?,
                shipment_id: Uuid::parse_str(&shipment_id)?,
                record: PreAlertaRecord {
                    tracking_number: row.get("tracking_number"),
                    client: row.get("client"),
                    country: row.get("country"),
                    weight: row.get("weight"),
                    value: row.get("value"),
                    buyer_normalized_id: row.get("buyer_normalized_id"),
                    buyer: row.get("buyer"),
                    buyer_address1: row.get("buyer_address1"),
                    buyer_address1_number: row.get("buyer_address1_number"),
                    buyer_address2: row.get("buyer_address2"),
                    buyer_city: row.get("buyer_city"),
                    buyer_state: row.get("buyer_state"),
                    buyer_location: row.get("buyer_location"),
                    buyer_zip: row.get("buyer_zip"),
                    buyer_phone: row.get("buyer_phone"),
                    buyer_email: row.get("buyer_email"),
                    raw_data: row.get("raw_data"),
                },
                created_at: row.get("created_at"),
            })
        })
        .collect()
}

pub async fn list_pre_ruteo(
    pool: &SqlitePool,
    shipment_id: Uuid,
) -> Result<Vec<StoredPreRuteo>> {
    let rows = sqlx::query(
        r#"
        SELECT id, shipment_id, codigo_cliente, razon_social, domicilio, tipo_cliente,
               fecha_reparto, codigo_reparto, maquina, chofer, fecha_pedido,
               codigo_pedido, ventana_horaria, arribo, partida, peso_kg, volumen_m3,
               dinero, raw_data, created_at
        FROM pre_ruteo_records
        WHERE shipment_id = ?
        ORDER BY codigo_pedido
        "#,
    )
    .bind(shipment_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let id: String = row.get("id");
            let shipment_id: String = row.get("shipment_id");
            Ok(StoredPreRuteo {
                id: Uuid::parse_str(&id)?,
                shipment_id: Uuid::parse_str(&shipment_id)?,
                record: PreRuteoRecord {
                    codigo_cliente: row.get("codigo_cliente"),
                    razon_social: row.get("razon_social"),
                    domicilio: row.get("domicilio"),
                    tipo_cliente: row.get("tipo_cliente"),
                    fecha_reparto: row.get("fecha_reparto"),
                    codigo_reparto: row.get("codigo_reparto"),
                    maquina: row.get("maquina"),
                    chofer: row.get("chofer"),
                    fecha_pedido: row.get("fecha_pedido"),
                    codigo_pedido: row.get("codigo_pedido"),
                    ventana_horaria: row.get("ventana_horaria"),
                    arribo: row.get("arribo"),
                    partida: row.get("partida"),
                    peso_kg: row.get("peso_kg"),
                    volumen_m3: row.get("volumen_m3"),
                    dinero: row.get("dinero"),
                    raw_data: row.get("raw_data"),
                },
                created_at: row.get("created_at"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::shipments::create_shipment;
    use galpon_common::db::init_memory_database;

    async fn setup() -> (SqlitePool, Uuid) {
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
        (pool, shipment.id)
    }

    fn pa(tracking: &str) -> PreAlertaRecord {
        PreAlertaRecord {
            tracking_number: tracking.to_string(),
            buyer: Some("Juan".to_string()),
            ..Default::default()
        }
    }

    fn pr(pedido: &str) -> PreRuteoRecord {
        PreRuteoRecord {
            codigo_pedido: pedido.to_string(),
            razon_social: Some("Libreria Central".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_duplicate_trackings_insert_once() {
        let (pool, shipment_id) = setup().await;

        let inserted =
            insert_pre_alerta_records(&pool, shipment_id, &[pa("T1"), pa("T2"), pa("T1")])
                .await
                .unwrap();
        assert_eq!(inserted, 2);

        let stored = list_pre_alerta(&pool, shipment_id).await.unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn test_membership_covers_both_sheets() {
        let (pool, shipment_id) = setup().await;
        insert_pre_alerta_records(&pool, shipment_id, &[pa("BOTH"), pa("PA-ONLY")])
            .await
            .unwrap();
        insert_pre_ruteo_records(&pool, shipment_id, &[pr("BOTH"), pr("PR-ONLY")])
            .await
            .unwrap();

        assert_eq!(
            tracking_membership(&pool, shipment_id, "BOTH").await.unwrap(),
            (true, true)
        );
        assert_eq!(
            tracking_membership(&pool, shipment_id, "PA-ONLY")
                .await
                .unwrap(),
            (true, false)
        );
        assert_eq!(
            tracking_membership(&pool, shipment_id, "PR-ONLY")
                .await
                .unwrap(),
            (false, true)
        );
        assert_eq!(
            tracking_membership(&pool, shipment_id, "NOWHERE")
                .await
                .unwrap(),
            (false, false)
        );
    }

    #[tokio::test]
    async fn test_membership_is_per_shipment() {
        let (pool, shipment_id) = setup().await;
        let other = create_shipment(
            &pool,
            {
                let row = sqlx::query("SELECT provider_id FROM shipments WHERE id = ?")
                    .bind(shipment_id.to_string())
                    .fetch_one(&pool)
                    .await
                    .unwrap();
                let p: String = row.get("provider_id");
                Uuid::parse_str(&p).unwrap()
            },
            "2026-08-21",
            "maria",
        )
        .await
        .unwrap();

        insert_pre_alerta_records(&pool, shipment_id, &[pa("T1")])
            .await
            .unwrap();

        assert_eq!(
            tracking_membership(&pool, other.id, "T1").await.unwrap(),
            (false, false)
        );
    }
}
