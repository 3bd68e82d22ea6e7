//! Notification rows and per-operator preference flags
//!
//! Operators only receive fan-out once they have a preferences row, which
//! is auto-created the first time they open their notification feed.

use anyhow::{anyhow, Result};
use galpon_common::time;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{get_ts, get_uuid};
use crate::models::{Notification, NotificationKind, NotificationPreferences};

/// Newest-first page of one operator's notifications, plus the total
pub async fn list_notifications(
    pool: &SqlitePool,
    operator_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Notification>, i64)> {
    let rows = sqlx::query(
        r#"
        SELECT id, operator_id, kind, message, created_at
        FROM notifications WHERE operator_id = ?
        ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?
        "#,
    )
    .bind(operator_id.to_string())
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE operator_id = ?")
            .bind(operator_id.to_string())
            .fetch_one(pool)
            .await?;

    let notifications = rows.iter().map(row_to_notification).collect::<Result<_>>()?;
    Ok((notifications, total))
}

/// Fetch the operator's preference flags, creating the all-on default row
/// on first touch.
pub async fn get_or_create_preferences(
    pool: &SqlitePool,
    operator_id: Uuid,
) -> Result<NotificationPreferences> {
    sqlx::query("INSERT OR IGNORE INTO notification_preferences (operator_id) VALUES (?)")
        .bind(operator_id.to_string())
        .execute(pool)
        .await?;

    let row = sqlx::query(
        r#"
        SELECT new_entry, new_provider, new_inventory, new_reexpedicion
        FROM notification_preferences WHERE operator_id = ?
        "#,
    )
    .bind(operator_id.to_string())
    .fetch_one(pool)
    .await?;
    Ok(row_to_preferences(&row))
}

/// Upsert the operator's preference flags
pub async fn update_preferences(
    pool: &SqlitePool,
    operator_id: Uuid,
    prefs: &NotificationPreferences,
) -> Result<NotificationPreferences> {
    sqlx::query(
        r#"
        INSERT INTO notification_preferences
            (operator_id, new_entry, new_provider, new_inventory, new_reexpedicion)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(operator_id) DO UPDATE SET
            new_entry = excluded.new_entry,
            new_provider = excluded.new_provider,
            new_inventory = excluded.new_inventory,
            new_reexpedicion = excluded.new_reexpedicion
        "#,
    )
    .bind(operator_id.to_string())
    .bind(prefs.new_entry as i64)
    .bind(prefs.new_provider as i64)
    .bind(prefs.new_inventory as i64)
    .bind(prefs.new_reexpedicion as i64)
    .execute(pool)
    .await?;
    Ok(prefs.clone())
}

/// Delete all of one operator's notifications; returns how many went away
pub async fn clear_notifications(pool: &SqlitePool, operator_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM notifications WHERE operator_id = ?")
        .bind(operator_id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Write one notification per operator subscribed to this kind; returns the
/// recipient count.
pub async fn fan_out(pool: &SqlitePool, kind: NotificationKind, message: &str) -> Result<u64> {
    let column = kind.preference_column();
    let recipients: Vec<String> = sqlx::query_scalar(&format!(
        "SELECT operator_id FROM notification_preferences WHERE {column} = 1"
    ))
    .fetch_all(pool)
    .await?;

    let now = time::now_rfc3339();
    for operator_id in &recipients {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, operator_id, kind, message, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(operator_id)
        .bind(kind.as_str())
        .bind(message)
        .bind(&now)
        .execute(pool)
        .await?;
    }
    Ok(recipients.len() as u64)
}

fn row_to_notification(row: &sqlx::sqlite::SqliteRow) -> Result<Notification> {
    let kind: String = row.get("kind");
    Ok(Notification {
        id: get_uuid(row, "id")?,
        operator_id: get_uuid(row, "operator_id")?,
        kind: NotificationKind::parse(&kind)
            .ok_or_else(|| anyhow!("unknown notification kind: {kind}"))?,
        message: row.get("message"),
        created_at: get_ts(row, "created_at")?,
    })
}

fn row_to_preferences(row: &sqlx::sqlite::SqliteRow) -> NotificationPreferences {
    NotificationPreferences {
        new_entry: row.get::<i64, _>("new_entry") != 0,
        new_provider: row.get::<i64, _>("new_provider") != 0,
        new_inventory: row.get::<i64, _>("new_inventory") != 0,
        new_reexpedicion: row.get::<i64, _>("new_reexpedicion") != 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use galpon_common::db::{init_memory_database, ADMIN_OPERATOR_ID};

    async fn insert_operator(pool: &SqlitePool, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO operators (id, name, role, active, created_at)
            VALUES (?, ?, 'OPERADOR', 1, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(name)
        .bind(time::now_rfc3339())
        .execute(pool)
        .await
        .unwrap();
        id
    }

    fn admin_id() -> Uuid {
        Uuid::parse_str(ADMIN_OPERATOR_ID).unwrap()
    }

    #[tokio::test]
    async fn test_preferences_default_on_first_touch() {
        let pool = init_memory_database().await.unwrap();
        let prefs = get_or_create_preferences(&pool, admin_id()).await.unwrap();
        assert!(prefs.new_entry && prefs.new_provider);
        assert!(prefs.new_inventory && prefs.new_reexpedicion);

        // Second touch returns the same row, not a reset
        let updated = NotificationPreferences {
            new_entry: false,
            ..prefs
        };
        update_preferences(&pool, admin_id(), &updated).await.unwrap();
        let again = get_or_create_preferences(&pool, admin_id()).await.unwrap();
        assert!(!again.new_entry);
        assert!(again.new_provider);
    }

    #[tokio::test]
    async fn test_fan_out_respects_flags() {
        let pool = init_memory_database().await.unwrap();
        let muted = insert_operator(&pool, "Marta").await;
        let listening = insert_operator(&pool, "Pedro").await;

        get_or_create_preferences(&pool, listening).await.unwrap();
        let prefs = get_or_create_preferences(&pool, muted).await.unwrap();
        update_preferences(
            &pool,
            muted,
            &NotificationPreferences {
                new_provider: false,
                ..prefs
            },
        )
        .await
        .unwrap();

        let sent = fan_out(
            &pool,
            NotificationKind::NewProvider,
            "Nuevo proveedor creado: Urbano",
        )
        .await
        .unwrap();
        assert_eq!(sent, 1);

        let (rows, total) = list_notifications(&pool, listening, 20, 0).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].kind, NotificationKind::NewProvider);

        let (_, muted_total) = list_notifications(&pool, muted, 20, 0).await.unwrap();
        assert_eq!(muted_total, 0);

        // No preferences row at all means no fan-out either
        let fresh = insert_operator(&pool, "Lucía").await;
        fan_out(&pool, NotificationKind::NewProvider, "otra vez")
            .await
            .unwrap();
        let (_, fresh_total) = list_notifications(&pool, fresh, 20, 0).await.unwrap();
        assert_eq!(fresh_total, 0);
    }

    #[tokio::test]
    async fn test_clear_only_own() {
        let pool = init_memory_database().await.unwrap();
        let a = insert_operator(&pool, "Marta").await;
        let b = insert_operator(&pool, "Pedro").await;
        get_or_create_preferences(&pool, a).await.unwrap();
        get_or_create_preferences(&pool, b).await.unwrap();
        fan_out(&pool, NotificationKind::NewEntry, "Nueva entrada registrada: Urbano - AB123CD")
            .await
            .unwrap();

        let cleared = clear_notifications(&pool, a).await.unwrap();
        assert_eq!(cleared, 1);

        let (_, a_total) = list_notifications(&pool, a, 20, 0).await.unwrap();
        assert_eq!(a_total, 0);
        let (_, b_total) = list_notifications(&pool, b, 20, 0).await.unwrap();
        assert_eq!(b_total, 1);
    }
}
