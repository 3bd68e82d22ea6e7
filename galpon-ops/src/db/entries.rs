//! Gate entry persistence and dashboard aggregations
//!
//! Week and month are stamped from the write moment, never recomputed from
//! the stored timestamps, so an entry edited in January keeps grouping with
//! the dashboard column it was re-saved under.

use anyhow::Result;
use chrono::{DateTime, Utc};
use galpon_common::time;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{get_opt_ts, get_ts, get_uuid};
use crate::models::{Entry, EntryWithRefs, Provider, Truck};

/// Optional list filters, all combined with AND
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryFilters {
    pub provider_id: Option<Uuid>,
    pub truck_id: Option<Uuid>,
    pub week: Option<i64>,
    pub month: Option<i64>,
}

/// Entries-per-month dashboard row
#[derive(Debug, Clone, serde::Serialize)]
pub struct MonthCount {
    pub month: i64,
    pub count: i64,
}

/// Entries-per-provider dashboard row
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProviderCount {
    pub provider: String,
    pub count: i64,
}

pub async fn create_entry(
    pool: &SqlitePool,
    provider_id: Uuid,
    truck_id: Uuid,
    arrival_time: Option<DateTime<Utc>>,
    departure_time: Option<DateTime<Utc>>,
) -> Result<Entry> {
    let id = Uuid::new_v4();
    let now = time::now();
    let (week, month) = time::week_and_month(now);
    let duration_minutes = match (arrival_time, departure_time) {
        (Some(arrival), Some(departure)) => Some(time::duration_minutes(arrival, departure)),
        _ => None,
    };

    sqlx::query(
        r#"
        INSERT INTO entries
            (id, provider_id, truck_id, arrival_time, departure_time,
             week, month, duration_minutes, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(provider_id.to_string())
    .bind(truck_id.to_string())
    .bind(arrival_time.map(|t| t.to_rfc3339()))
    .bind(departure_time.map(|t| t.to_rfc3339()))
    .bind(week as i64)
    .bind(month as i64)
    .bind(duration_minutes)
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(Entry {
        id,
        provider_id,
        truck_id,
        arrival_time,
        departure_time,
        week: week as i64,
        month: month as i64,
        duration_minutes,
        created_at: now,
        updated_at: now,
    })
}

pub async fn load_entry(pool: &SqlitePool, id: Uuid) -> Result<Option<EntryWithRefs>> {
    let row = sqlx::query(&format!("{ENTRY_SELECT} WHERE e.id = ?"))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(row_to_entry_with_refs(&row)?)),
        None => Ok(None),
    }
}

/// Newest-first entry page matching the filters, plus the filtered total
pub async fn list_entries(
    pool: &SqlitePool,
    filters: &EntryFilters,
    limit: i64,
    offset: i64,
) -> Result<(Vec<EntryWithRefs>, i64)> {
    let provider = filters.provider_id.map(|id| id.to_string());
    let truck = filters.truck_id.map(|id| id.to_string());

    let rows = sqlx::query(&format!(
        "{ENTRY_SELECT} {ENTRY_FILTER} ORDER BY e.created_at DESC LIMIT ?5 OFFSET ?6"
    ))
    .bind(&provider)
    .bind(&truck)
    .bind(filters.week)
    .bind(filters.month)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM entries e {ENTRY_FILTER}"))
        .bind(&provider)
        .bind(&truck)
        .bind(filters.week)
        .bind(filters.month)
        .fetch_one(pool)
        .await?;

    let entries = rows
        .iter()
        .map(row_to_entry_with_refs)
        .collect::<Result<_>>()?;
    Ok((entries, total))
}

/// Rewrite an entry, restamping week/month and recomputing the duration
pub async fn update_entry(
    pool: &SqlitePool,
    id: Uuid,
    provider_id: Uuid,
    truck_id: Uuid,
    arrival_time: Option<DateTime<Utc>>,
    departure_time: Option<DateTime<Utc>>,
) -> Result<bool> {
    let now = time::now();
    let (week, month) = time::week_and_month(now);
    let duration_minutes = match (arrival_time, departure_time) {
        (Some(arrival), Some(departure)) => Some(time::duration_minutes(arrival, departure)),
        _ => None,
    };

    let result = sqlx::query(
        r#"
        UPDATE entries
        SET provider_id = ?, truck_id = ?, arrival_time = ?, departure_time = ?,
            week = ?, month = ?, duration_minutes = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(provider_id.to_string())
    .bind(truck_id.to_string())
    .bind(arrival_time.map(|t| t.to_rfc3339()))
    .bind(departure_time.map(|t| t.to_rfc3339()))
    .bind(week as i64)
    .bind(month as i64)
    .bind(duration_minutes)
    .bind(now.to_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_entry(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM entries WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn entry_has_inventory(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_items WHERE entry_id = ?")
        .bind(id.to_string())
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Distinct weeks and months present in the table, newest first
pub async fn filter_options(pool: &SqlitePool) -> Result<(Vec<i64>, Vec<i64>)> {
    let weeks: Vec<i64> = sqlx::query_scalar("SELECT DISTINCT week FROM entries ORDER BY week DESC")
        .fetch_all(pool)
        .await?;
    let months: Vec<i64> =
        sqlx::query_scalar("SELECT DISTINCT month FROM entries ORDER BY month DESC")
            .fetch_all(pool)
            .await?;
    Ok((weeks, months))
}

pub async fn entries_by_month(pool: &SqlitePool) -> Result<Vec<MonthCount>> {
    let rows = sqlx::query(
        "SELECT month, COUNT(*) AS count FROM entries GROUP BY month ORDER BY month ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| MonthCount {
            month: row.get("month"),
            count: row.get("count"),
        })
        .collect())
}

pub async fn entries_by_provider(pool: &SqlitePool) -> Result<Vec<ProviderCount>> {
    let rows = sqlx::query(
        r#"
        SELECT p.name AS provider, COUNT(*) AS count
        FROM entries e
        JOIN providers p ON p.id = e.provider_id
        GROUP BY p.name
        ORDER BY count DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| ProviderCount {
            provider: row.get("provider"),
            count: row.get("count"),
        })
        .collect())
}

/// Average visit duration in minutes, None until a completed visit exists
pub async fn average_duration(pool: &SqlitePool) -> Result<Option<f64>> {
    let avg: Option<f64> = sqlx::query_scalar(
        "SELECT AVG(duration_minutes) FROM entries WHERE duration_minutes IS NOT NULL",
    )
    .fetch_one(pool)
    .await?;
    Ok(avg)
}

const ENTRY_SELECT: &str = r#"
    SELECT e.id, e.provider_id, e.truck_id, e.arrival_time, e.departure_time,
           e.week, e.month, e.duration_minutes, e.created_at, e.updated_at,
           p.name AS p_name, p.responsible AS p_responsible,
           p.created_at AS p_created_at, p.updated_at AS p_updated_at,
           t.license_plate AS t_license_plate, t.created_at AS t_created_at
    FROM entries e
    JOIN providers p ON p.id = e.provider_id
    JOIN trucks t ON t.id = e.truck_id
"#;

const ENTRY_FILTER: &str = r#"
    WHERE (?1 IS NULL OR e.provider_id = ?1)
      AND (?2 IS NULL OR e.truck_id = ?2)
      AND (?3 IS NULL OR e.week = ?3)
      AND (?4 IS NULL OR e.month = ?4)
"#;

fn row_to_entry_with_refs(row: &sqlx::sqlite::SqliteRow) -> Result<EntryWithRefs> {
    let provider_id = get_uuid(row, "provider_id")?;
    let truck_id = get_uuid(row, "truck_id")?;

    Ok(EntryWithRefs {
        entry: Entry {
            id: get_uuid(row, "id")?,
            provider_id,
            truck_id,
            arrival_time: get_opt_ts(row, "arrival_time")?,
            departure_time: get_opt_ts(row, "departure_time")?,
            week: row.get("week"),
            month: row.get("month"),
            duration_minutes: row.get("duration_minutes"),
            created_at: get_ts(row, "created_at")?,
            updated_at: get_ts(row, "updated_at")?,
        },
        provider: Provider {
            id: provider_id,
            name: row.get("p_name"),
            responsible: row.get("p_responsible"),
            created_at: get_ts(row, "p_created_at")?,
            updated_at: get_ts(row, "p_updated_at")?,
        },
        truck: Truck {
            id: truck_id,
            license_plate: row.get("t_license_plate"),
            created_at: get_ts(row, "t_created_at")?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::catalog::{create_provider, create_truck};
    use chrono::TimeZone;
    use galpon_common::db::init_memory_database;

    async fn seeded() -> (SqlitePool, Uuid, Uuid) {
        let pool = init_memory_database().await.unwrap();
        let provider = create_provider(&pool, "Urbano", None).await.unwrap().unwrap();
        let truck = create_truck(&pool, "AB123CD").await.unwrap().unwrap();
        (pool, provider.id, truck.id)
    }

    #[tokio::test]
    async fn test_create_stamps_week_month_and_duration() {
        let (pool, provider_id, truck_id) = seeded().await;
        let arrival = Utc.with_ymd_and_hms(2026, 8, 20, 8, 0, 0).unwrap();
        let departure = Utc.with_ymd_and_hms(2026, 8, 20, 9, 45, 0).unwrap();

        let entry = create_entry(&pool, provider_id, truck_id, Some(arrival), Some(departure))
            .await
            .unwrap();

        let (expected_week, expected_month) = time::week_and_month(time::now());
        assert_eq!(entry.week, expected_week as i64);
        assert_eq!(entry.month, expected_month as i64);
        assert_eq!(entry.duration_minutes, Some(105));

        let loaded = load_entry(&pool, entry.id).await.unwrap().unwrap();
        assert_eq!(loaded.provider.name, "Urbano");
        assert_eq!(loaded.truck.license_plate, "AB123CD");
        assert_eq!(loaded.entry.arrival_time, Some(arrival));
    }

    #[tokio::test]
    async fn test_open_entry_has_no_duration() {
        let (pool, provider_id, truck_id) = seeded().await;
        let arrival = Utc.with_ymd_and_hms(2026, 8, 20, 8, 0, 0).unwrap();

        let entry = create_entry(&pool, provider_id, truck_id, Some(arrival), None)
            .await
            .unwrap();
        assert_eq!(entry.duration_minutes, None);
    }

    #[tokio::test]
    async fn test_list_filters_by_provider_and_truck() {
        let (pool, provider_id, truck_id) = seeded().await;
        let other_provider = create_provider(&pool, "Ocasa", None).await.unwrap().unwrap();
        let other_truck = create_truck(&pool, "ZZ999XX").await.unwrap().unwrap();

        create_entry(&pool, provider_id, truck_id, None, None).await.unwrap();
        create_entry(&pool, other_provider.id, other_truck.id, None, None)
            .await
            .unwrap();

        let (all, total) = list_entries(&pool, &EntryFilters::default(), 50, 0)
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(all.len(), 2);

        let filters = EntryFilters {
            provider_id: Some(provider_id),
            ..Default::default()
        };
        let (scoped, scoped_total) = list_entries(&pool, &filters, 50, 0).await.unwrap();
        assert_eq!(scoped_total, 1);
        assert_eq!(scoped[0].provider.name, "Urbano");

        let filters = EntryFilters {
            truck_id: Some(other_truck.id),
            ..Default::default()
        };
        let (by_truck, _) = list_entries(&pool, &filters, 50, 0).await.unwrap();
        assert_eq!(by_truck[0].truck.license_plate, "ZZ999XX");
    }

    #[tokio::test]
    async fn test_update_recomputes_duration() {
        let (pool, provider_id, truck_id) = seeded().await;
        let entry = create_entry(&pool, provider_id, truck_id, None, None)
            .await
            .unwrap();

        let arrival = Utc.with_ymd_and_hms(2026, 8, 20, 8, 0, 0).unwrap();
        let departure = Utc.with_ymd_and_hms(2026, 8, 20, 8, 30, 0).unwrap();
        assert!(
            update_entry(&pool, entry.id, provider_id, truck_id, Some(arrival), Some(departure))
                .await
                .unwrap()
        );

        let loaded = load_entry(&pool, entry.id).await.unwrap().unwrap();
        assert_eq!(loaded.entry.duration_minutes, Some(30));

        assert!(
            !update_entry(&pool, Uuid::new_v4(), provider_id, truck_id, None, None)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_dashboard_aggregations() {
        let (pool, provider_id, truck_id) = seeded().await;
        let other = create_provider(&pool, "Ocasa", None).await.unwrap().unwrap();

        let arrival = Utc.with_ymd_and_hms(2026, 8, 20, 8, 0, 0).unwrap();
        let departure = Utc.with_ymd_and_hms(2026, 8, 20, 9, 0, 0).unwrap();
        create_entry(&pool, provider_id, truck_id, Some(arrival), Some(departure))
            .await
            .unwrap();
        create_entry(&pool, provider_id, truck_id, None, None).await.unwrap();
        create_entry(&pool, other.id, truck_id, None, None).await.unwrap();

        let by_provider = entries_by_provider(&pool).await.unwrap();
        assert_eq!(by_provider[0].provider, "Urbano");
        assert_eq!(by_provider[0].count, 2);
        assert_eq!(by_provider[1].count, 1);

        let by_month = entries_by_month(&pool).await.unwrap();
        assert_eq!(by_month.len(), 1);
        assert_eq!(by_month[0].count, 3);

        let avg = average_duration(&pool).await.unwrap();
        assert_eq!(avg, Some(60.0));
    }

    #[tokio::test]
    async fn test_average_duration_empty_table() {
        let pool = init_memory_database().await.unwrap();
        assert_eq!(average_duration(&pool).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_filter_options_descending() {
        let (pool, provider_id, truck_id) = seeded().await;
        let first = create_entry(&pool, provider_id, truck_id, None, None).await.unwrap();
        let second = create_entry(&pool, provider_id, truck_id, None, None).await.unwrap();

        // Pin distinct week/month pairs so ordering is observable
        sqlx::query("UPDATE entries SET week = 2, month = 1 WHERE id = ?")
            .bind(first.id.to_string())
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("UPDATE entries SET week = 30, month = 7 WHERE id = ?")
            .bind(second.id.to_string())
            .execute(&pool)
            .await
            .unwrap();

        let (weeks, months) = filter_options(&pool).await.unwrap();
        assert_eq!(weeks, vec![30, 2]);
        assert_eq!(months, vec![7, 1]);
    }
}
