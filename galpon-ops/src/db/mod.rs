//! Database operations for the operations service
//!
//! Rows are decoded by hand from TEXT columns; the helpers below keep the
//! per-table `row_to_*` functions short.

pub mod catalog;
pub mod entries;
pub mod inventory;
pub mod labels;
pub mod notifications;
pub mod packages;
pub mod reexpedicion;
pub mod storage;

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use galpon_common::time;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

pub(crate) fn get_uuid(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let value: String = row.get(column);
    Uuid::parse_str(&value).map_err(|_| anyhow!("invalid uuid in column {column}: {value}"))
}

pub(crate) fn get_opt_uuid(row: &SqliteRow, column: &str) -> Result<Option<Uuid>> {
    let value: Option<String> = row.get(column);
    value
        .map(|v| Uuid::parse_str(&v).map_err(|_| anyhow!("invalid uuid in column {column}: {v}")))
        .transpose()
}

pub(crate) fn parse_ts(value: &str) -> Result<DateTime<Utc>> {
    time::parse_rfc3339(value).ok_or_else(|| anyhow!("invalid timestamp in database: {value}"))
}

pub(crate) fn get_ts(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let value: String = row.get(column);
    parse_ts(&value)
}

pub(crate) fn get_opt_ts(row: &SqliteRow, column: &str) -> Result<Option<DateTime<Utc>>> {
    let value: Option<String> = row.get(column);
    value.as_deref().map(parse_ts).transpose()
}

/// String bounds for an inclusive calendar-date range over RFC 3339 text
/// columns, half-open at the start of the day after `end`.
pub(crate) fn day_bounds(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(Option<String>, Option<String>)> {
    let lower = start.map(|d| format!("{d}T00:00:00"));
    let upper = match end {
        Some(d) => {
            let next = d
                .succ_opt()
                .ok_or_else(|| anyhow!("end date out of range: {d}"))?;
            Some(format!("{next}T00:00:00"))
        }
        None => None,
    };
    Ok((lower, upper))
}
