//! Timestamp utilities
//!
//! All timestamps are stored as RFC3339 UTC. Presentation formatting targets
//! America/Argentina/Buenos_Aires, which has been fixed at UTC-3 since 2009,
//! so a constant offset is used instead of a timezone database.

use chrono::{DateTime, Datelike, Duration, FixedOffset, IsoWeek, NaiveDateTime, Offset, Utc};

/// Fixed UTC offset for Argentina (no DST)
const ARGENTINA_OFFSET_SECS: i32 = -3 * 3600;

/// Days between the spreadsheet epoch (1899-12-30) and the Unix epoch
const SPREADSHEET_EPOCH_OFFSET_DAYS: f64 = 25569.0;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current timestamp as an RFC3339 string, the storage format for all tables
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

fn argentina_offset() -> FixedOffset {
    // Offset is a compile-time constant well inside the valid range
    FixedOffset::east_opt(ARGENTINA_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Format a UTC timestamp as an Argentina-local date, `dd/mm/yyyy`
pub fn format_date_ar(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&argentina_offset()).format("%d/%m/%Y").to_string()
}

/// Format a UTC timestamp as an Argentina-local date and time, `dd/mm/yyyy HH:MM`
pub fn format_datetime_ar(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&argentina_offset()).format("%d/%m/%Y %H:%M").to_string()
}

/// Convert a spreadsheet serial date number to a UTC timestamp.
///
/// Serial dates count days since 1899-12-30; fractional parts are time of day.
pub fn spreadsheet_serial_to_datetime(serial: f64) -> Option<DateTime<Utc>> {
    if !serial.is_finite() {
        return None;
    }
    let seconds = (serial - SPREADSHEET_EPOCH_OFFSET_DAYS) * 86_400.0;
    if seconds.abs() > i64::MAX as f64 {
        return None;
    }
    let base = NaiveDateTime::UNIX_EPOCH + Duration::seconds(seconds.round() as i64);
    Some(base.and_utc())
}

/// ISO week number and calendar month used to stamp gate entries
pub fn week_and_month(ts: DateTime<Utc>) -> (u32, u32) {
    let week: IsoWeek = ts.iso_week();
    (week.week(), ts.month())
}

/// Whole minutes between two timestamps, rounded to nearest
pub fn duration_minutes(arrival: DateTime<Utc>, departure: DateTime<Utc>) -> i64 {
    let seconds = (departure - arrival).num_seconds();
    (seconds as f64 / 60.0).round() as i64
}

/// Parse an RFC3339 timestamp stored in the database
pub fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
    }

    #[test]
    fn test_format_date_ar_shifts_across_midnight() {
        // 01:30 UTC is 22:30 the previous day in Argentina
        let ts = Utc.with_ymd_and_hms(2024, 6, 15, 1, 30, 0).unwrap();
        assert_eq!(format_date_ar(ts), "14/06/2024");
    }

    #[test]
    fn test_format_datetime_ar() {
        let ts = Utc.with_ymd_and_hms(2024, 6, 15, 18, 45, 0).unwrap();
        assert_eq!(format_datetime_ar(ts), "15/06/2024 15:45");
    }

    #[test]
    fn test_spreadsheet_serial_epoch() {
        // Serial 25569 is exactly the Unix epoch
        let ts = spreadsheet_serial_to_datetime(25_569.0).unwrap();
        assert_eq!(ts.timestamp(), 0);
    }

    #[test]
    fn test_spreadsheet_serial_known_date() {
        // 2024-01-01 is serial 45292
        let ts = spreadsheet_serial_to_datetime(45_292.0).unwrap();
        assert_eq!(ts.format("%Y-%m-%d").to_string(), "2024-01-01");
    }

    #[test]
    fn test_spreadsheet_serial_with_time_fraction() {
        // Half a day past the epoch is noon
        let ts = spreadsheet_serial_to_datetime(25_569.5).unwrap();
        assert_eq!(ts.format("%H:%M:%S").to_string(), "12:00:00");
    }

    #[test]
    fn test_spreadsheet_serial_rejects_non_finite() {
        assert!(spreadsheet_serial_to_datetime(f64::NAN).is_none());
        assert!(spreadsheet_serial_to_datetime(f64::INFINITY).is_none());
    }

    #[test]
    fn test_week_and_month_iso_boundary() {
        // 2024-12-30 falls in ISO week 1 of 2025 but calendar month 12
        let ts = Utc.with_ymd_and_hms(2024, 12, 30, 12, 0, 0).unwrap();
        let (week, month) = week_and_month(ts);
        assert_eq!(week, 1);
        assert_eq!(month, 12);
    }

    #[test]
    fn test_duration_minutes_rounds() {
        let arrival = Utc.with_ymd_and_hms(2024, 6, 15, 8, 0, 0).unwrap();
        let departure = Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 29).unwrap();
        assert_eq!(duration_minutes(arrival, departure), 90);

        let departure = Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 31).unwrap();
        assert_eq!(duration_minutes(arrival, departure), 91);
    }

    #[test]
    fn test_parse_rfc3339_round_trip() {
        let original = Utc.with_ymd_and_hms(2024, 3, 1, 10, 20, 30).unwrap();
        let parsed = parse_rfc3339(&original.to_rfc3339()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_parse_rfc3339_rejects_garbage() {
        assert!(parse_rfc3339("not a timestamp").is_none());
    }
}
