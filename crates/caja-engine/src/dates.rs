//! Calendar-day windows over UTC timestamps.
//!
//! The one-closure-per-day rule and the day ledger both slice the stream
//! by UTC calendar day; this is the single place that computes those
//! bounds.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

/// Inclusive `[start, end]` bounds of a UTC calendar day.
pub(crate) fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(
        &date
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always a valid time"),
    );
    let end = Utc.from_utc_datetime(
        &date
            .and_hms_milli_opt(23, 59, 59, 999)
            .expect("end of day is always a valid time"),
    );
    (start, end)
}

/// Bounds widened by one day on each side. The extra days exist to catch
/// records written near timezone boundaries; the merge engine's
/// idempotence makes fetching them twice harmless.
pub(crate) fn widened_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let before = date.pred_opt().unwrap_or(date);
    let after = date.succ_opt().unwrap_or(date);
    (day_bounds(before).0, day_bounds(after).1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_cover_the_whole_day() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let (start, end) = day_bounds(date);
        assert_eq!(start.to_rfc3339(), "2024-06-03T00:00:00+00:00");
        assert!(end > start);
        assert_eq!(end.date_naive(), date);
    }

    #[test]
    fn widened_bounds_span_three_days() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let (start, end) = widened_bounds(date);
        assert_eq!(start.date_naive(), NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());
        assert_eq!(end.date_naive(), NaiveDate::from_ymd_opt(2024, 6, 4).unwrap());
    }
}
