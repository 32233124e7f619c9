//! Billing period date arithmetic.
//!
//! The default period is the last full calendar month, computed from an
//! explicit `today` so the calculation stays deterministic and testable;
//! only the caller reaches for the clock.

use anyhow::{Result, bail};
use chrono::{DateTime, Datelike, Local, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};

/// Returns the first and last day of the month before `today`.
///
/// Called on 2024-11-11 this returns (2024-10-01, 2024-10-31).
#[must_use]
pub fn last_full_month(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first_this_month = today.with_day0(0).unwrap();
    let last_day_last_month = first_this_month - chrono::Duration::days(1);
    let first_day_last_month = last_day_last_month.with_day0(0).unwrap();
    (first_day_last_month, last_day_last_month)
}

/// Returns the last day of `date`'s month.
#[must_use]
pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let first_next_month = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    };
    first_next_month.unwrap() - chrono::Duration::days(1)
}

/// Resolves the requested period, defaulting to the last full month.
///
/// `start` and `end` must be given together (clap enforces this too), and
/// the range must not be inverted.
pub fn resolve_period(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate)> {
    match (start, end) {
        (Some(start), Some(end)) => {
            if end < start {
                bail!("period end {end} is before start {start}");
            }
            Ok((start, end))
        }
        (None, None) => Ok(last_full_month(today)),
        _ => bail!("--start and --end must be given together"),
    }
}

/// Converts a local date at midnight to UTC.
/// Handles DST ambiguity by picking the earlier time.
fn local_midnight_to_utc(local_date: NaiveDate) -> DateTime<Utc> {
    let midnight = local_date.and_time(NaiveTime::from_hms_opt(0, 0, 0).unwrap());
    match Local.from_local_datetime(&midnight) {
        // Single or ambiguous (DST fall-back): use the earlier time
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => {
            // DST spring-forward gap at midnight is rare but possible
            // Use 1am local which is guaranteed to exist
            let one_am = local_date.and_time(NaiveTime::from_hms_opt(1, 0, 0).unwrap());
            Local
                .from_local_datetime(&one_am)
                .unwrap()
                .with_timezone(&Utc)
        }
    }
}

/// UTC bounds for an inclusive local date range, as a half-open interval:
/// start-of-day on `start` up to start-of-day on the day after `end`.
#[must_use]
pub fn period_bounds(start: NaiveDate, end: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let lower = local_midnight_to_utc(start);
    let upper = local_midnight_to_utc(end + chrono::Duration::days(1));
    (lower, upper)
}
