//! Time and date calculation utilities.
//!
//! Realm links change on the weekly realm reset, which happens on Friday 18:15 UTC for the EU
//! region and on Saturday 02:15 UTC for the NA region. The topology is refreshed at whichever
//! of the two comes first.

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};

use crate::server::error::Error;

/// Weekly realm resets as (weekday, hour, minute) in UTC.
pub const REALM_RESETS: [(Weekday, u32, u32); 2] = [(Weekday::Fri, 18, 15), (Weekday::Sat, 2, 15)];

/// Calculates the next weekly occurrence of `weekday` at `hour:minute` UTC strictly after `now`.
///
/// # Returns
/// - `Ok(DateTime<Utc>)` - Next occurrence
/// - `Err(Error::ParseError)` - `hour`/`minute` do not form a valid time of day
pub fn next_weekly_occurrence(
    now: DateTime<Utc>,
    weekday: Weekday,
    hour: u32,
    minute: u32,
) -> Result<DateTime<Utc>, Error> {
    let days_ahead = (weekday.num_days_from_monday() + 7 - now.weekday().num_days_from_monday()) % 7;
    let candidate = (now.date_naive() + Duration::days(days_ahead as i64))
        .and_hms_opt(hour, minute, 0)
        .ok_or_else(|| {
            Error::ParseError(format!(
                "Failed to build weekly occurrence at {:02}:{:02} UTC",
                hour, minute
            ))
        })?
        .and_utc();

    Ok(if candidate <= now {
        candidate + Duration::days(7)
    } else {
        candidate
    })
}

/// Calculates the next realm reset strictly after `now`.
///
/// # Example
/// ```ignore
/// // Wednesday 2024-01-10 12:00 UTC, the EU reset comes first
/// let now = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
/// assert_eq!(next_realm_reset(now)?, Utc.with_ymd_and_hms(2024, 1, 12, 18, 15, 0).unwrap());
/// ```
pub fn next_realm_reset(now: DateTime<Utc>) -> Result<DateTime<Utc>, Error> {
    let mut next: Option<DateTime<Utc>> = None;

    for (weekday, hour, minute) in REALM_RESETS {
        let occurrence = next_weekly_occurrence(now, weekday, hour, minute)?;
        next = Some(match next {
            Some(current) if current <= occurrence => current,
            _ => occurrence,
        });
    }

    next.ok_or_else(|| Error::InternalError("No realm reset configured".to_string()))
}
