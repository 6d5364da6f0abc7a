// crates/grc-core/src/dates.rs
// ============================================================================
// Module: GRC Date Arithmetic
// Description: Review due dates, overdue windows, and DSR deadlines.
// Purpose: Keep every calendar rule in one deterministic place.
// Dependencies: time
// ============================================================================

//! ## Overview
//! All functions here take the current instant or day as an argument and never
//! read the wall clock, so the store and scheduler can be driven from tests.
//! Dates are persisted as `YYYY-MM-DD` and instants as fixed-width UTC
//! timestamps with millisecond precision, which keeps lexical order equal to
//! chronological order inside SQL comparisons.

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::Date;
use time::Duration;
use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::UtcOffset;
use time::format_description::FormatItem;
use time::macros::format_description;

use crate::error::GrcError;
use crate::error::GrcResult;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Days past the due date after which a control counts as overdue.
pub const OVERDUE_GRACE_DAYS: i64 = 7;

/// Statutory GDPR response window in days.
pub const DSR_RESPONSE_DAYS: i64 = 30;

/// Calendar date storage format.
const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Instant storage format (always UTC, millisecond precision).
const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");

// ============================================================================
// SECTION: Review Arithmetic
// ============================================================================

/// Returns the review due date `interval_days` after `from`.
///
/// # Errors
///
/// Returns a validation error when the interval is zero or the due date
/// falls outside the calendar.
pub fn next_review_due(from: Date, interval_days: u32) -> GrcResult<Date> {
    if interval_days == 0 {
        return Err(GrcError::validation("review interval must be positive"));
    }
    from.checked_add(Duration::days(i64::from(interval_days)))
        .ok_or_else(|| GrcError::validation("review due date out of range"))
}

/// Returns true when a control with the given due date needs review today.
#[must_use]
pub fn is_review_due(due: Date, today: Date) -> bool {
    due <= today
}

/// Returns the latest due date that counts as overdue on `today`.
#[must_use]
pub fn overdue_cutoff(today: Date) -> Date {
    today.checked_sub(Duration::days(OVERDUE_GRACE_DAYS)).unwrap_or(Date::MIN)
}

/// Returns true when a control is at least [`OVERDUE_GRACE_DAYS`] past due.
#[must_use]
pub fn is_review_overdue(due: Date, today: Date) -> bool {
    due <= overdue_cutoff(today)
}

/// Returns the whole number of days `today` is past `due` (zero if not past).
#[must_use]
pub fn days_past_due(due: Date, today: Date) -> i64 {
    (today - due).whole_days().max(0)
}

/// Returns the first day of the month containing `today`.
#[must_use]
pub fn start_of_month(today: Date) -> Date {
    today.replace_day(1).unwrap_or(today)
}

// ============================================================================
// SECTION: DSR Arithmetic
// ============================================================================

/// Returns the statutory deadline for a request received at `received_at`.
#[must_use]
pub fn dsr_deadline(received_at: OffsetDateTime) -> Date {
    let received = received_at.to_offset(UtcOffset::UTC).date();
    received.checked_add(Duration::days(DSR_RESPONSE_DAYS)).unwrap_or(Date::MAX)
}

// ============================================================================
// SECTION: Formatting
// ============================================================================

/// Truncates an instant to UTC millisecond precision, the stored resolution.
#[must_use]
pub fn normalize_instant(instant: OffsetDateTime) -> OffsetDateTime {
    let utc = instant.to_offset(UtcOffset::UTC);
    let millis = utc.millisecond();
    utc.replace_millisecond(millis).unwrap_or(utc)
}

/// Formats a calendar date for storage.
#[must_use]
pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT).unwrap_or_else(|_| date.to_string())
}

/// Parses a stored calendar date.
///
/// # Errors
///
/// Returns a validation error when the text is not `YYYY-MM-DD`.
pub fn parse_date(value: &str) -> GrcResult<Date> {
    Date::parse(value, DATE_FORMAT)
        .map_err(|err| GrcError::validation(format!("invalid date {value}: {err}")))
}

/// Formats an instant for storage.
///
/// # Errors
///
/// Returns an internal error when the instant cannot be rendered.
pub fn format_timestamp(instant: OffsetDateTime) -> GrcResult<String> {
    normalize_instant(instant)
        .format(TIMESTAMP_FORMAT)
        .map_err(|err| GrcError::internal(format!("timestamp format failed: {err}")))
}

/// Parses a stored instant.
///
/// # Errors
///
/// Returns an internal error when the stored text is malformed.
pub fn parse_timestamp(value: &str) -> GrcResult<OffsetDateTime> {
    PrimitiveDateTime::parse(value, TIMESTAMP_FORMAT)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|err| GrcError::internal(format!("invalid stored timestamp {value}: {err}")))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use proptest::prelude::*;
    use time::Date;
    use time::Duration;
    use time::macros::date;
    use time::macros::datetime;

    use super::*;

    #[test]
    fn thirty_day_control_becomes_due_on_day_thirty() {
        let activated = date!(2026 - 01 - 01);
        let due = next_review_due(activated, 30).unwrap();
        for day in 0..60_i64 {
            let today = activated + Duration::days(day);
            assert_eq!(is_review_due(due, today), day >= 30, "due on day {day}");
            assert_eq!(is_review_overdue(due, today), day >= 37, "overdue on day {day}");
        }
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(next_review_due(date!(2026 - 03 - 01), 0).is_err());
    }

    #[test]
    fn long_intervals_are_accepted_until_the_calendar_ends() {
        let due = next_review_due(date!(2026 - 03 - 01), 4_000).unwrap();
        assert_eq!(due, date!(2037 - 02 - 11));
        assert!(next_review_due(Date::MAX, 1).is_err());
    }

    #[test]
    fn dsr_deadline_is_thirty_days_out() {
        let received = datetime!(2026-02-10 23:30 UTC);
        assert_eq!(dsr_deadline(received), date!(2026 - 03 - 12));
    }

    #[test]
    fn timestamps_round_trip_at_millisecond_precision() {
        let instant = datetime!(2026-05-04 10:11:12.345 UTC);
        let text = format_timestamp(instant).unwrap();
        assert_eq!(text, "2026-05-04T10:11:12.345Z");
        assert_eq!(parse_timestamp(&text).unwrap(), instant);
    }

    #[test]
    fn start_of_month_and_days_past_due() {
        assert_eq!(start_of_month(date!(2026 - 07 - 19)), date!(2026 - 07 - 01));
        assert_eq!(days_past_due(date!(2026 - 07 - 01), date!(2026 - 07 - 19)), 18);
        assert_eq!(days_past_due(date!(2026 - 07 - 19), date!(2026 - 07 - 01)), 0);
    }

    proptest! {
        #[test]
        fn due_date_always_advances_by_interval(offset in 0_i64..20_000, interval in 1_u32..=20_000) {
            let from = Date::from_julian_day(2_450_000 + i32::try_from(offset).unwrap()).unwrap();
            let due = next_review_due(from, interval).unwrap();
            prop_assert_eq!((due - from).whole_days(), i64::from(interval));
            prop_assert!(is_review_due(due, due));
            prop_assert!(!is_review_overdue(due, due));
        }
    }
}
