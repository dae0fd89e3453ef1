//! Excel serial date conversion.
//!
//! Excel stores dates as floating-point serial numbers: the integer part
//! counts days since 1899-12-30 (with the Lotus 1-2-3 bug that treats
//! 1900 as a leap year), and the fractional part is the time of day.
//!
//! Because of the phantom 1900-02-29 (serial 60), dates from 1900-03-01
//! onward are a plain day count from 1899-12-30, while January and
//! February 1900 are one lower than that count would give.

use chrono::{NaiveDate, NaiveDateTime, Timelike};

/// Seconds per day, for the fractional time component.
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Day zero of the serial scale once the leap-year bug is accounted for.
fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

/// First real date after the phantom 1900-02-29.
fn lotus_cutover() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 3, 1).unwrap_or_default()
}

/// Convert a date-time to an Excel serial number (1900 date system).
///
/// Whole days land on integers; the time of day becomes the fraction.
/// Dates before 1900-01-01 have no serial in Excel and come out as zero
/// or negative, which Excel shows as `####`.
pub(crate) fn date_to_serial(value: NaiveDateTime) -> f64 {
    let date = value.date();
    let mut days = (date - epoch()).num_days();
    if date < lotus_cutover() {
        days -= 1;
    }

    let seconds = f64::from(value.time().num_seconds_from_midnight());
    let nanos = f64::from(value.time().nanosecond()) / 1e9;

    #[allow(clippy::cast_precision_loss)] // |days| < 2^53 for any chrono date
    let serial = days as f64 + (seconds + nanos) / SECONDS_PER_DAY;
    serial
}

/// Render a number the way a cell `<v>` carries it: shortest round-trip
/// form, no trailing `.0` on integers.
pub(crate) fn format_number(value: f64) -> String {
    if value == 0.0 {
        // Avoid "-0".
        return "0".to_string();
    }
    value.to_string()
}
