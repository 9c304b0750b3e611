//! Excel serial date conversion

use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Convert an Excel 1900-system serial number to a date/time.
///
/// The epoch is 1899-12-30: Excel treats 1900 as a leap year (the Lotus 1-2-3
/// bug), so serials >= 61 line up with real dates only when counted from two
/// days before 1900-01-01. Serials below 60 come out one day early; files in
/// the wild effectively never store dates in that range.
///
/// Returns `None` for negative, non-finite, or out-of-range serials.
pub(crate) fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }

    let days = Duration::try_days(serial.trunc() as i64)?;
    // Round the day fraction to milliseconds to absorb float noise
    let millis = Duration::try_milliseconds((serial.fract() * 86_400_000.0).round() as i64)?;

    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    epoch.checked_add_signed(days)?.checked_add_signed(millis)
}
