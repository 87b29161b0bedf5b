//! HTTP-date module
//!
//! Parses and formats the date values carried by conditional request headers.
//! Recipients must accept all three historical formats (RFC 9110 §5.6.7):
//!
//! - IMF-fixdate / RFC 1123: `Sun, 06 Nov 1994 08:49:37 GMT`
//! - RFC 850: `Sunday, 06-Nov-94 08:49:37 GMT`
//! - ANSI C `asctime()`: `Sun Nov  6 08:49:37 1994`

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc};
use std::time::SystemTime;

const IMF_FIXDATE: &str = "%a, %d %b %Y %H:%M:%S GMT";
const RFC850_DATE: &str = "%A, %d-%b-%Y %H:%M:%S GMT";
const ASCTIME_DATE: &str = "%a %b %d %H:%M:%S %Y";

/// Parse an HTTP-date header value
///
/// Returns `None` for anything that is not one of the three accepted formats,
/// so callers can treat malformed headers as absent. A weekday that does not
/// agree with the date also makes the value malformed.
///
/// RFC 850 dates carry a two-digit year. It is placed in the century that
/// keeps it at most 50 years ahead of the current year; if the weekday only
/// fits the century before, that one is taken.
///
/// # Examples
/// ```
/// use rangeserve::http::date::parse_http_date;
///
/// let a = parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT");
/// let b = parse_http_date("Sunday, 06-Nov-94 08:49:37 GMT");
/// let c = parse_http_date("Sun Nov  6 08:49:37 1994");
/// assert!(a.is_some());
/// assert_eq!(a, b);
/// assert_eq!(b, c);
/// assert!(parse_http_date("yesterday").is_none());
/// ```
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    // asctime pads single-digit days with a space; collapse runs of whitespace
    let normalized = value.split_whitespace().collect::<Vec<_>>().join(" ");

    [IMF_FIXDATE, ASCTIME_DATE]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&normalized, format).ok())
        .or_else(|| parse_rfc850(&normalized, Utc::now().year()))
        .map(|naive| naive.and_utc())
}

/// `Sunday, 06-Nov-94 08:49:37 GMT`, with the century chosen relative to
/// `current_year`
fn parse_rfc850(value: &str, current_year: i32) -> Option<NaiveDateTime> {
    let (weekday, rest) = value.split_once(", ")?;
    let (date, time) = rest.split_once(' ')?;
    let mut fields = date.splitn(3, '-');
    let (day, month, year) = (fields.next()?, fields.next()?, fields.next()?);
    if year.len() != 2 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = year.parse().ok()?;

    let mut full_year = current_year - current_year.rem_euclid(100) + year;
    if full_year > current_year + 50 {
        full_year -= 100;
    }

    [full_year, full_year - 100].iter().find_map(|candidate| {
        let expanded = format!("{weekday}, {day}-{month}-{candidate} {time}");
        NaiveDateTime::parse_from_str(&expanded, RFC850_DATE).ok()
    })
}

/// Format a timestamp as IMF-fixdate, e.g. for `Last-Modified`
pub fn format_http_date(time: &DateTime<Utc>) -> String {
    time.format(IMF_FIXDATE).to_string()
}

/// Convert a filesystem timestamp to whole-second UTC
///
/// HTTP dates carry no sub-second component, so comparisons against them
/// must drop it on the filesystem side too.
pub fn truncate_to_seconds(time: SystemTime) -> DateTime<Utc> {
    let time = DateTime::<Utc>::from(time);
    time.with_nanosecond(0).unwrap_or(time)
}
