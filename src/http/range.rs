//! HTTP Range request parsing module
//!
//! Range header parsing and negotiation for resumable downloads, compliant
//! with RFC 9110 §14. Multiple ranges are supported and kept in the order the
//! client sent them; overlapping or adjacent ranges are not merged.
//! A header with more than [`MAX_RANGES`] elements is ignored, so a request
//! cannot multiply a file many times over into one multipart body.

use chrono::{DateTime, Utc};

use super::conditional::IfRange;

/// Most range elements honoured in one Range header
pub const MAX_RANGES: usize = 64;

/// One satisfiable byte range, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    pub start: u64,
    pub end: u64,
}

impl RangeSpec {
    /// Number of bytes selected (never zero)
    #[inline]
    pub const fn content_length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value for this range
    pub fn content_range(&self, file_size: u64) -> String {
        format!("bytes {}-{}/{file_size}", self.start, self.end)
    }
}

/// Ordered, non-empty list of satisfiable ranges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangePlan {
    specs: Vec<RangeSpec>,
}

impl RangePlan {
    pub fn specs(&self) -> &[RangeSpec] {
        &self.specs
    }

    /// True when the response needs `multipart/byteranges` framing
    pub fn is_multipart(&self) -> bool {
        self.specs.len() > 1
    }

    /// The only range, if there is exactly one
    pub fn single(&self) -> Option<RangeSpec> {
        match self.specs.as_slice() {
            [spec] => Some(*spec),
            _ => None,
        }
    }

    /// Sum of all selected range lengths, excluding multipart framing
    pub fn total_selected_bytes(&self) -> u64 {
        self.specs.iter().map(RangeSpec::content_length).sum()
    }
}

/// Range header parse result
#[derive(Debug, PartialEq, Eq)]
pub enum RangeParseResult {
    /// At least one satisfiable range - 206
    Valid(RangePlan),
    /// Every range was invalid for this file - 416
    NotSatisfiable,
    /// No Range header, malformed header or stale `If-Range` (full content)
    Full,
}

/// Marker for a syntactically broken byte-range-spec
struct Malformed;

/// Decide which part of a file to send
///
/// `If-Range` only matters when a Range header is present: a validator that
/// does not exactly match `last_modified` turns the request into a plain
/// full-file request instead of failing it.
pub fn negotiate(
    range_header: Option<&str>,
    if_range: Option<&IfRange>,
    file_size: u64,
    last_modified: DateTime<Utc>,
) -> RangeParseResult {
    if range_header.is_none() {
        return RangeParseResult::Full;
    }

    if let Some(validator) = if_range {
        if !validator.matches(last_modified) {
            return RangeParseResult::Full;
        }
    }

    parse_range_header(range_header, file_size)
}

/// Parse HTTP Range header (bytes unit)
///
/// Supported formats, comma separated:
/// - `bytes=start-end` - Specific range (end clamped to the file)
/// - `bytes=start-` - From start to end
/// - `bytes=-suffix` - Last suffix bytes
///
/// # Arguments
/// * `range_header` - Value of Range header
/// * `file_size` - Total file size
///
/// # Examples
/// ```
/// use rangeserve::http::range::{parse_range_header, RangeParseResult};
///
/// // Two ranges
/// let result = parse_range_header(Some("bytes=0-99,200-"), 1000);
/// assert!(matches!(result, RangeParseResult::Valid(ref plan) if plan.is_multipart()));
///
/// // No Range header
/// let result = parse_range_header(None, 1000);
/// assert!(matches!(result, RangeParseResult::Full));
///
/// // Nothing satisfiable
/// let result = parse_range_header(Some("bytes=5000-"), 1000);
/// assert!(matches!(result, RangeParseResult::NotSatisfiable));
/// ```
pub fn parse_range_header(range_header: Option<&str>, file_size: u64) -> RangeParseResult {
    let Some(header) = range_header else {
        return RangeParseResult::Full;
    };

    let Some((unit, set)) = header.split_once('=') else {
        return RangeParseResult::Full;
    };

    if !unit.trim().eq_ignore_ascii_case("bytes") {
        return RangeParseResult::Full; // Not bytes unit, ignore
    }

    let mut seen = 0;
    let mut specs = Vec::new();

    for element in set.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        seen += 1;
        if seen > MAX_RANGES {
            return RangeParseResult::Full;
        }
        match parse_spec(element, file_size) {
            Ok(Some(spec)) => specs.push(spec),
            Ok(None) => {}
            Err(Malformed) => return RangeParseResult::Full,
        }
    }

    if seen == 0 {
        return RangeParseResult::Full;
    }

    if specs.is_empty() {
        return RangeParseResult::NotSatisfiable;
    }

    RangeParseResult::Valid(RangePlan { specs })
}

/// Parse one byte-range-spec and clamp it to the file
///
/// `Ok(None)` means the spec is well formed but unsatisfiable and is dropped.
fn parse_spec(spec: &str, file_size: u64) -> Result<Option<RangeSpec>, Malformed> {
    let (first, last) = spec.split_once('-').ok_or(Malformed)?;

    // Suffix range: "-500" means last 500 bytes
    if first.is_empty() {
        let suffix = parse_position(last)?;
        if suffix == 0 || file_size == 0 {
            return Ok(None);
        }
        return Ok(Some(RangeSpec {
            start: file_size.saturating_sub(suffix),
            end: file_size - 1,
        }));
    }

    let start = parse_position(first)?;
    let end = if last.is_empty() {
        None // Open-ended range
    } else {
        Some(parse_position(last)?)
    };

    if end.is_some_and(|e| start > e) || start >= file_size {
        return Ok(None);
    }

    let last_byte = file_size - 1;
    Ok(Some(RangeSpec {
        start,
        end: end.map_or(last_byte, |e| e.min(last_byte)),
    }))
}

/// Parse a byte position, saturating values too large for u64
fn parse_position(digits: &str) -> Result<u64, Malformed> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Malformed);
    }
    Ok(digits.parse().unwrap_or(u64::MAX))
}
