//! Conditional request module
//!
//! Date-based cache validation (`If-Modified-Since`, `If-Unmodified-Since`)
//! and the `If-Range` validator used by range negotiation. Entity tags are
//! not supported, so any non-date validator never matches.

use chrono::{DateTime, Utc};
use hyper::header::{HeaderMap, HeaderName, IF_MODIFIED_SINCE, IF_RANGE, IF_UNMODIFIED_SINCE};

use super::date::parse_http_date;

/// Parsed `If-Range` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfRange {
    /// An HTTP-date validator
    Date(DateTime<Utc>),
    /// Anything else (entity tags, garbage); never matches
    Unrecognized,
}

impl IfRange {
    /// Whether the range request still applies to a representation last
    /// modified at `last_modified` (exact match, second precision)
    pub fn matches(&self, last_modified: DateTime<Utc>) -> bool {
        match self {
            Self::Date(date) => date.timestamp() == last_modified.timestamp(),
            Self::Unrecognized => false,
        }
    }
}

/// Conditional headers of one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionalContext {
    pub if_modified_since: Option<DateTime<Utc>>,
    pub if_unmodified_since: Option<DateTime<Utc>>,
    pub if_range: Option<IfRange>,
}

/// Result of evaluating the date preconditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Continue with range negotiation and delivery
    Proceed,
    /// 304, no body
    NotModified,
    /// 412, no body
    PreconditionFailed,
}

impl ConditionalContext {
    /// Extract the conditional headers from a request
    ///
    /// Unparsable dates are treated as if the header were absent.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let date_header = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_http_date)
        };

        let if_range = headers.get(IF_RANGE).map(|v| {
            v.to_str()
                .ok()
                .and_then(parse_http_date)
                .map_or(IfRange::Unrecognized, IfRange::Date)
        });

        Self {
            if_modified_since: date_header(IF_MODIFIED_SINCE),
            if_unmodified_since: date_header(IF_UNMODIFIED_SINCE),
            if_range,
        }
    }

    /// Evaluate `If-Unmodified-Since` then `If-Modified-Since`
    ///
    /// Only headers actually present can block the request. A failed
    /// `If-Unmodified-Since` wins over everything else.
    pub fn evaluate(&self, last_modified: DateTime<Utc>) -> Precondition {
        let modified = last_modified.timestamp();

        if let Some(since) = self.if_unmodified_since {
            if modified > since.timestamp() {
                return Precondition::PreconditionFailed;
            }
        }

        if let Some(since) = self.if_modified_since {
            if modified <= since.timestamp() {
                return Precondition::NotModified;
            }
        }

        Precondition::Proceed
    }
}
