//! `multipart/byteranges` framing module
//!
//! Builds the delimiter lines and per-part headers that surround each range
//! of a multi-range 206 response (RFC 9110 §14.6). Part bodies are streamed
//! separately; this module only produces the framing bytes.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

use super::range::{RangePlan, RangeSpec};

/// Framing for one multi-range response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Multipart {
    boundary: String,
    file_size: u64,
}

impl Multipart {
    /// Framing with a boundary derived from the file identity
    ///
    /// The same file (path, size, modification time) always yields the same
    /// boundary, so repeated requests produce byte-identical bodies.
    pub fn for_file(path: &Path, file_size: u64, modified_secs: i64) -> Self {
        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        file_size.hash(&mut hasher);
        modified_secs.hash(&mut hasher);
        Self::with_boundary(format!("rangeserve-{:016x}", hasher.finish()), file_size)
    }

    pub const fn with_boundary(boundary: String, file_size: u64) -> Self {
        Self {
            boundary,
            file_size,
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// `Content-Type` header value of the whole response
    pub fn content_type(&self) -> String {
        format!("multipart/byteranges; boundary={}", self.boundary)
    }

    /// Delimiter and headers preceding a part
    ///
    /// The first part has no leading CRLF; every later delimiter also ends
    /// the previous part's body.
    pub fn part_header(&self, spec: &RangeSpec, first: bool) -> String {
        let separator = if first { "" } else { "\r\n" };
        format!(
            "{separator}--{}\r\nContent-Range: {}\r\n\r\n",
            self.boundary,
            spec.content_range(self.file_size)
        )
    }

    /// Close delimiter after the last part
    pub fn closing(&self) -> String {
        format!("\r\n--{}--\r\n", self.boundary)
    }

    /// Exact body length for `plan`, framing included
    pub fn content_length(&self, plan: &RangePlan) -> u64 {
        let framing: usize = plan
            .specs()
            .iter()
            .enumerate()
            .map(|(i, spec)| self.part_header(spec, i == 0).len())
            .sum::<usize>()
            + self.closing().len();
        framing as u64 + plan.total_selected_bytes()
    }
}
