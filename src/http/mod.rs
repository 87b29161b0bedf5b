//! HTTP protocol layer module
//!
//! Header parsing and response framing shared by the file server and the
//! request handlers, decoupled from filesystem access.

pub mod body;
pub mod conditional;
pub mod date;
pub mod mime;
pub mod multipart;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use body::ResponseBody;
pub use conditional::{ConditionalContext, IfRange, Precondition};
pub use range::{parse_range_header, RangeParseResult, RangePlan, RangeSpec};
pub use response::{
    build_403_response, build_404_response, build_405_response, build_500_response,
    build_options_response, build_status_response,
};
