//! Static file server with conditional and byte-range request support
//!
//! The [`fileserver`] module is the delivery engine: it resolves a request
//! path below a root directory, evaluates `If-Modified-Since`,
//! `If-Unmodified-Since` and `If-Range`, negotiates `Range` into single or
//! `multipart/byteranges` bodies, and streams the selected bytes in bounded
//! chunks. The remaining modules wrap it into an HTTP/1.1 server with a
//! management API.

pub mod api;
pub mod config;
pub mod fileserver;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
