//! Request handler module
//!
//! Validates requests on the file listener and dispatches them to the
//! static file server.

pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
