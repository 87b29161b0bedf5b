// API module entry
// Runtime management of the file server settings

mod handlers;
mod response;

use hyper::body::Body;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::AppState;
use crate::http::ResponseBody;
use crate::logger;

// Re-export public types
pub use response::*;

/// API route handler
///
/// Dispatches to handler functions based on request path and method
pub async fn handle_api_config<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<ResponseBody>, Infallible>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    if path != "/api/config" {
        logger::log_api_request(method.as_str(), &path, 404);
        return Ok(not_found());
    }

    let response = match method {
        Method::GET => handlers::handle_get_config(&state),
        Method::PUT => handlers::handle_put_config(req, &state).await,
        _ => {
            logger::log_api_request(method.as_str(), &path, 405);
            method_not_allowed()
        }
    };
    Ok(response)
}
