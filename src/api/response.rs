// API response utility functions module

use crate::http::body::{self, ResponseBody};
use crate::logger;
use hyper::{Response, StatusCode};
use serde::Serialize;

/// Build JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<ResponseBody> {
    let json = match serde_json::to_string_pretty(body) {
        Ok(j) => j,
        Err(e) => {
            logger::log_error(&format!("Failed to serialize response: {e}"));
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(body::full(json))
        .unwrap_or_else(|e| {
            logger::log_error(&format!("Failed to build response: {e}"));
            Response::new(body::full("Error"))
        })
}

/// JSON error body `{"error": message}`
pub fn error_response(status: StatusCode, message: &str) -> Response<ResponseBody> {
    let body = serde_json::json!({ "error": message });
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(body::full(body.to_string()))
        .unwrap_or_else(|_| Response::new(body::full(message.to_string())))
}

/// 404 Not Found response
pub fn not_found() -> Response<ResponseBody> {
    error_response(StatusCode::NOT_FOUND, "Not Found")
}

/// 400 Bad Request response
pub fn bad_request(message: &str) -> Response<ResponseBody> {
    error_response(StatusCode::BAD_REQUEST, message)
}

/// 405 Method Not Allowed response
pub fn method_not_allowed() -> Response<ResponseBody> {
    let mut response = error_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
    response
        .headers_mut()
        .insert("Allow", hyper::header::HeaderValue::from_static("GET, PUT"));
    response
}
