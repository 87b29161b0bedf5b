// Runtime file settings handlers

use http_body_util::BodyExt;
use hyper::body::Body;
use hyper::{Request, Response, StatusCode};

use super::response::{bad_request, json_response};
use crate::config::{AppState, FilesUpdate};
use crate::http::ResponseBody;
use crate::logger;

const CONFIG_PATH: &str = "/api/config";

/// Current root directory and buffer size
pub fn handle_get_config(state: &AppState) -> Response<ResponseBody> {
    logger::log_api_request("GET", CONFIG_PATH, 200);
    json_response(StatusCode::OK, &state.files_snapshot())
}

/// Apply a partial update of the file settings
///
/// Nothing is changed unless every supplied field is valid.
pub async fn handle_put_config<B>(req: Request<B>, state: &AppState) -> Response<ResponseBody>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    // Read request body
    let whole_body = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            logger::log_api_request("PUT", CONFIG_PATH, 400);
            return bad_request(&format!("Failed to read request body: {e}"));
        }
    };

    let update: FilesUpdate = match serde_json::from_slice(&whole_body) {
        Ok(u) => u,
        Err(e) => {
            logger::log_api_request("PUT", CONFIG_PATH, 400);
            return bad_request(&format!("Invalid JSON: {e}"));
        }
    };

    if let Err(e) = state.apply_files_update(&update) {
        logger::log_api_request("PUT", CONFIG_PATH, 400);
        return bad_request(&e.to_string());
    }

    if let Some(root) = &update.root_dir {
        logger::log_info(&format!("[API] Root directory changed to {root}"));
    }
    if let Some(size) = update.buffer_size {
        logger::log_info(&format!("[API] Buffer size changed to {size} bytes"));
    }

    logger::log_api_request("PUT", CONFIG_PATH, 200);
    json_response(StatusCode::OK, &state.files_snapshot())
}
