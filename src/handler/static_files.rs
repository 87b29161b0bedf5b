//! Static file serving module
//!
//! Runs the file server for a request and layers the representation headers
//! (`Content-Type`, `Last-Modified`) and configured error pages on top.

use crate::config::AppState;
use crate::fileserver::{FileError, FileResponse, FileServer};
use crate::handler::router::RequestContext;
use crate::http::{self, date, mime, ResponseBody};
use crate::logger;
use hyper::header::{HeaderValue, CONTENT_TYPE, LAST_MODIFIED};
use hyper::{Response, StatusCode};
use std::path::Path;

/// Answer a request for `path` from `files`
///
/// Returns `None` when there is no file to serve, leaving the response to
/// the caller. Forbidden paths and read failures are answered here with a
/// bare status response.
pub async fn handle(
    files: &FileServer,
    request: &RequestContext<'_>,
    path: &str,
) -> Option<Response<ResponseBody>> {
    match files.serve(path, request.headers).await {
        Ok(mut file_response) => {
            add_representation_headers(&mut file_response);
            Some(file_response.into_response(files.buffer_size(), request.is_head))
        }
        Err(FileError::NotFound(_)) => {
            logger::log_debug(&format!("Not handled: {path}"));
            None
        }
        Err(e) => {
            if e.status() == StatusCode::FORBIDDEN {
                logger::log_info(&format!("Forbidden: {e}"));
            } else {
                logger::log_error(&e.to_string());
            }
            Some(http::build_status_response(e.status()))
        }
    }
}

/// 404 response, using the configured page when there is one
pub async fn not_found(state: &AppState, is_head: bool) -> Response<ResponseBody> {
    let page = state.config.files.not_found_page.as_deref();
    error_page(StatusCode::NOT_FOUND, page, state, is_head).await
}

/// Swap a bare 403 for the configured forbidden page
pub async fn with_error_page(
    response: Response<ResponseBody>,
    state: &AppState,
    is_head: bool,
) -> Response<ResponseBody> {
    match (response.status(), state.config.files.forbidden_page.as_deref()) {
        (StatusCode::FORBIDDEN, Some(page)) => {
            error_page(StatusCode::FORBIDDEN, Some(page), state, is_head).await
        }
        _ => response,
    }
}

async fn error_page(
    status: StatusCode,
    page: Option<&str>,
    state: &AppState,
    is_head: bool,
) -> Response<ResponseBody> {
    let Some(page) = page else {
        return http::build_status_response(status);
    };

    let path = Path::new(page);
    match FileServer::serve_file_with_status(path, status).await {
        Ok(mut response) => {
            if let Ok(value) = HeaderValue::from_str(mime::content_type_for(path)) {
                response.insert_header(CONTENT_TYPE, value);
            }
            response.into_response(state.files.buffer_size(), is_head)
        }
        Err(e) => {
            logger::log_warning(&format!("Error page unavailable: {e}"));
            http::build_status_response(status)
        }
    }
}

/// `Content-Type` for single-part bodies and `Last-Modified` for every
/// response describing the file
fn add_representation_headers(response: &mut FileResponse) {
    let status = response.status();
    let Some(resource) = response.resource() else {
        return;
    };

    let content_type = (matches!(status, StatusCode::OK | StatusCode::PARTIAL_CONTENT)
        && !response.headers().contains_key(CONTENT_TYPE))
    .then(|| mime::content_type_for(resource.file_name()));

    let last_modified = matches!(
        status,
        StatusCode::OK | StatusCode::PARTIAL_CONTENT | StatusCode::NOT_MODIFIED
    )
    .then(|| date::format_http_date(&resource.last_modified));

    if let Some(value) = content_type {
        response.insert_header(CONTENT_TYPE, HeaderValue::from_static(value));
    }
    if let Some(value) = last_modified.and_then(|v| HeaderValue::from_str(&v).ok()) {
        response.insert_header(LAST_MODIFIED, value);
    }
}
