//! Request routing dispatch module
//!
//! Entry point for HTTP request processing, responsible for method
//! validation, path decoding and dispatching to the file server.

use crate::config::AppState;
use crate::handler::static_files;
use crate::http::{self, ResponseBody};
use crate::logger::{self, AccessLogEntry};
use hyper::body::Body;
use hyper::header::{HeaderMap, HeaderName, RANGE, REFERER, USER_AGENT};
use hyper::{Method, Request, Response, Version};
use percent_encoding::percent_decode_str;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    pub headers: &'a HeaderMap,
    pub is_head: bool,
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<ResponseBody>, Infallible> {
    let started = Instant::now();
    let response = route_request(&req, &state).await;

    if state.access_log_enabled() {
        log_access(&req, &response, &state, remote_addr, started);
    }
    Ok(response)
}

async fn route_request<B>(req: &Request<B>, state: &AppState) -> Response<ResponseBody> {
    // 1. Check HTTP method
    if let Some(resp) = check_http_method(req.method()) {
        return resp;
    }

    let is_head = *req.method() == Method::HEAD;

    // 2. Decode path; bytes that are not UTF-8 cannot name a servable file
    let Ok(path) = percent_decode_str(req.uri().path()).decode_utf8() else {
        logger::log_debug(&format!("Undecodable request path: {}", req.uri().path()));
        return static_files::not_found(state, is_head).await;
    };

    // 3. Serve the file; anything not handled falls through to 404
    let ctx = RequestContext {
        headers: req.headers(),
        is_head,
    };
    match static_files::handle(&state.files, &ctx, &path).await {
        Some(resp) => static_files::with_error_page(resp, state, is_head).await,
        None => static_files::not_found(state, is_head).await,
    }
}

/// Check HTTP method and return appropriate response for non-GET/HEAD methods
fn check_http_method(method: &Method) -> Option<Response<ResponseBody>> {
    match *method {
        Method::GET | Method::HEAD => None,
        Method::OPTIONS => Some(http::build_options_response()),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

fn log_access<B>(
    req: &Request<B>,
    response: &Response<ResponseBody>,
    state: &AppState,
    remote_addr: SocketAddr,
    started: Instant,
) {
    let header = |name: HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        remote_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = http_version(req.version()).to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry.range = header(RANGE);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

    logger::log_access(&entry, &state.config.logging.access_log_format);
}

fn http_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use http_body_util::{BodyExt, Empty};
    use hyper::body::Bytes;
    use hyper::StatusCode;
    use tempfile::TempDir;

    fn state_for(root: &std::path::Path) -> Arc<AppState> {
        let mut config = Config::load_from("nonexistent-config-file").unwrap();
        config.files.root_dir = root.display().to_string();
        config.logging.access_log = false;
        Arc::new(AppState::new(&config))
    }

    fn request(method: Method, uri: &str) -> Request<Empty<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Empty::new())
            .unwrap()
    }

    async fn call(req: Request<Empty<Bytes>>, state: &Arc<AppState>) -> Response<ResponseBody> {
        handle_request(req, Arc::clone(state), "127.0.0.1:40000".parse().unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let dir = TempDir::new().unwrap();
        let state = state_for(dir.path());
        let resp = call(request(Method::POST, "/a.txt"), &state).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()["allow"], "GET, HEAD, OPTIONS");
    }

    #[tokio::test]
    async fn test_options() {
        let dir = TempDir::new().unwrap();
        let state = state_for(dir.path());
        let resp = call(request(Method::OPTIONS, "/a.txt"), &state).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_percent_decoded_path() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("hello world.txt"), b"hi there").unwrap();
        let state = state_for(dir.path());

        let resp = call(request(Method::GET, "/hello%20world.txt"), &state).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-type"], "text/plain; charset=utf-8");
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"hi there");
    }

    #[tokio::test]
    async fn test_encoded_traversal_forbidden() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("www");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(dir.path().join("secret.txt"), b"secret").unwrap();
        let state = state_for(&root);

        let resp = call(request(Method::GET, "/%2e%2e/secret.txt"), &state).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_invalid_utf8_not_found() {
        let dir = TempDir::new().unwrap();
        let state = state_for(dir.path());
        let resp = call(request(Method::GET, "/%ff%fe.txt"), &state).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_http_version() {
        assert_eq!(http_version(Version::HTTP_10), "1.0");
        assert_eq!(http_version(Version::HTTP_11), "1.1");
        assert_eq!(http_version(Version::HTTP_2), "2");
    }
}
