//! End-to-end requests over TCP against both listeners

use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Bytes;
use hyper::client::conn::http1;
use hyper::{Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use rangeserve::config::{AppState, Config};
use rangeserve::server::{create_reusable_listener, start_server_loop, ServerLoopConfig};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpStream;
use tokio::task::LocalSet;

struct Reply {
    status: StatusCode,
    headers: hyper::HeaderMap,
    body: Bytes,
}

fn start(state: &Arc<AppState>, is_api_server: bool) -> SocketAddr {
    let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::task::spawn_local(start_server_loop(
        listener,
        Arc::clone(state),
        Arc::new(AtomicUsize::new(0)),
        ServerLoopConfig {
            is_api_server,
            check_connection_limits: !is_api_server,
        },
    ));
    addr
}

async fn send<B>(addr: SocketAddr, request: Request<B>) -> Reply
where
    B: hyper::body::Body + 'static,
    B::Data: Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let stream = TcpStream::connect(addr).await.unwrap();
    let (mut sender, conn) = http1::handshake(TokioIo::new(stream)).await.unwrap();
    tokio::task::spawn_local(conn);

    let response = sender.send_request(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    Reply {
        status,
        headers,
        body,
    }
}

fn get(path: &str, headers: &[(&str, &str)]) -> Request<Empty<Bytes>> {
    let mut builder = Request::builder().uri(path).header("host", "localhost");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Empty::new()).unwrap()
}

fn run_local<F: Future>(test: F) -> F::Output {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(LocalSet::new().run_until(test))
}

fn site() -> (TempDir, Arc<AppState>, Vec<u8>) {
    let dir = TempDir::new().unwrap();
    let data: Vec<u8> = (0..200_000u32).map(|i| (i % 256) as u8).collect();
    std::fs::write(dir.path().join("movie.mp4"), &data).unwrap();

    let mut config = Config::load_from("nonexistent-config-file").unwrap();
    config.files.root_dir = dir.path().display().to_string();
    config.files.buffer_size = 8_192;
    config.logging.access_log = false;
    (dir, Arc::new(AppState::new(&config)), data)
}

#[test]
fn full_download_streams_whole_file() {
    let (_dir, state, data) = site();
    run_local(async move {
        let addr = start(&state, false);
        let reply = send(addr, get("/movie.mp4", &[])).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.headers["content-length"], "200000");
        assert_eq!(reply.headers["accept-ranges"], "bytes");
        assert_eq!(reply.headers["content-type"], "video/mp4");
        assert!(reply.headers.contains_key("last-modified"));
        assert_eq!(&reply.body[..], &data[..]);
    });
}

#[test]
fn resumed_download() {
    let (_dir, state, data) = site();
    run_local(async move {
        let addr = start(&state, false);
        let reply = send(addr, get("/movie.mp4", &[("range", "bytes=150000-")])).await;

        assert_eq!(reply.status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(reply.headers["content-range"], "bytes 150000-199999/200000");
        assert_eq!(&reply.body[..], &data[150_000..]);
    });
}

#[test]
fn conditional_revalidation() {
    let (_dir, state, _data) = site();
    run_local(async move {
        let addr = start(&state, false);
        let first = send(addr, get("/movie.mp4", &[])).await;
        let last_modified = first.headers["last-modified"].to_str().unwrap().to_string();

        let reply = send(
            addr,
            get("/movie.mp4", &[("if-modified-since", last_modified.as_str())]),
        )
        .await;
        assert_eq!(reply.status, StatusCode::NOT_MODIFIED);
        assert!(reply.body.is_empty());
    });
}

#[test]
fn head_request_sends_headers_only() {
    let (_dir, state, _data) = site();
    run_local(async move {
        let addr = start(&state, false);
        let request = Request::builder()
            .method(Method::HEAD)
            .uri("/movie.mp4")
            .header("host", "localhost")
            .body(Empty::<Bytes>::new())
            .unwrap();
        let reply = send(addr, request).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.headers["content-length"], "200000");
        assert!(reply.body.is_empty());
    });
}

#[test]
fn missing_and_forbidden() {
    let (_dir, state, _data) = site();
    run_local(async move {
        let addr = start(&state, false);
        assert_eq!(
            send(addr, get("/nothing.mp4", &[])).await.status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            send(addr, get("/%2e%2e/%2e%2e/etc/passwd", &[])).await.status,
            StatusCode::FORBIDDEN
        );
        assert_eq!(send(addr, get("/", &[])).await.status, StatusCode::FORBIDDEN);
    });
}

#[test]
fn admin_api_changes_buffer_size() {
    let (_dir, state, data) = site();
    run_local(async move {
        let files = start(&state, false);
        let api = start(&state, true);

        let request = Request::builder()
            .method(Method::PUT)
            .uri("/api/config")
            .header("host", "localhost")
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from_static(br#"{"buffer_size": 1000}"#)))
            .unwrap();
        let reply = send(api, request).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(state.files.buffer_size(), 1_000);

        let reply = send(api, get("/api/config", &[])).await;
        let json: serde_json::Value = serde_json::from_slice(&reply.body).unwrap();
        assert_eq!(json["buffer_size"], 1_000);

        let reply = send(files, get("/movie.mp4", &[("range", "bytes=0-4999")])).await;
        assert_eq!(&reply.body[..], &data[..5_000]);
    });
}
