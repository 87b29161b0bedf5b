//! Delivery engine behaviour through the public `FileServer` API

use http_body_util::BodyExt;
use hyper::header::{HeaderMap, HeaderValue};
use hyper::StatusCode;
use rangeserve::fileserver::{FileError, FileResponse, FileServer};
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};
use tempfile::TempDir;

// Sun, 06 Nov 1994 08:49:37 GMT
const MODIFIED: u64 = 784_111_777;
const SIZE: usize = 3_001;

struct Site {
    dir: TempDir,
    server: FileServer,
    data: Vec<u8>,
}

impl Site {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("public");
        std::fs::create_dir_all(root.join("media")).unwrap();
        std::fs::write(dir.path().join("private.key"), b"-----BEGIN KEY-----").unwrap();

        let data: Vec<u8> = (0..SIZE).map(|i| (i * 7 % 251) as u8).collect();
        let file = root.join("media/track.bin");
        std::fs::write(&file, &data).unwrap();
        std::fs::File::options()
            .write(true)
            .open(&file)
            .unwrap()
            .set_modified(UNIX_EPOCH + Duration::from_secs(MODIFIED))
            .unwrap();

        let server = FileServer::new(&root);
        server.set_buffer_size(97);
        Self { dir, server, data }
    }

    fn root(&self) -> PathBuf {
        self.dir.path().join("public")
    }

    async fn get(
        &self,
        path: &str,
        headers: &[(&'static str, &str)],
    ) -> Result<FileResponse, FileError> {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        self.server.serve(path, &map).await
    }
}

async fn body(response: FileResponse, buffer_size: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let written = response.write_body(&mut out, buffer_size).await.unwrap();
    assert_eq!(written, out.len() as u64);
    out
}

fn header<'a>(response: &'a FileResponse, name: &str) -> &'a str {
    response.headers()[name].to_str().unwrap()
}

#[tokio::test]
async fn every_single_range_matches_the_full_read() {
    let site = Site::new();
    let full = body(site.get("/media/track.bin", &[]).await.unwrap(), 97).await;
    assert_eq!(full, site.data);

    let size = SIZE as u64;
    let points = [0, 1, 96, 97, 98, 1_500, size - 2, size - 1];
    for &a in &points {
        for &b in points.iter().filter(|&&b| b >= a) {
            let range = format!("bytes={a}-{b}");
            let response = site.get("/media/track.bin", &[("range", &range)]).await.unwrap();
            assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT, "{range}");
            assert_eq!(header(&response, "content-range"), format!("bytes {a}-{b}/{size}"));
            assert_eq!(response.content_length(), b - a + 1);
            assert_eq!(
                body(response, 97).await,
                &full[a as usize..=b as usize],
                "{range}"
            );
        }
    }
}

#[tokio::test]
async fn oversized_suffix_covers_whole_file() {
    let site = Site::new();
    let response = site
        .get("/media/track.bin", &[("range", "bytes=-1000000")])
        .await
        .unwrap();
    assert_eq!(header(&response, "content-range"), "bytes 0-3000/3001");
    assert_eq!(body(response, 4096).await, site.data);
}

#[tokio::test]
async fn unsatisfiable_ranges() {
    let site = Site::new();
    for range in ["bytes=-0", "bytes=10-5", "bytes=3001-", "bytes=-0,10-5"] {
        let response = site.get("/media/track.bin", &[("range", range)]).await.unwrap();
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE, "{range}");
        assert_eq!(header(&response, "content-range"), "bytes */3001");
        assert!(body(response, 97).await.is_empty());
    }
}

#[tokio::test]
async fn dropped_elements_leave_the_rest() {
    let site = Site::new();
    let response = site
        .get("/media/track.bin", &[("range", "bytes=-0,100-199")])
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header(&response, "content-range"), "bytes 100-199/3001");
    assert_eq!(body(response, 97).await, &site.data[100..200]);
}

#[tokio::test]
async fn failed_unmodified_since_beats_everything() {
    let site = Site::new();
    let response = site
        .get(
            "/media/track.bin",
            &[
                ("if-unmodified-since", "Sat, 01 Jan 1994 00:00:00 GMT"),
                ("if-modified-since", "Sun, 06 Nov 1994 08:49:37 GMT"),
                ("if-range", "Sun, 06 Nov 1994 08:49:37 GMT"),
                ("range", "bytes=0-0,2-3"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
    assert!(body(response, 97).await.is_empty());
}

#[tokio::test]
async fn stale_if_range_ignores_range() {
    let site = Site::new();
    let response = site
        .get(
            "/media/track.bin",
            &[
                ("if-range", "Sun, 06 Nov 1994 08:49:36 GMT"),
                ("range", "bytes=0-99"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key("content-range"));
    assert_eq!(body(response, 97).await, site.data);
}

#[tokio::test]
async fn traversal_never_reads_outside_root() {
    let site = Site::new();
    for path in [
        "/../private.key",
        "/media/../../private.key",
        "/./media/./../../private.key",
    ] {
        let err = site.get(path, &[]).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN, "{path}");
    }
}

#[cfg(unix)]
#[tokio::test]
async fn symlink_out_of_root_is_forbidden() {
    let site = Site::new();
    std::os::unix::fs::symlink(
        site.dir.path().join("private.key"),
        site.root().join("media/key.bin"),
    )
    .unwrap();

    let err = site.get("/media/key.bin", &[]).await.unwrap_err();
    assert!(matches!(err, FileError::PathTraversal(_)));
}

#[tokio::test]
async fn two_part_multipart_body() {
    let site = Site::new();
    let response = site
        .get("/media/track.bin", &[("range", "bytes=0-0,2-3")])
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);

    let content_type = header(&response, "content-type").to_string();
    let boundary = content_type
        .strip_prefix("multipart/byteranges; boundary=")
        .unwrap()
        .to_string();
    let declared = response.content_length();

    let raw = body(response, 97).await;
    assert_eq!(raw.len() as u64, declared);

    let text = raw.iter().map(|&b| b as char).collect::<String>();
    let delimiter = format!("--{boundary}");
    assert!(text.starts_with(&delimiter));
    assert!(text.ends_with(&format!("\r\n--{boundary}--\r\n")));

    let parts: Vec<&str> = text
        .trim_end_matches(&format!("\r\n--{boundary}--\r\n"))
        .split(&delimiter)
        .filter(|p| !p.is_empty())
        .collect();
    assert_eq!(parts.len(), 2);

    let expected = [("0-0", &site.data[0..=0]), ("2-3", &site.data[2..=3])];
    for (part, (range, bytes)) in parts.iter().zip(expected) {
        let (head, content) = part.split_once("\r\n\r\n").unwrap();
        assert!(head.contains(&format!("Content-Range: bytes {range}/3001")));
        let content = content.trim_end_matches("\r\n");
        let content: Vec<u8> = content.chars().map(|c| c as u8).collect();
        assert_eq!(content, bytes);
    }
}

#[tokio::test]
async fn error_page_body_and_status() {
    let site = Site::new();
    let page = site.root().join("media/track.bin");
    let response = FileServer::serve_file_with_status(&page, StatusCode::NOT_FOUND)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(response, 97).await, site.data);

    let missing_page = Path::new("/no/such/page.html");
    let missing = FileServer::serve_file_with_status(missing_page, StatusCode::NOT_FOUND).await;
    assert!(matches!(missing, Err(FileError::NotFound(_))));
}

#[tokio::test]
async fn repeated_requests_are_identical() {
    let site = Site::new();
    let request = [
        ("range", "bytes=5-9,-3,100-"),
        ("if-range", "Sun, 06 Nov 1994 08:49:37 GMT"),
    ];

    let first = site.get("/media/track.bin", &request).await.unwrap();
    let second = site.get("/media/track.bin", &request).await.unwrap();
    assert_eq!(first.status(), second.status());
    assert_eq!(first.headers(), second.headers());

    let first = first
        .into_response(97, false)
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes();
    let second = body(second, 13).await;
    assert_eq!(&first[..], &second[..]);
}

#[tokio::test]
async fn modified_file_with_only_range_is_partial() {
    let site = Site::new();
    std::fs::File::options()
        .write(true)
        .open(site.root().join("media/track.bin"))
        .unwrap()
        .set_modified(UNIX_EPOCH + Duration::from_secs(MODIFIED + 3_600))
        .unwrap();

    let response = site
        .get("/media/track.bin", &[("range", "bytes=0-9")])
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
}

#[tokio::test]
async fn range_flood_gets_the_plain_file() {
    let site = Site::new();
    let flood = format!("bytes={}", vec!["0-"; 1_000].join(","));
    let response = site.get("/media/track.bin", &[("range", &flood)]).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.content_length(), SIZE as u64);
    assert_eq!(body(response, 97).await, site.data);
}
