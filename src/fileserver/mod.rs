//! Static file delivery engine
//!
//! Runs one request through path resolution, metadata probe, conditional
//! evaluation and range negotiation, and produces a [`FileResponse`]: the
//! status, the headers this engine is responsible for, and a plan of which
//! bytes to stream. Every decision is made before the response head is
//! committed; once streaming starts the only remaining failure mode is an
//! aborted body.
//!
//! `Content-Type`, `Last-Modified`, caching headers and entity tags are left
//! to the caller.

mod metadata;
mod resolve;
mod settings;
pub mod stream;

use hyper::body::Bytes;
use hyper::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE,
    CONTENT_TYPE, RANGE,
};
use hyper::{Response, StatusCode};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio::fs::{self, File};

use crate::http::body::{self, ResponseBody};
use crate::http::multipart::Multipart;
use crate::http::range::{self, RangeParseResult};
use crate::http::response::log_build_error;
use crate::http::{ConditionalContext, Precondition};
use crate::logger;

pub use metadata::Resource;
pub use resolve::normalize;
pub use settings::{DeliverySettings, DEFAULT_BUFFER_SIZE, MAX_BUFFER_SIZE};
pub use stream::{ChannelSink, ChunkSink, DeliveryError, Selection, SinkClosed};

/// Chunks buffered between the reading task and the connection
const STREAM_QUEUE_DEPTH: usize = 2;

/// Reasons a file cannot be served
#[derive(Debug, Error)]
pub enum FileError {
    #[error("path escapes the root directory: {0}")]
    PathTraversal(String),
    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("failed to open {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
}

impl FileError {
    /// Status code the error maps to
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::PathTraversal(_) | Self::NotAFile(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Open { .. } | Self::Read { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Response body as planned by the engine
#[derive(Debug)]
enum Payload {
    Empty,
    Bytes(Bytes),
    File {
        file: File,
        path: PathBuf,
        file_size: u64,
        selection: Selection,
    },
}

/// Outcome of a successful negotiation
#[derive(Debug)]
pub struct FileResponse {
    status: StatusCode,
    headers: HeaderMap,
    resource: Option<Resource>,
    payload: Payload,
}

impl FileResponse {
    fn bodyless(status: StatusCode, resource: Resource) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            resource: Some(resource),
            payload: Payload::Empty,
        }
    }

    fn not_satisfiable(resource: Resource) -> Self {
        let size = resource.size;
        let mut response = Self::bodyless(StatusCode::RANGE_NOT_SATISFIABLE, resource);
        insert_header(&mut response.headers, CONTENT_RANGE, format!("bytes */{size}"));
        response
    }

    fn in_memory(status: StatusCode, data: Bytes) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from(data.len()));
        Self {
            status,
            headers,
            resource: None,
            payload: Payload::Bytes(data),
        }
    }

    fn file(resource: Resource, file: File, selection: Selection) -> Self {
        let mut headers = HeaderMap::new();
        let status = match &selection {
            Selection::Full => StatusCode::OK,
            Selection::Single(spec) => {
                insert_header(&mut headers, CONTENT_RANGE, spec.content_range(resource.size));
                StatusCode::PARTIAL_CONTENT
            }
            Selection::Multipart { framing, .. } => {
                insert_header(&mut headers, CONTENT_TYPE, framing.content_type());
                StatusCode::PARTIAL_CONTENT
            }
        };
        headers.insert(
            CONTENT_LENGTH,
            HeaderValue::from(selection.content_length(resource.size)),
        );
        headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));

        Self {
            status,
            headers,
            payload: Payload::File {
                file,
                path: resource.canonical_path.clone(),
                file_size: resource.size,
                selection,
            },
            resource: Some(resource),
        }
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Add a header the engine does not produce itself
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// The file being answered for, absent for error-page bodies
    pub const fn resource(&self) -> Option<&Resource> {
        self.resource.as_ref()
    }

    /// Exact number of body bytes this response will carry
    pub fn content_length(&self) -> u64 {
        match &self.payload {
            Payload::Empty => 0,
            Payload::Bytes(data) => data.len() as u64,
            Payload::File {
                file_size,
                selection,
                ..
            } => selection.content_length(*file_size),
        }
    }

    /// Write the body into `sink`
    ///
    /// `buffer_size` bounds each read from disk.
    pub async fn write_body<S: ChunkSink>(
        self,
        sink: &mut S,
        buffer_size: usize,
    ) -> Result<u64, DeliveryError> {
        match self.payload {
            Payload::Empty => Ok(0),
            Payload::Bytes(data) => {
                let len = data.len() as u64;
                sink.send_chunk(data)
                    .await
                    .map_err(|SinkClosed| DeliveryError::Disconnected)?;
                Ok(len)
            }
            Payload::File {
                mut file,
                path,
                file_size,
                selection,
            } => {
                stream::deliver(&mut file, &path, file_size, &selection, buffer_size, sink).await
            }
        }
    }

    /// Convert into a hyper response
    ///
    /// File bodies are streamed by a task spawned on the current tokio
    /// runtime. With `is_head` the headers are kept and no file is read.
    pub fn into_response(self, buffer_size: usize, is_head: bool) -> Response<ResponseBody> {
        let mut builder = Response::builder().status(self.status);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(self.headers);
        }

        let body = match self.payload {
            Payload::Empty => body::empty(),
            _ if is_head => body::empty(),
            Payload::Bytes(data) => body::full(data),
            Payload::File {
                file,
                path,
                file_size,
                selection,
            } => spawn_delivery(file, path, file_size, selection, buffer_size),
        };

        builder.body(body).unwrap_or_else(|e| {
            log_build_error(self.status.as_str(), &e);
            Response::new(body::empty())
        })
    }
}

fn spawn_delivery(
    mut file: File,
    path: PathBuf,
    file_size: u64,
    selection: Selection,
    buffer_size: usize,
) -> ResponseBody {
    let (tx, channel_body) =
        body::channel(STREAM_QUEUE_DEPTH, selection.content_length(file_size));

    tokio::spawn(async move {
        let mut sink = ChannelSink::new(tx);
        match stream::deliver(&mut file, &path, file_size, &selection, buffer_size, &mut sink).await
        {
            Ok(sent) => {
                logger::log_debug(&format!("Delivered {sent} bytes of {}", path.display()));
            }
            Err(DeliveryError::Disconnected) => {
                logger::log_debug(&format!(
                    "Client disconnected while receiving {}",
                    path.display()
                ));
            }
            Err(e) => {
                logger::log_warning(&format!("Aborting response body: {e}"));
                sink.abort(io::Error::other(e.to_string())).await;
            }
        }
    });

    http_body_util::BodyExt::boxed(channel_body)
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: String) {
    match HeaderValue::try_from(value) {
        Ok(v) => {
            headers.insert(name, v);
        }
        Err(e) => logger::log_error(&format!("Invalid {name} header value: {e}")),
    }
}

/// Static file server rooted at one directory
#[derive(Debug)]
pub struct FileServer {
    root: RwLock<Arc<PathBuf>>,
    settings: Arc<DeliverySettings>,
}

impl FileServer {
    /// Serve files below `root_dir` with default settings
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self::with_settings(root_dir, Arc::new(DeliverySettings::default()))
    }

    pub fn with_settings(root_dir: impl Into<PathBuf>, settings: Arc<DeliverySettings>) -> Self {
        Self {
            root: RwLock::new(Arc::new(root_dir.into())),
            settings,
        }
    }

    /// Directory containing the files being served
    pub fn root_dir(&self) -> Arc<PathBuf> {
        Arc::clone(&self.root.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Serve from another directory; requests already running keep the old one
    pub fn set_root_dir(&self, root_dir: impl Into<PathBuf>) {
        *self.root.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(root_dir.into());
    }

    pub const fn settings(&self) -> &Arc<DeliverySettings> {
        &self.settings
    }

    pub fn buffer_size(&self) -> usize {
        self.settings.buffer_size()
    }

    pub fn set_buffer_size(&self, size: usize) {
        self.settings.set_buffer_size(size);
    }

    /// Serve `request_path`, relative to the root directory
    ///
    /// `Ok` covers 200, 206, 304, 412 and 416. Paths escaping the root and
    /// non-regular files yield 403 errors, missing files 404, and a file that
    /// cannot be opened a 500-class error.
    pub async fn serve(
        &self,
        request_path: &str,
        headers: &HeaderMap,
    ) -> Result<FileResponse, FileError> {
        let root = self.root_dir();
        let canonical = resolve::resolve(&root, request_path).await?;
        serve_resolved(canonical, request_path, headers).await
    }

    /// Serve a file named by the application, honouring conditional and
    /// range headers but without any root containment
    pub async fn serve_file(path: &Path, headers: &HeaderMap) -> Result<FileResponse, FileError> {
        let requested = path.to_string_lossy();
        let Ok(canonical) = fs::canonicalize(path).await else {
            return Err(FileError::NotFound(requested.into_owned()));
        };
        serve_resolved(canonical, &requested, headers).await
    }

    /// Use the whole file at `path` as the body of a `status` response
    ///
    /// Skips every negotiation step; meant for pre-rendered error pages.
    pub async fn serve_file_with_status(
        path: &Path,
        status: StatusCode,
    ) -> Result<FileResponse, FileError> {
        match fs::read(path).await {
            Ok(data) => Ok(FileResponse::in_memory(status, Bytes::from(data))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(FileError::NotFound(path.to_string_lossy().into_owned()))
            }
            Err(source) => Err(FileError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

async fn serve_resolved(
    canonical: PathBuf,
    requested_path: &str,
    headers: &HeaderMap,
) -> Result<FileResponse, FileError> {
    let resource = metadata::probe(canonical, requested_path).await?;
    let conditions = ConditionalContext::from_headers(headers);

    match conditions.evaluate(resource.last_modified) {
        Precondition::PreconditionFailed => {
            return Ok(FileResponse::bodyless(
                StatusCode::PRECONDITION_FAILED,
                resource,
            ));
        }
        Precondition::NotModified => {
            return Ok(FileResponse::bodyless(StatusCode::NOT_MODIFIED, resource));
        }
        Precondition::Proceed => {}
    }

    let range_header = headers.get(RANGE).and_then(|v| v.to_str().ok());
    let selection = match range::negotiate(
        range_header,
        conditions.if_range.as_ref(),
        resource.size,
        resource.last_modified,
    ) {
        RangeParseResult::Full => Selection::Full,
        RangeParseResult::NotSatisfiable => return Ok(FileResponse::not_satisfiable(resource)),
        RangeParseResult::Valid(plan) => match plan.single() {
            Some(spec) => Selection::Single(spec),
            None => Selection::Multipart {
                framing: Multipart::for_file(
                    &resource.canonical_path,
                    resource.size,
                    resource.last_modified.timestamp(),
                ),
                plan,
            },
        },
    };

    let file = File::open(&resource.canonical_path)
        .await
        .map_err(|source| FileError::Open {
            path: resource.canonical_path.clone(),
            source,
        })?;

    Ok(FileResponse::file(resource, file, selection))
}
