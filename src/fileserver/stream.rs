//! Streaming delivery
//!
//! Copies the selected bytes of an open file to a [`ChunkSink`] in chunks of
//! at most `buffer_size` bytes. Only one buffer is allocated per delivery,
//! so memory use does not depend on the file size.

use hyper::body::Bytes;
use std::future::Future;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;

use crate::http::multipart::Multipart;
use crate::http::range::{RangePlan, RangeSpec};

/// Which bytes of the file make up the body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The whole file
    Full,
    /// One range, sent as-is
    Single(RangeSpec),
    /// Several ranges, each wrapped in `multipart/byteranges` framing
    Multipart { plan: RangePlan, framing: Multipart },
}

impl Selection {
    /// Exact body length for a file of `file_size` bytes
    pub fn content_length(&self, file_size: u64) -> u64 {
        match self {
            Self::Full => file_size,
            Self::Single(spec) => spec.content_length(),
            Self::Multipart { plan, framing } => framing.content_length(plan),
        }
    }

    /// Length of the largest contiguous read
    fn largest_read(&self, file_size: u64) -> u64 {
        match self {
            Self::Full => file_size,
            Self::Single(spec) => spec.content_length(),
            Self::Multipart { plan, .. } => plan
                .specs()
                .iter()
                .map(RangeSpec::content_length)
                .max()
                .unwrap_or(0),
        }
    }
}

/// The receiving side went away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkClosed;

/// Destination of response body chunks
pub trait ChunkSink {
    /// Send one chunk, waiting while the sink is full
    fn send_chunk(&mut self, chunk: Bytes) -> impl Future<Output = Result<(), SinkClosed>> + Send;
}

/// Collects the body in memory
impl ChunkSink for Vec<u8> {
    fn send_chunk(&mut self, chunk: Bytes) -> impl Future<Output = Result<(), SinkClosed>> + Send {
        self.extend_from_slice(&chunk);
        std::future::ready(Ok(()))
    }
}

/// Feeds a [`crate::http::body::ChannelBody`]
pub struct ChannelSink {
    tx: mpsc::Sender<io::Result<Bytes>>,
}

impl ChannelSink {
    pub const fn new(tx: mpsc::Sender<io::Result<Bytes>>) -> Self {
        Self { tx }
    }

    /// Make the receiving body fail so the transport drops the connection
    pub async fn abort(self, error: io::Error) {
        // The body may already be gone, nothing left to abort then
        let _ = self.tx.send(Err(error)).await;
    }
}

impl ChunkSink for ChannelSink {
    fn send_chunk(&mut self, chunk: Bytes) -> impl Future<Output = Result<(), SinkClosed>> + Send {
        async move { self.tx.send(Ok(chunk)).await.map_err(|_| SinkClosed) }
    }
}

/// Errors after the response head has been committed
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("{} ended {missing} bytes early", .path.display())]
    Truncated { path: PathBuf, missing: u64 },
    #[error("client disconnected")]
    Disconnected,
}

/// Copy `selection` of `file` into `sink`
///
/// `buffer_size` is read once by the caller and used for the whole delivery.
/// Returns the number of body bytes sent, framing included.
pub async fn deliver<S: ChunkSink>(
    file: &mut File,
    path: &Path,
    file_size: u64,
    selection: &Selection,
    buffer_size: usize,
    sink: &mut S,
) -> Result<u64, DeliveryError> {
    let largest = usize::try_from(selection.largest_read(file_size)).unwrap_or(usize::MAX);
    let mut buffer = vec![0u8; buffer_size.clamp(1, largest.max(1))];

    let mut reader = RangeReader {
        file,
        path,
        buffer: &mut buffer,
    };

    match selection {
        Selection::Full => reader.copy(0, file_size, sink).await,
        Selection::Single(spec) => reader.copy(spec.start, spec.content_length(), sink).await,
        Selection::Multipart { plan, framing } => {
            let mut sent = 0;
            for (i, spec) in plan.specs().iter().enumerate() {
                sent += send_framing(sink, framing.part_header(spec, i == 0)).await?;
                sent += reader.copy(spec.start, spec.content_length(), sink).await?;
            }
            sent += send_framing(sink, framing.closing()).await?;
            Ok(sent)
        }
    }
}

async fn send_framing<S: ChunkSink>(sink: &mut S, framing: String) -> Result<u64, DeliveryError> {
    let len = framing.len() as u64;
    sink.send_chunk(Bytes::from(framing))
        .await
        .map_err(|SinkClosed| DeliveryError::Disconnected)?;
    Ok(len)
}

struct RangeReader<'a> {
    file: &'a mut File,
    path: &'a Path,
    buffer: &'a mut [u8],
}

impl RangeReader<'_> {
    /// Send `len` bytes starting at `start`, never reading past the range
    async fn copy<S: ChunkSink>(
        &mut self,
        start: u64,
        len: u64,
        sink: &mut S,
    ) -> Result<u64, DeliveryError> {
        if len == 0 {
            return Ok(0);
        }

        self.file
            .seek(SeekFrom::Start(start))
            .await
            .map_err(|source| self.read_error(source))?;

        let mut remaining = len;
        while remaining > 0 {
            let want = usize::try_from(remaining)
                .map_or(self.buffer.len(), |r| r.min(self.buffer.len()));
            let n = self
                .file
                .read(&mut self.buffer[..want])
                .await
                .map_err(|source| self.read_error(source))?;

            if n == 0 {
                return Err(DeliveryError::Truncated {
                    path: self.path.to_path_buf(),
                    missing: remaining,
                });
            }

            sink.send_chunk(Bytes::copy_from_slice(&self.buffer[..n]))
                .await
                .map_err(|SinkClosed| DeliveryError::Disconnected)?;
            remaining -= n as u64;
        }

        Ok(len)
    }

    fn read_error(&self, source: io::Error) -> DeliveryError {
        DeliveryError::Read {
            path: self.path.to_path_buf(),
            source,
        }
    }
}
