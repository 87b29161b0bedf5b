//! Response body types
//!
//! Every response leaving the server uses [`ResponseBody`]. Small bodies are
//! kept in memory; file bodies are fed chunk by chunk through a bounded
//! channel by a delivery task, so memory stays bounded whatever the file size.

use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes, Frame, SizeHint};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Body type shared by all handlers
pub type ResponseBody = BoxBody<Bytes, io::Error>;

/// In-memory body
pub fn full(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into()).map_err(|never| match never {}).boxed()
}

/// Zero-length body
pub fn empty() -> ResponseBody {
    full(Bytes::new())
}

/// Body fed by a [`mpsc::Sender`]
///
/// An `Err` item aborts the body, which makes hyper tear the connection down
/// instead of finishing a response with missing bytes. Dropping the body
/// closes the channel, which the sending side observes on its next send.
pub struct ChannelBody {
    rx: mpsc::Receiver<io::Result<Bytes>>,
    remaining: u64,
}

/// Create a channel-backed body expected to carry exactly `content_length`
/// bytes, buffering at most `capacity` chunks
pub fn channel(
    capacity: usize,
    content_length: u64,
) -> (mpsc::Sender<io::Result<Bytes>>, ChannelBody) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        tx,
        ChannelBody {
            rx,
            remaining: content_length,
        },
    )
}

impl Body for ChannelBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.remaining = this.remaining.saturating_sub(chunk.len() as u64);
                Poll::Ready(Some(Ok(Frame::data(chunk))))
            }
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.remaining)
    }
}
