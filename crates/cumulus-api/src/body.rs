//! HTTP body plumbing for both directions of the streaming boundary.
//!
//! - [`ResponseBody`] is the response body type used throughout the service.
//!   It supports three modes: **Buffered** for small payloads (XML, JSON,
//!   error bodies), **Empty** for header-only responses, and **Streaming**
//!   for object payloads fed through a pipe from a driver task. Dropping a
//!   streaming body (client disconnect) severs the pipe, which makes the
//!   feeding task's next write fail and releases backend resources.
//!
//! - [`body_reader`] adapts an incoming request body into the `AsyncRead`
//!   the driver contract consumes, so a PUT streams into the backend without
//!   ever being collected into one buffer.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use http_body::Frame;
use http_body_util::{BodyDataStream, Full};
use tokio::io::{AsyncRead, DuplexStream};
use tokio_util::io::{ReaderStream, StreamReader};

/// Pipe buffer size for streamed object reads.
pub(crate) const STREAM_PIPE_SIZE: usize = 64 * 1024;

/// Response body supporting buffered, empty, and streaming modes.
///
/// Implements [`http_body::Body`] so it can be used directly with hyper
/// responses.
#[derive(Debug, Default)]
pub enum ResponseBody {
    /// Buffered body for small responses: XML payloads, error bodies.
    Buffered(Full<Bytes>),
    /// Empty body for HEAD responses and header-only results.
    #[default]
    Empty,
    /// Object payload streamed from the read half of a driver-fed pipe.
    Streaming(ReaderStream<DuplexStream>),
}

impl ResponseBody {
    /// A body holding the given bytes.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::Buffered(Full::new(data.into()))
    }

    /// A body holding the given UTF-8 text.
    #[must_use]
    pub fn from_string(s: impl Into<String>) -> Self {
        Self::Buffered(Full::new(Bytes::from(s.into())))
    }

    /// A body with no content.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }

    /// A body fed from the read half of a duplex pipe.
    #[must_use]
    pub fn streaming(reader: DuplexStream) -> Self {
        Self::Streaming(ReaderStream::new(reader))
    }
}

impl http_body::Body for ResponseBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Buffered(full) => Pin::new(full)
                .poll_frame(cx)
                .map_err(|never| match never {}),
            Self::Empty => Poll::Ready(None),
            Self::Streaming(stream) => match Pin::new(stream).poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => Poll::Ready(Some(Ok(Frame::data(chunk)))),
                Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
                Poll::Ready(None) => Poll::Ready(None),
                Poll::Pending => Poll::Pending,
            },
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Buffered(full) => full.is_end_stream(),
            Self::Empty => true,
            Self::Streaming(_) => false,
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            Self::Buffered(full) => full.size_hint(),
            Self::Empty => http_body::SizeHint::with_exact(0),
            Self::Streaming(_) => http_body::SizeHint::default(),
        }
    }
}

/// Adapt an incoming request body into the `AsyncRead` the driver consumes.
///
/// Data frames become the byte stream; trailer frames are discarded by the
/// underlying [`BodyDataStream`]. Transport errors surface as `io::Error`,
/// which the driver maps to an internal failure without publishing a
/// half-written object.
pub fn body_reader<B>(body: B) -> impl AsyncRead + Send + Unpin
where
    B: http_body::Body<Data = Bytes> + Send + Unpin + 'static,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    StreamReader::new(BodyDataStream::new(body).map_err(io::Error::other))
}

#[cfg(test)]
mod tests {
    use http_body::Body;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    #[test]
    fn test_should_report_empty_body_as_end_of_stream() {
        let body = ResponseBody::empty();
        assert!(body.is_end_stream());
        assert_eq!(body.size_hint().exact(), Some(0));
    }

    #[test]
    fn test_should_create_buffered_body_from_bytes() {
        let body = ResponseBody::from_bytes(Bytes::from("hello"));
        assert!(!body.is_end_stream());
        assert_eq!(body.size_hint().exact(), Some(5));
    }

    #[test]
    fn test_should_default_to_empty() {
        let body = ResponseBody::default();
        assert!(body.is_end_stream());
    }

    #[tokio::test]
    async fn test_should_read_request_body_as_stream() {
        let body = Full::new(Bytes::from("hello world"));
        let mut reader = body_reader(body);

        let mut out = Vec::new();
        reader
            .read_to_end(&mut out)
            .await
            .expect("read should succeed");
        assert_eq!(out, b"hello world");
    }

    #[tokio::test]
    async fn test_should_read_empty_request_body() {
        let body = Full::new(Bytes::new());
        let mut reader = body_reader(body);

        let mut out = Vec::new();
        reader
            .read_to_end(&mut out)
            .await
            .expect("read should succeed");
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_should_stream_bytes_written_into_pipe() {
        let (reader, mut writer) = tokio::io::duplex(STREAM_PIPE_SIZE);
        let body = ResponseBody::streaming(reader);

        let feeder = tokio::spawn(async move {
            writer.write_all(b"streamed payload").await.unwrap();
            // Dropping the writer ends the stream.
        });

        let collected = http_body_util::BodyExt::collect(body)
            .await
            .expect("collect should succeed");
        assert_eq!(collected.to_bytes().as_ref(), b"streamed payload");
        feeder.await.unwrap();
    }

    #[tokio::test]
    async fn test_should_fail_pipe_writes_after_body_dropped() {
        let (reader, mut writer) = tokio::io::duplex(16);
        let body = ResponseBody::streaming(reader);
        drop(body);

        // The pipe accepts at most its buffer size before erroring out.
        let mut result = Ok(());
        for _ in 0..4 {
            result = writer.write_all(&[0u8; 16]).await;
            if result.is_err() {
                break;
            }
        }
        assert!(result.is_err(), "writes into a severed pipe should fail");
    }
}
