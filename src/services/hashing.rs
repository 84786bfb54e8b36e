//! Digest-while-streaming adapter.

use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Wraps a chunk stream and feeds every chunk through an MD5 context as it
/// passes, without buffering beyond what the caller already holds.
///
/// Consume the stream to exhaustion, then call [`HashingReader::digest`] for
/// the hex digest of everything that went through.
pub struct HashingReader<S> {
    inner: S,
    context: md5::Context,
}

impl<S> HashingReader<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            context: md5::Context::new(),
        }
    }

    /// Hex digest of the bytes streamed so far.
    pub fn digest(self) -> String {
        format!("{:x}", self.context.compute())
    }
}

impl<S, E> Stream for HashingReader<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    type Item = Result<Bytes, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.context.consume(&chunk);
                Poll::Ready(Some(Ok(chunk)))
            }
            other => other,
        }
    }
}
