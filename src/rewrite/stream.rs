//! Streaming passthrough for bodies that are not rewritten.

use std::convert::Infallible;
use std::fmt::Display;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use futures_util::Stream;

/// Re-chunks an upstream byte stream into pieces of at most `chunk_size`
/// bytes without buffering the payload.
///
/// A read error ends the stream: the client receives whatever was already
/// sent. Dropping the stream early (client disconnect) drops the upstream
/// reader with it.
pub struct PassthroughStream<S> {
    inner: S,
    pending: Bytes,
    chunk_size: usize,
    transferred: u64,
    done: bool,
}

impl<S> PassthroughStream<S> {
    pub fn new(inner: S, chunk_size: usize) -> Self {
        Self {
            inner,
            pending: Bytes::new(),
            chunk_size: chunk_size.max(1),
            transferred: 0,
            done: false,
        }
    }

    /// Bytes handed to the client so far.
    pub(crate) fn transferred(&self) -> u64 {
        self.transferred
    }
}

impl<S, E> Stream for PassthroughStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    type Item = Result<Bytes, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if !this.pending.is_empty() {
                let n = this.chunk_size.min(this.pending.len());
                let chunk = this.pending.split_to(n);
                this.transferred += n as u64;
                return Poll::Ready(Some(Ok(chunk)));
            }

            if this.done {
                return Poll::Ready(None);
            }

            match ready!(Pin::new(&mut this.inner).poll_next(cx)) {
                Some(Ok(bytes)) => this.pending = bytes,
                Some(Err(e)) => {
                    this.done = true;
                    tracing::error!(
                        error = %e,
                        bytes = this.transferred(),
                        "Error streaming content"
                    );
                    return Poll::Ready(None);
                }
                None => {
                    this.done = true;
                    tracing::debug!(bytes = this.transferred(), "Upstream body streamed");
                    return Poll::Ready(None);
                }
            }
        }
    }
}

impl<S> Drop for PassthroughStream<S> {
    fn drop(&mut self) {
        if !self.done {
            tracing::debug!(
                bytes = self.transferred(),
                "Response dropped before upstream body finished; aborting upstream read"
            );
        }
    }
}
