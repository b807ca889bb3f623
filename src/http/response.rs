//! Response assembly.
//!
//! # Responsibilities
//! - Pass the upstream status through verbatim
//! - Emit transformed headers in order, repeated names included
//! - Attach either the rewritten buffer or the passthrough stream
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Framing headers are re-derived by the server, never copied

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::Response;
use bytes::Bytes;
use futures_util::Stream;

use crate::rewrite::headers::HeaderList;
use crate::rewrite::stream::PassthroughStream;

/// Source of the outbound body. Consumed once.
pub enum BodyProducer<S> {
    /// Fully rewritten (or fallback) bytes.
    Buffered(Bytes),
    /// Upstream chunks forwarded as they arrive.
    Streamed(PassthroughStream<S>),
}

/// Build the client response from status, headers and body.
pub fn assemble<S, E>(status: StatusCode, headers: HeaderList, body: BodyProducer<S>) -> Response
where
    S: Stream<Item = Result<Bytes, E>> + Unpin + Send + 'static,
    E: std::fmt::Display + 'static,
{
    let body = match body {
        BodyProducer::Buffered(bytes) => Body::from(bytes),
        BodyProducer::Streamed(stream) => Body::from_stream(stream),
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;

    let out = response.headers_mut();
    for (name, value) in headers {
        out.append(name, value);
    }

    response
}
