//! Response body rewriting.
//!
//! Rewriting is literal substring replacement of the upstream authority with
//! the proxy's. URLs that are percent-encoded, escaped or assembled at
//! runtime are not found; unrelated text that happens to match is replaced.
//!
//! # Fallback policy
//! ```text
//! stage        failure                emitted body      log
//! read         upstream read error    empty             error
//! decode       invalid UTF-8          original bytes    warn
//! ```

use bytes::Bytes;
use thiserror::Error;

use crate::http::origin::ProxyOrigin;
use crate::observability::metrics;
use crate::upstream::target::UpstreamTarget;

/// Failure on the buffered rewrite path.
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("failed to read upstream body: {0}")]
    Read(String),
    #[error("body is not valid UTF-8: {0}")]
    Decode(#[from] std::str::Utf8Error),
}

/// Body emitted in place of a failed rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// The upstream bytes, untouched.
    Original,
    /// Nothing; the original is no longer available.
    Empty,
}

impl RewriteError {
    pub fn fallback(&self) -> Fallback {
        match self {
            RewriteError::Read(_) => Fallback::Empty,
            RewriteError::Decode(_) => Fallback::Original,
        }
    }
}

/// Base media type: everything before the first `;`, trimmed and lowercased.
pub fn media_type_base(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Rewrite `body`, or report why it cannot be rewritten.
///
/// A body without any occurrence of the upstream authority is returned as
/// the same buffer.
pub fn try_rewrite_body(
    body: &Bytes,
    origin: &ProxyOrigin,
    target: &UpstreamTarget,
) -> Result<Bytes, RewriteError> {
    let text = std::str::from_utf8(body)?;

    // Every absolute base URL also contains the protocol-relative form.
    let upstream_relative = format!("//{}", target.authority());
    if !text.contains(&upstream_relative) {
        return Ok(body.clone());
    }

    let rewritten = text
        .replace(target.base_url(), &origin.base_url())
        .replace(&upstream_relative, &format!("//{}", origin.authority()));

    Ok(Bytes::from(rewritten))
}

/// Rewrite `body`, falling back to the original bytes when it is not text.
pub fn rewrite_body(body: Bytes, origin: &ProxyOrigin, target: &UpstreamTarget) -> Bytes {
    match try_rewrite_body(&body, origin, target) {
        Ok(rewritten) => {
            metrics::record_rewrite(if rewritten == body { "unchanged" } else { "rewritten" });
            rewritten
        }
        Err(e) => apply_fallback(e, Some(body)),
    }
}

/// Finish the buffered path: `read` is the outcome of collecting the whole
/// upstream body.
pub fn buffered_body<E>(
    read: Result<Bytes, E>,
    content_type: &str,
    origin: &ProxyOrigin,
    target: &UpstreamTarget,
) -> Bytes
where
    E: std::fmt::Display,
{
    match read {
        Ok(body) => {
            tracing::info!(
                bytes = body.len(),
                content_type = %content_type,
                "Read body for rewriting"
            );
            rewrite_body(body, origin, target)
        }
        Err(e) => apply_fallback(RewriteError::Read(e.to_string()), None),
    }
}

fn apply_fallback(error: RewriteError, original: Option<Bytes>) -> Bytes {
    match &error {
        RewriteError::Read(_) => {
            tracing::error!(error = %error, "Error during content rewriting");
            metrics::record_rewrite("read_failure");
        }
        RewriteError::Decode(_) => {
            tracing::warn!(error = %error, "Could not decode content as UTF-8 for rewriting");
            metrics::record_rewrite("decode_failure");
        }
    }

    match (error.fallback(), original) {
        (Fallback::Original, Some(body)) => body,
        _ => Bytes::new(),
    }
}
