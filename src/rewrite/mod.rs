//! Response rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! upstream response
//!     → headers.rs (drop framing headers, rewrite Location / Set-Cookie)
//!     → RewritePolicy::should_rewrite (Content-Type allow-list)
//!         yes → body.rs (buffer, decode, substring replace, re-encode)
//!         no  → stream.rs (chunked passthrough, never buffered)
//! ```

pub mod body;
pub mod headers;
pub mod stream;

pub use body::{buffered_body, rewrite_body, try_rewrite_body, RewriteError};
pub use headers::{transform_headers, HeaderList};
pub use stream::PassthroughStream;

use crate::config::RewriteConfig;

/// Process-wide rewriting settings, fixed at startup.
#[derive(Debug, Clone)]
pub struct RewritePolicy {
    enabled: bool,
    content_types: Vec<String>,
    chunk_size: usize,
}

impl RewritePolicy {
    pub fn from_config(config: &RewriteConfig) -> Self {
        Self {
            enabled: config.enabled,
            content_types: config
                .content_types
                .iter()
                .map(|t| body::media_type_base(t))
                .collect(),
            chunk_size: config.stream_chunk_size,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// True when rewriting is on and the base media type of `content_type`
    /// is on the allow-list. A missing content type is never rewritten.
    pub fn should_rewrite(&self, content_type: Option<&str>) -> bool {
        if !self.enabled {
            return false;
        }
        match content_type {
            Some(ct) => {
                let base = body::media_type_base(ct);
                self.content_types.iter().any(|t| *t == base)
            }
            None => false,
        }
    }
}

impl Default for RewritePolicy {
    fn default() -> Self {
        Self::from_config(&RewriteConfig::default())
    }
}
