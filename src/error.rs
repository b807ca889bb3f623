//! Error types surfaced by the proxy.
//!
//! Per-request failures are contained in the request that caused them and
//! rendered as a response; only [`StartupError`] stops the process.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::config::ConfigError;

/// Body sent with every 502 produced by the proxy itself.
pub const UPSTREAM_UNREACHABLE_BODY: &str = "Proxy Error: Could not connect to target server.";

/// Why the upstream call did not produce a response.
#[derive(Debug, Error)]
pub enum UpstreamFailure {
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Failure while handling a single proxied request.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("could not reach upstream {url}: {source}")]
    UpstreamUnreachable {
        url: String,
        #[source]
        source: UpstreamFailure,
    },
    #[error("request body exceeds {limit} bytes")]
    RequestBodyTooLarge { limit: usize },
    #[error("failed to read request body: {0}")]
    RequestBody(#[source] axum::Error),
    #[error("cannot build upstream URL {url:?}: {source}")]
    InvalidTargetUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::UpstreamUnreachable { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::RequestBodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::RequestBody(_) | ProxyError::InvalidTargetUrl { .. } => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match self {
            ProxyError::UpstreamUnreachable { .. } => {
                (StatusCode::BAD_GATEWAY, UPSTREAM_UNREACHABLE_BODY).into_response()
            }
            other => (other.status(), other.to_string()).into_response(),
        }
    }
}

/// Failure before the listener starts accepting traffic.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to build upstream HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_maps_to_fixed_502() {
        let err = ProxyError::UpstreamUnreachable {
            url: "http://127.0.0.1:1/".into(),
            source: UpstreamFailure::Timeout(Duration::from_secs(30)),
        };
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert!(err.to_string().contains("no response within 30s"));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            response.headers()["content-type"],
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn body_limit_maps_to_413() {
        let err = ProxyError::RequestBodyTooLarge { limit: 10 };
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
