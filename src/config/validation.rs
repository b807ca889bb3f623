//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that the upstream target has a usable scheme and host
//! - Validate value ranges (timeouts > 0, chunk size > 0)
//! - Validate socket addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::upstream::target::{TargetError, UpstreamTarget};

/// A single semantic problem with the configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid upstream.target_url {url:?}: {reason}")]
    InvalidTarget { url: String, reason: TargetError },
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("invalid socket address for {field}: {value:?}")]
    InvalidAddress { field: &'static str, value: String },
    #[error("rewrite.content_types contains an empty entry")]
    EmptyContentType,
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(reason) = UpstreamTarget::parse(&config.upstream.target_url) {
        errors.push(ValidationError::InvalidTarget {
            url: config.upstream.target_url.clone(),
            reason,
        });
    }

    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "upstream.timeout_secs" });
    }
    if config.upstream.connect_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "upstream.connect_timeout_secs" });
    }
    if config.rewrite.stream_chunk_size == 0 {
        errors.push(ValidationError::Zero { field: "rewrite.stream_chunk_size" });
    }
    if config.limits.max_request_body_bytes == 0 {
        errors.push(ValidationError::Zero { field: "limits.max_request_body_bytes" });
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.rewrite.content_types.iter().any(|t| t.trim().is_empty()) {
        errors.push(ValidationError::EmptyContentType);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
