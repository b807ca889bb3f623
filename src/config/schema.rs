//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive `Deserialize` for loading from config files.

use serde::Deserialize;

/// Upstream origin used when nothing else is configured.
pub const DEFAULT_TARGET_URL: &str = "https://f.mirea.ru";

/// Media types whose bodies are rewritten by default.
pub const DEFAULT_REWRITABLE_CONTENT_TYPES: &[&str] = &[
    "text/html",
    "text/css",
    "application/javascript",
    "application/x-javascript",
    "application/json",
    "application/xml",
    "text/xml",
    "image/svg+xml",
];

/// Root configuration for the rewriting proxy.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The single upstream origin and how to reach it.
    pub upstream: UpstreamConfig,

    /// URL rewriting settings.
    pub rewrite: RewriteConfig,

    /// Request limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
        }
    }
}

/// Upstream origin configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the upstream origin. Only scheme and authority are used.
    pub target_url: String,

    /// Maximum wait for the upstream response headers, in seconds.
    pub timeout_secs: u64,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            target_url: DEFAULT_TARGET_URL.to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// Rewriting configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Rewrite `Location`, `Set-Cookie` and textual bodies.
    pub enabled: bool,

    /// Base media types (no parameters) whose bodies are rewritten.
    pub content_types: Vec<String>,

    /// Maximum chunk size when streaming bodies that are not rewritten.
    pub stream_chunk_size: usize,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            content_types: DEFAULT_REWRITABLE_CONTENT_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            stream_chunk_size: 8192,
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest request body forwarded upstream, in bytes.
    pub max_request_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_body_bytes: 32 * 1024 * 1024, // 32MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
