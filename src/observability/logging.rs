//! Structured logging.
//!
//! `RUST_LOG` takes precedence; otherwise the crate logs at the configured
//! level and tower-http's request spans at `debug`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub fn default_filter(log_level: &str) -> String {
    format!("rewriting_proxy={log_level},tower_http=debug")
}

/// Install the global subscriber. Safe to call once per process.
pub fn init_logging(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
