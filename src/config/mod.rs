//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (TARGET_URL, ENABLE_URL_REWRITING)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → split into UpstreamTarget + RewritePolicy, shared via Arc
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup and never reloaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, load_with, ConfigError};
pub use schema::{
    LimitsConfig, ListenerConfig, ObservabilityConfig, ProxyConfig, RewriteConfig,
    UpstreamConfig,
};
