//! Upstream subsystem: the fixed origin and the client that talks to it.
//!
//! # Data Flow
//! ```text
//! incoming request parts + body
//!     → forwarder.rs (target URL, header mapping, timeout)
//!     → reqwest connection pool
//!     → reqwest::Response (headers read, body unread)
//! ```

pub mod forwarder;
pub mod target;

pub use forwarder::{ForwardedRequest, Forwarder};
pub use target::{TargetError, UpstreamTarget};
