//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, handler)
//!     → request.rs (request ID)
//!     → origin.rs (externally visible proxy origin)
//!     → [upstream forwarder + rewrite pipeline]
//!     → response.rs (status, ordered headers, body producer)
//!     → Send to client
//! ```

pub mod origin;
pub mod request;
pub mod response;
pub mod server;

pub use origin::{resolve_proxy_origin, ProxyOrigin};
pub use request::X_REQUEST_ID;
pub use server::HttpServer;
