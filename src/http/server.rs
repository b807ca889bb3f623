//! HTTP server setup and the proxy handler.
//!
//! # Responsibilities
//! - Create Axum Router accepting every method on every path
//! - Wire up middleware (request ID, tracing)
//! - Bind server to listener with graceful shutdown
//! - Run the request pipeline: resolve origin → forward → transform headers
//!   → rewrite or stream body → assemble response

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, request::Parts, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use bytes::Bytes;
use http_body_util::LengthLimitError;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::{validation::ValidationError, ConfigError, ProxyConfig};
use crate::error::{ProxyError, StartupError};
use crate::http::origin::{resolve_proxy_origin, ProxyOrigin};
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::{assemble, BodyProducer};
use crate::lifecycle::shutdown::triggered;
use crate::observability::metrics;
use crate::rewrite::{buffered_body, transform_headers, PassthroughStream, RewritePolicy};
use crate::upstream::{Forwarder, UpstreamTarget};

/// Application state injected into handlers. Immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<Forwarder>,
    pub policy: Arc<RewritePolicy>,
    pub max_body_bytes: usize,
}

/// HTTP server for the rewriting proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Validate `config` and build the server. Fails if the upstream target
    /// is unusable.
    pub fn new(config: ProxyConfig) -> Result<Self, StartupError> {
        crate::config::validation::validate_config(&config).map_err(ConfigError::Validation)?;

        let target = UpstreamTarget::parse(&config.upstream.target_url).map_err(|reason| {
            ConfigError::Validation(vec![ValidationError::InvalidTarget {
                url: config.upstream.target_url.clone(),
                reason,
            }])
        })?;

        let forwarder = Forwarder::new(target, &config.upstream)?;
        let policy = RewritePolicy::from_config(&config.rewrite);

        tracing::info!(
            target = %forwarder.target(),
            rewriting = policy.enabled(),
            timeout_secs = config.upstream.timeout_secs,
            "Upstream configured"
        );

        let state = AppState {
            forwarder: Arc::new(forwarder),
            policy: Arc::new(policy),
            max_body_bytes: config.limits.max_request_body_bytes,
        };

        let router = Self::build_router(state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http().make_span_with(request_span))
                    .layer(propagate_request_id_layer()),
            )
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(triggered(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

fn request_span(request: &Request<Body>) -> tracing::Span {
    tracing::info_span!(
        "request",
        request_id = %request_id(request.headers()),
        method = %request.method(),
        uri = %request.uri(),
    )
}

/// Main proxy handler.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let (parts, body) = request.into_parts();
    let method = parts.method.clone();
    let origin = resolve_proxy_origin(&parts.headers, &parts.uri);

    let response = match proxy(&state, parts, body, peer, &origin).await {
        Ok(response) => response,
        Err(e) => {
            match e {
                ProxyError::UpstreamUnreachable { .. } => {
                    tracing::error!(error = %e, "Error connecting to target")
                }
                _ => tracing::warn!(error = %e, "Rejected request"),
            }
            e.into_response()
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}

async fn proxy(
    state: &AppState,
    parts: Parts,
    body: Body,
    peer: SocketAddr,
    origin: &ProxyOrigin,
) -> Result<Response, ProxyError> {
    let body = read_body(body, state.max_body_bytes).await?;
    let upstream = state.forwarder.forward(&parts, body, peer).await?;
    let target = state.forwarder.target();

    let status = upstream.status();
    let headers = transform_headers(upstream.headers(), origin, target, state.policy.enabled());
    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let body = if state.policy.should_rewrite(content_type.as_deref()) {
        let content_type = content_type.unwrap_or_default();
        tracing::debug!(content_type = %content_type, "Content type marked for rewriting");
        BodyProducer::Buffered(buffered_body(upstream.bytes().await, &content_type, origin, target))
    } else {
        BodyProducer::Streamed(PassthroughStream::new(
            Box::pin(upstream.bytes_stream()),
            state.policy.chunk_size(),
        ))
    };

    Ok(assemble(status, headers, body))
}

async fn read_body(body: Body, limit: usize) -> Result<Bytes, ProxyError> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        if is_length_limit(&e) {
            ProxyError::RequestBodyTooLarge { limit }
        } else {
            ProxyError::RequestBody(e)
        }
    })
}

fn is_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}
