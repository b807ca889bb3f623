//! Builds and sends the upstream request.
//!
//! # Responsibilities
//! - Map method, path, query string, headers and body onto the upstream
//! - Strip connection-level request headers and set `Host`,
//!   `X-Forwarded-For`, `X-Forwarded-Proto`
//! - Never follow redirects; the client sees the (rewritten) redirect
//! - Bound the wait for the upstream response headers and each body read
//!
//! The response body is left unread so callers can stream it.

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{header, request::Parts, HeaderMap, HeaderValue, Method, Uri};
use bytes::Bytes;

use crate::config::UpstreamConfig;
use crate::error::{ProxyError, UpstreamFailure};
use crate::http::origin::{request_scheme, X_FORWARDED_PROTO};
use crate::upstream::target::UpstreamTarget;

/// Incoming headers that are never copied to the upstream request.
pub const EXCLUDED_REQUEST_HEADERS: [&str; 6] = [
    "host",
    "connection",
    "content-length",
    "content-encoding",
    "transfer-encoding",
    "keep-alive",
];

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// One outbound request, ready to send.
#[derive(Debug, Clone)]
pub struct ForwardedRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Sends requests to the single upstream origin.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    target: UpstreamTarget,
    timeout: Duration,
}

impl Forwarder {
    /// Build a forwarder with its own connection pool.
    ///
    /// `timeout_secs` bounds the wait for response headers and every
    /// subsequent body read, so a stalled upstream surfaces as a body error
    /// instead of holding the client response open.
    pub fn new(target: UpstreamTarget, config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(timeout)
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            target,
            timeout,
        })
    }

    pub fn target(&self) -> &UpstreamTarget {
        &self.target
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Prepare and send the upstream request for an incoming one.
    pub async fn forward(
        &self,
        parts: &Parts,
        body: Bytes,
        peer: SocketAddr,
    ) -> Result<reqwest::Response, ProxyError> {
        let request = self.prepare(parts, body, peer);
        tracing::info!(
            method = %request.method,
            path = %parts.uri.path(),
            target = %request.url,
            "Proxying request"
        );
        self.send(request).await
    }

    /// Map an incoming request onto the upstream.
    pub fn prepare(&self, parts: &Parts, body: Bytes, peer: SocketAddr) -> ForwardedRequest {
        ForwardedRequest {
            method: parts.method.clone(),
            url: target_url(&self.target, &parts.uri),
            headers: forward_headers(&parts.headers, &self.target, &parts.uri, peer),
            body,
        }
    }

    /// Send a prepared request, waiting at most `timeout` for the response
    /// headers. No retries.
    pub async fn send(&self, request: ForwardedRequest) -> Result<reqwest::Response, ProxyError> {
        let url = reqwest::Url::parse(&request.url).map_err(|source| {
            ProxyError::InvalidTargetUrl {
                url: request.url.clone(),
                source,
            }
        })?;

        let pending = self
            .client
            .request(request.method, url)
            .headers(request.headers)
            .body(request.body)
            .send();

        match tokio::time::timeout(self.timeout, pending).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(ProxyError::UpstreamUnreachable {
                url: request.url,
                source: UpstreamFailure::Transport(e),
            }),
            Err(_) => Err(ProxyError::UpstreamUnreachable {
                url: request.url,
                source: UpstreamFailure::Timeout(self.timeout),
            }),
        }
    }
}

/// Upstream base + request path, with the raw query string appended as-is.
pub fn target_url(target: &UpstreamTarget, uri: &Uri) -> String {
    let mut url = format!(
        "{}/{}",
        target.base_url(),
        uri.path().trim_start_matches('/')
    );
    if let Some(query) = uri.query().filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(query);
    }
    url
}

/// Copy incoming headers minus [`EXCLUDED_REQUEST_HEADERS`], then point
/// `Host` at the upstream and record the client address and scheme.
///
/// `Cookie` and `Accept-Encoding` pass through untouched.
pub fn forward_headers(
    incoming: &HeaderMap,
    target: &UpstreamTarget,
    uri: &Uri,
    peer: SocketAddr,
) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(incoming.len() + 3);
    for (name, value) in incoming.iter() {
        if EXCLUDED_REQUEST_HEADERS.contains(&name.as_str()) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    if let Ok(host) = HeaderValue::from_str(target.authority()) {
        headers.insert(header::HOST, host);
    }
    if let Ok(ip) = HeaderValue::from_str(&peer.ip().to_string()) {
        headers.insert(X_FORWARDED_FOR, ip);
    }
    if let Ok(proto) = HeaderValue::from_str(request_scheme(uri)) {
        headers.insert(X_FORWARDED_PROTO, proto);
    }

    headers
}
