//! Externally visible origin of the proxy.
//!
//! The origin is recomputed for every request so that a proxy sitting behind
//! another proxy reports whatever that outer hop forwarded.

use axum::http::{header, HeaderMap, Uri};

pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Scheme and authority clients use to reach this proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyOrigin {
    scheme: String,
    authority: String,
}

impl ProxyOrigin {
    pub fn new(scheme: impl Into<String>, authority: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            authority: authority.into(),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// `scheme://authority`.
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.authority)
    }

    /// Authority with any port removed. Bracketed IPv6 literals keep their
    /// brackets.
    pub fn host(&self) -> &str {
        strip_port(&self.authority)
    }
}

fn strip_port(authority: &str) -> &str {
    if authority.starts_with('[') {
        return match authority.find(']') {
            Some(end) => &authority[..=end],
            None => authority,
        };
    }
    authority.split(':').next().unwrap_or(authority)
}

/// Scheme of the incoming request itself. The listener speaks plain HTTP, so
/// origin-form requests are `http`.
pub fn request_scheme(uri: &Uri) -> &str {
    uri.scheme_str().unwrap_or("http")
}

/// Resolve the proxy origin from `X-Forwarded-Proto` / `X-Forwarded-Host`,
/// falling back to the request's own scheme and host.
///
/// Header values are taken as-is; they only ever shape rewritten output.
pub fn resolve_proxy_origin(headers: &HeaderMap, uri: &Uri) -> ProxyOrigin {
    let scheme = header_text(headers, X_FORWARDED_PROTO)
        .unwrap_or_else(|| request_scheme(uri).to_string());

    let authority = header_text(headers, X_FORWARDED_HOST)
        .or_else(|| header_text(headers, header::HOST.as_str()))
        .or_else(|| uri.authority().map(|a| a.to_string()))
        .unwrap_or_default();

    ProxyOrigin::new(scheme, authority)
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}
