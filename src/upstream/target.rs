//! The fixed upstream origin.

use thiserror::Error;
use url::Url;

/// Reasons a configured target URL is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("cannot parse target URL: {0}")]
    Parse(#[from] url::ParseError),
    #[error("unsupported scheme {0:?} (expected http or https)")]
    UnsupportedScheme(String),
    #[error("target URL has no host")]
    MissingHost,
}

/// Scheme and authority of the upstream origin.
///
/// Built once at startup; any path, query or credentials in the configured
/// URL are ignored. Scheme and host are lowercased and a default port is
/// dropped, so upstream values spelling out `:443` / `:80` do not match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    scheme: String,
    authority: String,
    host: String,
    base_url: String,
}

impl UpstreamTarget {
    /// Parse a target URL such as `https://upstream.example`.
    pub fn parse(raw: &str) -> Result<Self, TargetError> {
        let url = Url::parse(raw.trim())?;

        let scheme = url.scheme().to_string();
        if scheme != "http" && scheme != "https" {
            return Err(TargetError::UnsupportedScheme(scheme));
        }

        let host = match url.host_str() {
            Some(h) if !h.is_empty() => h.to_string(),
            _ => return Err(TargetError::MissingHost),
        };

        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.clone(),
        };
        let base_url = format!("{}://{}", scheme, authority);

        Ok(Self {
            scheme,
            authority,
            host,
            base_url,
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host and optional port, e.g. `upstream.example:8443`.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Host without port, as used in cookie `domain=` attributes.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// `scheme://authority` with no trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl std::fmt::Display for UpstreamTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.base_url)
    }
}
