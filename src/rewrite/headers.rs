//! Response header transformation.
//!
//! Upstream headers are processed one entry at a time so repeated names such
//! as `Set-Cookie` are rewritten and emitted independently, in their original
//! order.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;

use crate::http::origin::ProxyOrigin;
use crate::upstream::target::UpstreamTarget;

/// Transport framing headers the proxy re-derives for its own response.
pub static DROPPED_RESPONSE_HEADERS: [HeaderName; 4] = [
    header::TRANSFER_ENCODING,
    header::CONNECTION,
    header::CONTENT_ENCODING,
    header::CONTENT_LENGTH,
];

/// Ordered response headers; names may repeat.
pub type HeaderList = Vec<(HeaderName, HeaderValue)>;

/// Why a header value could not be rewritten.
#[derive(Debug, Error)]
pub enum HeaderRewriteError {
    #[error("rewritten value is not a valid header value")]
    Invalid(#[from] header::InvalidHeaderValue),
}

/// Drop framing headers and, when `rewriting_enabled`, rewrite `Location`
/// and `Set-Cookie` so they point at the proxy.
pub fn transform_headers(
    upstream_headers: &HeaderMap,
    origin: &ProxyOrigin,
    target: &UpstreamTarget,
    rewriting_enabled: bool,
) -> HeaderList {
    let mut out = Vec::with_capacity(upstream_headers.len());

    for (name, value) in upstream_headers.iter() {
        if DROPPED_RESPONSE_HEADERS.contains(name) {
            continue;
        }

        let value = if !rewriting_enabled {
            value.clone()
        } else if name == header::LOCATION {
            rewrite_location_header(value, origin, target)
        } else if name == header::SET_COOKIE {
            rewrite_cookie_header(value, origin, target)
        } else {
            value.clone()
        };

        out.push((name.clone(), value));
    }

    out
}

fn rewrite_location_header(
    value: &HeaderValue,
    origin: &ProxyOrigin,
    target: &UpstreamTarget,
) -> HeaderValue {
    let Some(rewritten) = rewrite_location(value.as_bytes(), origin, target) else {
        return value.clone();
    };

    match HeaderValue::from_bytes(&rewritten) {
        Ok(new_value) => {
            tracing::info!(
                from = %String::from_utf8_lossy(value.as_bytes()),
                to = %String::from_utf8_lossy(&rewritten),
                "Rewriting Location"
            );
            new_value
        }
        Err(e) => {
            tracing::warn!(location = ?value, error = %e, "Failed to rewrite Location header");
            value.clone()
        }
    }
}

/// Rewrite a redirect target. Returns `None` for values that point anywhere
/// other than the upstream (third-party URLs, opaque values).
///
/// Works on raw header bytes; non-ASCII paths are carried over untouched.
pub fn rewrite_location(
    location: &[u8],
    origin: &ProxyOrigin,
    target: &UpstreamTarget,
) -> Option<Vec<u8>> {
    let rest = if let Some(rest) = location.strip_prefix(target.base_url().as_bytes()) {
        rest
    } else if location.starts_with(b"/") {
        let path = trim_leading_slashes(location);
        let mut out = Vec::with_capacity(origin.base_url().len() + path.len() + 1);
        out.extend_from_slice(origin.base_url().as_bytes());
        out.push(b'/');
        out.extend_from_slice(path);
        return Some(out);
    } else {
        return None;
    };

    let mut out = origin.base_url().into_bytes();
    out.extend_from_slice(rest);
    Some(out)
}

fn trim_leading_slashes(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != b'/').unwrap_or(bytes.len());
    &bytes[start..]
}

fn rewrite_cookie_header(
    value: &HeaderValue,
    origin: &ProxyOrigin,
    target: &UpstreamTarget,
) -> HeaderValue {
    match rewrite_cookie_domain(value, origin, target) {
        Ok(new_value) => {
            tracing::debug!(from = ?value, to = ?new_value, "Attempted Set-Cookie rewrite");
            new_value
        }
        Err(e) => {
            tracing::warn!(cookie = ?value, error = %e, "Failed to rewrite Set-Cookie header");
            value.clone()
        }
    }
}

/// Replace `domain=<upstream host>` with `domain=<proxy host>`. Values
/// without that attribute come back unchanged.
///
/// Matching is done on the raw bytes, so cookie values outside visible
/// ASCII do not prevent the rewrite.
pub fn rewrite_cookie_domain(
    value: &HeaderValue,
    origin: &ProxyOrigin,
    target: &UpstreamTarget,
) -> Result<HeaderValue, HeaderRewriteError> {
    let needle = format!("domain={}", target.host());
    let replacement = format!("domain={}", origin.host());

    match replace_all(value.as_bytes(), needle.as_bytes(), replacement.as_bytes()) {
        Some(rewritten) => Ok(HeaderValue::from_bytes(&rewritten)?),
        None => Ok(value.clone()),
    }
}

/// Byte-level `str::replace`. `None` when `needle` does not occur.
fn replace_all(haystack: &[u8], needle: &[u8], replacement: &[u8]) -> Option<Vec<u8>> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }

    let mut out = Vec::with_capacity(haystack.len());
    let mut found = false;
    let mut i = 0;
    while i < haystack.len() {
        if haystack[i..].starts_with(needle) {
            out.extend_from_slice(replacement);
            i += needle.len();
            found = true;
        } else {
            out.push(haystack[i]);
            i += 1;
        }
    }

    found.then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> UpstreamTarget {
        UpstreamTarget::parse("https://upstream.example").unwrap()
    }

    fn origin() -> ProxyOrigin {
        ProxyOrigin::new("https", "proxy.example")
    }

    fn upstream(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.append(*k, HeaderValue::from_static(v));
        }
        map
    }

    fn get<'a>(list: &'a HeaderList, name: &str) -> Vec<&'a str> {
        list.iter()
            .filter(|(n, _)| n.as_str() == name)
            .map(|(_, v)| v.to_str().unwrap())
            .collect()
    }

    #[test]
    fn absolute_location_is_rewritten() {
        let out = transform_headers(
            &upstream(&[("location", "https://upstream.example/login")]),
            &origin(),
            &target(),
            true,
        );
        assert_eq!(get(&out, "location"), ["https://proxy.example/login"]);
    }

    #[test]
    fn relative_location_is_joined() {
        let t = target();
        let o = origin();
        assert_eq!(
            rewrite_location(b"/a/b?c=1", &o, &t).as_deref(),
            Some(&b"https://proxy.example/a/b?c=1"[..])
        );
        assert_eq!(
            rewrite_location(b"///a", &o, &t).as_deref(),
            Some(&b"https://proxy.example/a"[..])
        );
        assert_eq!(
            rewrite_location(b"/", &o, &t).as_deref(),
            Some(&b"https://proxy.example/"[..])
        );
    }

    #[test]
    fn third_party_location_untouched() {
        let t = target();
        let o = origin();
        assert_eq!(rewrite_location(b"https://elsewhere.example/x", &o, &t), None);
        assert_eq!(rewrite_location(b"login.html", &o, &t), None);
    }

    #[test]
    fn non_ascii_location_is_rewritten() {
        let mut map = HeaderMap::new();
        map.append(
            header::LOCATION,
            HeaderValue::from_bytes("https://upstream.example/café".as_bytes()).unwrap(),
        );

        let out = transform_headers(&map, &origin(), &target(), true);
        assert_eq!(out[0].1.as_bytes(), "https://proxy.example/café".as_bytes());
    }

    #[test]
    fn location_untouched_when_disabled() {
        let out = transform_headers(
            &upstream(&[("location", "https://upstream.example/p")]),
            &origin(),
            &target(),
            false,
        );
        assert_eq!(get(&out, "location"), ["https://upstream.example/p"]);
    }

    #[test]
    fn cookie_domain_is_rewritten() {
        let out = transform_headers(
            &upstream(&[("set-cookie", "session=abc; domain=upstream.example; Path=/")]),
            &origin(),
            &target(),
            true,
        );
        assert_eq!(get(&out, "set-cookie"), ["session=abc; domain=proxy.example; Path=/"]);
    }

    #[test]
    fn cookie_domain_drops_ports() {
        let t = UpstreamTarget::parse("http://upstream.example:8080").unwrap();
        let o = ProxyOrigin::new("http", "proxy.example:5000");
        let value = HeaderValue::from_static("id=1; domain=upstream.example; HttpOnly");
        let out = rewrite_cookie_domain(&value, &o, &t).unwrap();
        assert_eq!(out, "id=1; domain=proxy.example; HttpOnly");
    }

    #[test]
    fn repeated_cookies_rewritten_independently() {
        let out = transform_headers(
            &upstream(&[
                ("set-cookie", "a=1; domain=upstream.example"),
                ("set-cookie", "b=2; Path=/"),
                ("set-cookie", "c=3; domain=upstream.example; Secure"),
            ]),
            &origin(),
            &target(),
            true,
        );
        assert_eq!(
            get(&out, "set-cookie"),
            [
                "a=1; domain=proxy.example",
                "b=2; Path=/",
                "c=3; domain=proxy.example; Secure"
            ]
        );
    }

    #[test]
    fn non_ascii_cookie_is_rewritten() {
        let mut map = HeaderMap::new();
        map.append(
            header::SET_COOKIE,
            HeaderValue::from_bytes("name=café; domain=upstream.example; Path=/".as_bytes()).unwrap(),
        );
        map.append(
            header::SET_COOKIE,
            HeaderValue::from_bytes(b"k=\xff; domain=upstream.example").unwrap(),
        );

        let out = transform_headers(&map, &origin(), &target(), true);
        assert_eq!(
            out[0].1.as_bytes(),
            "name=café; domain=proxy.example; Path=/".as_bytes()
        );
        assert_eq!(out[1].1.as_bytes(), b"k=\xff; domain=proxy.example");
    }

    #[test]
    fn unrepresentable_cookie_rewrite_keeps_original() {
        let raw = HeaderValue::from_static("k=v; domain=upstream.example");
        let bad_origin = ProxyOrigin::new("https", "proxy\nexample");

        assert!(rewrite_cookie_domain(&raw, &bad_origin, &target()).is_err());

        let mut map = HeaderMap::new();
        map.append(header::SET_COOKIE, raw.clone());
        let out = transform_headers(&map, &bad_origin, &target(), true);
        assert_eq!(out, vec![(header::SET_COOKIE, raw)]);
    }

    #[test]
    fn replace_all_matches_every_occurrence() {
        assert_eq!(
            replace_all(b"a=x;a=x", b"a=x", b"b=yy").as_deref(),
            Some(&b"b=yy;b=yy"[..])
        );
        assert_eq!(replace_all(b"nothing", b"a=x", b"b"), None);
        assert_eq!(replace_all(b"", b"a", b"b"), None);
    }

    #[test]
    fn framing_headers_are_dropped() {
        let out = transform_headers(
            &upstream(&[
                ("content-type", "text/plain"),
                ("content-length", "12"),
                ("transfer-encoding", "chunked"),
                ("connection", "keep-alive"),
                ("content-encoding", "gzip"),
                ("x-custom", "kept"),
            ]),
            &origin(),
            &target(),
            true,
        );
        let names: Vec<&str> = out.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["content-type", "x-custom"]);
    }
}
