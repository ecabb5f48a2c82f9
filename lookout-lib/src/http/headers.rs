use std::net::{IpAddr, SocketAddr};

use http::header::{HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, VARY};
use http::Response;

/// Header names the helpers read or write
pub mod names {
    pub const AUTHORIZATION: &str = "Authorization";
    pub const CONTENT_TYPE: &str = "Content-Type";

    /// Comma-separated client chain, left-most is the original client
    pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
    pub const X_REAL_IP: &str = "x-real-ip";
}

pub mod content_types {
    pub const APPLICATION_JSON: &str = "application/json";
    pub const APPLICATION_FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
}

fn non_empty(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Best guess at the originating client address.
///
/// `X-Forwarded-For` wins over `X-Real-IP`, which wins over the peer
/// address. A value that is not a bare IP is treated as a list and its first
/// entry is returned trimmed.
pub fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> Option<String> {
    let raw = non_empty(headers, names::X_FORWARDED_FOR)
        .or_else(|| non_empty(headers, names::X_REAL_IP))
        .or_else(|| remote.map(|addr| addr.ip().to_string()))?;

    if raw.parse::<IpAddr>().is_ok() {
        return Some(raw);
    }
    raw.split(',')
        .next()
        .map(|first| first.trim().to_string())
        .filter(|first| !first.is_empty())
}

/// Echo `origin` in `Access-Control-Allow-Origin` when it is allowed.
/// A `"*"` entry allows any origin.
pub fn apply_cors<B>(origin: Option<&HeaderValue>, allowed: &[String], resp: &mut Response<B>) {
    let Some(origin) = origin else {
        return;
    };
    let Ok(origin_str) = origin.to_str() else {
        return;
    };
    if allowed.iter().any(|a| a == "*" || a == origin_str) {
        resp.headers_mut().insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        resp.headers_mut().append(VARY, HeaderValue::from_static("Origin"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    fn peer() -> Option<SocketAddr> {
        Some(SocketAddr::from(([10, 0, 0, 7], 51234)))
    }

    #[test]
    fn test_forwarded_for_takes_precedence() {
        let h = headers(&[(names::X_FORWARDED_FOR, "203.0.113.9"), (names::X_REAL_IP, "198.51.100.1")]);
        assert_eq!(client_ip(&h, peer()).as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn test_forwarded_for_list_uses_first_entry() {
        let h = headers(&[(names::X_FORWARDED_FOR, " 203.0.113.9 , 10.1.1.1, 10.2.2.2")]);
        assert_eq!(client_ip(&h, peer()).as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn test_real_ip_then_peer() {
        let h = headers(&[(names::X_REAL_IP, "198.51.100.1")]);
        assert_eq!(client_ip(&h, peer()).as_deref(), Some("198.51.100.1"));
        assert_eq!(client_ip(&HeaderMap::new(), peer()).as_deref(), Some("10.0.0.7"));
        assert_eq!(client_ip(&HeaderMap::new(), None), None);
    }

    #[test]
    fn test_ipv6_peer() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr: SocketAddr = "[2001:db8::1]:443".parse()?;
        assert_eq!(client_ip(&HeaderMap::new(), Some(addr)).as_deref(), Some("2001:db8::1"));
        Ok(())
    }

    #[test]
    fn test_cors_echoes_allowed_origin_only() {
        let allowed = vec!["http://localhost".to_string()];

        let mut resp = Response::new(());
        apply_cors(Some(&HeaderValue::from_static("http://localhost")), &allowed, &mut resp);
        assert_eq!(
            resp.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&HeaderValue::from_static("http://localhost"))
        );

        let mut resp = Response::new(());
        apply_cors(Some(&HeaderValue::from_static("http://evil.test")), &allowed, &mut resp);
        assert!(resp.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}
