use std::net::SocketAddr;

use axum::http::HeaderMap;

use crate::normalize::normalize_ip;

// Forwarded-IP headers, in trust order.
const FORWARDED_IP_HEADERS: &[&str] = &["cf-connecting-ip", "x-forwarded-for", "x-real-ip"];

/// Resolve the request IP: forwarded headers first when trusted, falling
/// back to the transport peer address. Every candidate goes through
/// `normalize_ip`, so garbage header values are treated as absent.
pub fn resolve_request_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded_ip: bool,
) -> Option<String> {
    if trust_forwarded_ip {
        for header in FORWARDED_IP_HEADERS {
            let value = headers.get(*header).and_then(|v| v.to_str().ok());
            if let Some(ip) = normalize_ip(value) {
                return Some(ip);
            }
        }
    }

    normalize_ip(peer.map(|addr| addr.ip().to_string()).as_deref())
}
