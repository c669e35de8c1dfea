//! Pure normalisation helpers consumed by the rule modules.

use std::collections::HashMap;
use std::net::IpAddr;

use axum::http::HeaderMap;

pub mod lang;
pub mod user_agent;

/// Take the first comma-separated token, trim it, and parse as IPv4/IPv6.
/// Returns the canonical textual form, or `None` for garbage input.
pub fn normalize_ip(value: Option<&str>) -> Option<String> {
    let candidate = value?.split(',').next()?.trim();
    candidate.parse::<IpAddr>().ok().map(|ip| ip.to_string())
}

/// Lowercase all header names into an owned map. Header access inside the
/// rule modules is case-insensitive; values are passed through lossily.
pub fn normalize_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_lowercase(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

/// Collapse whitespace runs, trim, lowercase.
pub fn normalize_text(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
