use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::settings::FraudConfig;

use super::{IpGeoResolver, IpGeoResult};

const CACHE_MAX_SIZE: usize = 4096;

const HOSTING_ORG_MARKERS: &[&str] = &[
    "hosting",
    "data center",
    "datacenter",
    "cloud",
    "colo",
    "vpn",
    "proxy",
];

/// Heuristic: the geolocation provider reports the announcing organisation;
/// hosting/VPN/proxy wording there means the address is not residential.
pub fn looks_like_hosting_provider(org: &str) -> bool {
    if org.is_empty() {
        return false;
    }
    let marker = org.to_lowercase();
    HOSTING_ORG_MARKERS.iter().any(|item| marker.contains(item))
}

/// Parse a signed `±HHMM` offset string into minutes.
pub fn parse_utc_offset_minutes(value: Option<&Value>) -> Option<i32> {
    let candidate = value?.as_str()?.trim();
    let mut chars = candidate.chars();
    let sign = match chars.next() {
        Some('+') => 1,
        Some('-') => -1,
        _ => return None,
    };
    if candidate.len() != 5 {
        return None;
    }
    let hours: i32 = candidate[1..3].parse().ok()?;
    let minutes: i32 = candidate[3..5].parse().ok()?;
    if hours > 14 || minutes >= 60 {
        return None;
    }
    Some(sign * (hours * 60 + minutes))
}

fn parse_float(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

struct CacheEntry {
    expires_at: Instant,
    result: IpGeoResult,
}

/// HTTP adapter for an ipapi.co-style geolocation endpoint
/// (`GET {base}/{ip}/json/`), with a bounded per-process cache.
pub struct IpApiGeoClient {
    enabled: bool,
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    cache_ttl: Duration,
    cache: DashMap<String, CacheEntry>,
}

impl IpApiGeoClient {
    pub fn new(http: reqwest::Client, config: &FraudConfig) -> Self {
        Self {
            enabled: config.ip_geolocation_enabled,
            http,
            base_url: config.ip_geolocation_base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs_f64(config.ip_geolocation_timeout_seconds),
            cache_ttl: Duration::from_secs(config.ip_geolocation_cache_ttl_seconds),
            cache: DashMap::new(),
        }
    }

    fn cache_lookup(&self, ip: &str, now: Instant) -> Option<IpGeoResult> {
        let entry = self.cache.get(ip)?;
        if entry.expires_at > now {
            Some(entry.result.clone())
        } else {
            None
        }
    }

    /// Evict all expired entries; if the cache is still full, drop the single
    /// oldest entry, then insert.
    fn cache_store(&self, ip: &str, result: IpGeoResult, now: Instant) {
        if self.cache.len() >= CACHE_MAX_SIZE {
            self.cache.retain(|_, entry| entry.expires_at > now);
            if self.cache.len() >= CACHE_MAX_SIZE {
                let oldest = self
                    .cache
                    .iter()
                    .min_by_key(|entry| entry.value().expires_at)
                    .map(|entry| entry.key().clone());
                if let Some(oldest) = oldest {
                    self.cache.remove(&oldest);
                }
            }
        }
        self.cache.insert(
            ip.to_string(),
            CacheEntry {
                expires_at: now + self.cache_ttl,
                result,
            },
        );
    }

    fn parse_body(data: &Value) -> Option<IpGeoResult> {
        if data.get("error").is_some_and(|e| e.as_bool() != Some(false) && !e.is_null()) {
            return None;
        }

        let country_iso = data
            .get("country_code")
            .and_then(Value::as_str)
            .map(|code| code.to_uppercase());
        let org = data.get("org").and_then(Value::as_str).unwrap_or("");

        Some(IpGeoResult {
            country_iso,
            is_hosting: looks_like_hosting_provider(org),
            timezone: data
                .get("timezone")
                .and_then(Value::as_str)
                .map(str::to_string),
            utc_offset_minutes: parse_utc_offset_minutes(data.get("utc_offset")),
            latitude: parse_float(data.get("latitude")),
            longitude: parse_float(data.get("longitude")),
        })
    }
}

#[async_trait]
impl IpGeoResolver for IpApiGeoClient {
    async fn resolve(&self, ip: &str) -> Option<IpGeoResult> {
        if !self.enabled {
            return None;
        }

        let now = Instant::now();
        if self.cache_ttl > Duration::ZERO {
            if let Some(cached) = self.cache_lookup(ip, now) {
                return Some(cached);
            }
        }

        let url = format!("{}/{}/json/", self.base_url, ip);
        let response = match self.http.get(&url).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(ip = ip, "Failed to resolve IP geolocation");
                debug!(error = %e, "IP geolocation lookup failed");
                return None;
            }
        };
        if !response.status().is_success() {
            warn!(
                ip = ip,
                status = response.status().as_u16(),
                "IP geolocation returned an error status"
            );
            return None;
        }

        let data: Value = match response.json().await {
            Ok(data) => data,
            Err(e) => {
                debug!(error = %e, "IP geolocation returned non-JSON body");
                return None;
            }
        };

        let result = Self::parse_body(&data)?;
        if self.cache_ttl > Duration::ZERO {
            self.cache_store(ip, result.clone(), now);
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosting_markers() {
        assert!(looks_like_hosting_provider("Acme Cloud Hosting GmbH"));
        assert!(looks_like_hosting_provider("SUPERPROXY LLC"));
        assert!(!looks_like_hosting_provider("Deutsche Telekom AG"));
        assert!(!looks_like_hosting_provider(""));
    }

    #[test]
    fn test_parse_utc_offset() {
        let value = serde_json::json!("+0100");
        assert_eq!(parse_utc_offset_minutes(Some(&value)), Some(60));
        let value = serde_json::json!("-0530");
        assert_eq!(parse_utc_offset_minutes(Some(&value)), Some(-330));
        let value = serde_json::json!("+1500");
        assert_eq!(parse_utc_offset_minutes(Some(&value)), None);
        let value = serde_json::json!("0100");
        assert_eq!(parse_utc_offset_minutes(Some(&value)), None);
        let value = serde_json::json!(100);
        assert_eq!(parse_utc_offset_minutes(Some(&value)), None);
        assert_eq!(parse_utc_offset_minutes(None), None);
    }

    #[test]
    fn test_parse_body() {
        let data = serde_json::json!({
            "country_code": "us",
            "org": "Amazon Data Center",
            "timezone": "America/New_York",
            "utc_offset": "-0500",
            "latitude": 40.71,
            "longitude": "-74.0"
        });
        let result = IpApiGeoClient::parse_body(&data).unwrap();
        assert_eq!(result.country_iso.as_deref(), Some("US"));
        assert!(result.is_hosting);
        assert_eq!(result.utc_offset_minutes, Some(-300));
        assert_eq!(result.latitude, Some(40.71));
        assert_eq!(result.longitude, Some(-74.0));
    }

    #[test]
    fn test_parse_body_error_payload() {
        let data = serde_json::json!({"error": true, "reason": "Reserved IP"});
        assert!(IpApiGeoClient::parse_body(&data).is_none());
    }
}
