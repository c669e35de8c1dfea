//! Contracts for the external services the scoring pipeline consults.
//!
//! The pipeline depends only on these traits and their small result structs;
//! the HTTP adapters live in the submodules and are wired in at startup.
//! Tests substitute stubs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod captcha;
pub mod ip_geo;

/// What IP geolocation tells us about a request address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpGeoResult {
    pub country_iso: Option<String>,
    pub is_hosting: bool,
    pub timezone: Option<String>,
    pub utc_offset_minutes: Option<i32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Resolves an IP address to geolocation data. `None` means disabled,
/// unknown, or failed; the caller skips geo rules either way.
#[async_trait]
pub trait IpGeoResolver: Send + Sync {
    async fn resolve(&self, ip: &str) -> Option<IpGeoResult>;
}

/// Outcome of a captcha token verification.
#[derive(Debug, Clone, Default)]
pub struct CaptchaVerification {
    pub success: bool,
    pub error_codes: Vec<String>,
    pub hostname: Option<String>,
    pub action: Option<String>,
}

/// Verifies a captcha token with the provider. Provider failures never
/// bubble up: they come back as `success: false` with a machine error code.
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    fn provider(&self) -> &str;
    fn site_key(&self) -> Option<&str>;
    fn is_configured(&self) -> bool;
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> CaptchaVerification;
}
