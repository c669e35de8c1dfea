use anyhow::{Context, Result};
use serde::Deserialize;

use super::defaults;

/// Top-level configuration for the Vigil fraud-scoring service.
/// Deserializes from environment variables with prefix `APP__` and nested
/// delimiter `__` (e.g. `APP__FRAUD__BLOCK_SCORE_THRESHOLD=80`).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "defaults::default_env")]
    pub env: String,

    #[serde(default = "defaults::default_api_config")]
    pub api: ApiConfig,

    #[serde(default = "defaults::default_fraud_config")]
    pub fraud: FraudConfig,

    #[serde(default = "defaults::default_storage_config")]
    pub storage: StorageConfig,
}

impl Settings {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self> {
        let source = config::Environment::with_prefix("APP")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("api.allowed_hosts");

        let loaded = config::Config::builder()
            .add_source(source)
            .build()
            .context("Failed to read configuration from environment")?;

        let settings: Settings = loaded
            .try_deserialize()
            .context("Failed to parse configuration")?;
        Ok(settings)
    }

    pub fn is_prod(&self) -> bool {
        self.env == "prod"
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: defaults::default_env(),
            api: defaults::default_api_config(),
            fraud: defaults::default_fraud_config(),
            storage: defaults::default_storage_config(),
        }
    }
}

/// HTTP API surface configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "defaults::default_api_title")]
    pub title: String,

    #[serde(default = "defaults::default_api_version")]
    pub version: String,

    #[serde(default = "defaults::default_api_host")]
    pub host: String,

    #[serde(default = "defaults::default_api_port")]
    pub port: u16,

    #[serde(default = "defaults::default_allowed_hosts")]
    pub allowed_hosts: Vec<String>,

    /// When set, every endpoint except the public exemptions requires this
    /// key in `X-API-Key` (compared in constant time).
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Fraud-scoring thresholds and counter tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct FraudConfig {
    #[serde(default = "defaults::default_block_score_threshold")]
    pub block_score_threshold: u32,

    #[serde(default = "defaults::default_review_score_threshold")]
    pub review_score_threshold: u32,

    /// Trust Cf-Connecting-IP / X-Forwarded-For / X-Real-IP for the request
    /// IP. Only enable behind a proxy that strips client-supplied values.
    #[serde(default)]
    pub trust_forwarded_ip: bool,

    #[serde(default = "defaults::default_rate_limit_window_seconds")]
    pub rate_limit_window_seconds: u64,

    #[serde(default = "defaults::default_rate_limit_max_requests_per_ip")]
    pub rate_limit_max_requests_per_ip: usize,

    #[serde(default)]
    pub ip_geolocation_enabled: bool,

    #[serde(default = "defaults::default_ip_geolocation_timeout_seconds")]
    pub ip_geolocation_timeout_seconds: f64,

    #[serde(default = "defaults::default_ip_geolocation_base_url")]
    pub ip_geolocation_base_url: String,

    #[serde(default = "defaults::default_ip_geolocation_cache_ttl_seconds")]
    pub ip_geolocation_cache_ttl_seconds: u64,

    #[serde(default)]
    pub turnstile_site_key: Option<String>,

    #[serde(default)]
    pub turnstile_secret_key: Option<String>,

    #[serde(default = "defaults::default_turnstile_verify_url")]
    pub turnstile_verify_url: String,

    #[serde(default = "defaults::default_turnstile_js_url")]
    pub turnstile_js_url: String,

    #[serde(default = "defaults::default_turnstile_timeout_seconds")]
    pub turnstile_timeout_seconds: f64,

    #[serde(default = "defaults::default_turnstile_challenge_ttl_seconds")]
    pub turnstile_challenge_ttl_seconds: u64,

    #[serde(default = "defaults::default_turnstile_max_attempts")]
    pub turnstile_max_attempts: u32,

    #[serde(default = "defaults::default_fingerprint_velocity_window_seconds")]
    pub fingerprint_velocity_window_seconds: u64,

    #[serde(default = "defaults::default_fingerprint_velocity_warn_threshold")]
    pub fingerprint_velocity_warn_threshold: u32,

    #[serde(default = "defaults::default_fingerprint_velocity_warn_weight")]
    pub fingerprint_velocity_warn_weight: u32,

    #[serde(default = "defaults::default_fingerprint_velocity_suspicious_threshold")]
    pub fingerprint_velocity_suspicious_threshold: u32,

    #[serde(default = "defaults::default_fingerprint_velocity_suspicious_weight")]
    pub fingerprint_velocity_suspicious_weight: u32,

    #[serde(default = "defaults::default_fingerprint_velocity_critical_threshold")]
    pub fingerprint_velocity_critical_threshold: u32,

    #[serde(default = "defaults::default_fingerprint_velocity_critical_weight")]
    pub fingerprint_velocity_critical_weight: u32,

    #[serde(default = "defaults::default_behavior_similarity_history_size")]
    pub behavior_similarity_history_size: usize,

    #[serde(default = "defaults::default_behavior_similarity_window_seconds")]
    pub behavior_similarity_window_seconds: u64,

    #[serde(default = "defaults::default_behavior_similarity_tolerance_pct")]
    pub behavior_similarity_tolerance_pct: f64,

    #[serde(default = "defaults::default_behavior_similarity_match_ratio")]
    pub behavior_similarity_match_ratio: f64,

    #[serde(default = "defaults::default_behavior_similarity_warn_threshold")]
    pub behavior_similarity_warn_threshold: u32,

    #[serde(default = "defaults::default_behavior_similarity_warn_weight")]
    pub behavior_similarity_warn_weight: u32,

    #[serde(default = "defaults::default_behavior_similarity_suspicious_threshold")]
    pub behavior_similarity_suspicious_threshold: u32,

    #[serde(default = "defaults::default_behavior_similarity_suspicious_weight")]
    pub behavior_similarity_suspicious_weight: u32,
}

/// Audit-log storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "defaults::default_sqlite_path")]
    pub sqlite_path: String,
}
