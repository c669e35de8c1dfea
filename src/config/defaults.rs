use super::settings::{ApiConfig, FraudConfig, StorageConfig};

// ---------------------------------------------------------------------------
// Top-level struct defaults
// ---------------------------------------------------------------------------

pub fn default_env() -> String {
    "local".to_string()
}

pub fn default_api_config() -> ApiConfig {
    ApiConfig {
        title: default_api_title(),
        version: default_api_version(),
        host: default_api_host(),
        port: default_api_port(),
        allowed_hosts: default_allowed_hosts(),
        api_key: None,
    }
}

pub fn default_fraud_config() -> FraudConfig {
    FraudConfig {
        block_score_threshold: default_block_score_threshold(),
        review_score_threshold: default_review_score_threshold(),
        trust_forwarded_ip: false,
        rate_limit_window_seconds: default_rate_limit_window_seconds(),
        rate_limit_max_requests_per_ip: default_rate_limit_max_requests_per_ip(),
        ip_geolocation_enabled: false,
        ip_geolocation_timeout_seconds: default_ip_geolocation_timeout_seconds(),
        ip_geolocation_base_url: default_ip_geolocation_base_url(),
        ip_geolocation_cache_ttl_seconds: default_ip_geolocation_cache_ttl_seconds(),
        turnstile_site_key: None,
        turnstile_secret_key: None,
        turnstile_verify_url: default_turnstile_verify_url(),
        turnstile_js_url: default_turnstile_js_url(),
        turnstile_timeout_seconds: default_turnstile_timeout_seconds(),
        turnstile_challenge_ttl_seconds: default_turnstile_challenge_ttl_seconds(),
        turnstile_max_attempts: default_turnstile_max_attempts(),
        fingerprint_velocity_window_seconds: default_fingerprint_velocity_window_seconds(),
        fingerprint_velocity_warn_threshold: default_fingerprint_velocity_warn_threshold(),
        fingerprint_velocity_warn_weight: default_fingerprint_velocity_warn_weight(),
        fingerprint_velocity_suspicious_threshold:
            default_fingerprint_velocity_suspicious_threshold(),
        fingerprint_velocity_suspicious_weight: default_fingerprint_velocity_suspicious_weight(),
        fingerprint_velocity_critical_threshold: default_fingerprint_velocity_critical_threshold(),
        fingerprint_velocity_critical_weight: default_fingerprint_velocity_critical_weight(),
        behavior_similarity_history_size: default_behavior_similarity_history_size(),
        behavior_similarity_window_seconds: default_behavior_similarity_window_seconds(),
        behavior_similarity_tolerance_pct: default_behavior_similarity_tolerance_pct(),
        behavior_similarity_match_ratio: default_behavior_similarity_match_ratio(),
        behavior_similarity_warn_threshold: default_behavior_similarity_warn_threshold(),
        behavior_similarity_warn_weight: default_behavior_similarity_warn_weight(),
        behavior_similarity_suspicious_threshold:
            default_behavior_similarity_suspicious_threshold(),
        behavior_similarity_suspicious_weight: default_behavior_similarity_suspicious_weight(),
    }
}

pub fn default_storage_config() -> StorageConfig {
    StorageConfig {
        sqlite_path: default_sqlite_path(),
    }
}

// ---------------------------------------------------------------------------
// API
// ---------------------------------------------------------------------------

pub fn default_api_title() -> String {
    "Vigil Fraud API".to_string()
}

pub fn default_api_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_api_port() -> u16 {
    8000
}

pub fn default_allowed_hosts() -> Vec<String> {
    vec!["*".to_string()]
}

// ---------------------------------------------------------------------------
// Fraud scoring
// ---------------------------------------------------------------------------

pub fn default_block_score_threshold() -> u32 {
    70
}

pub fn default_review_score_threshold() -> u32 {
    40
}

pub fn default_rate_limit_window_seconds() -> u64 {
    60
}

pub fn default_rate_limit_max_requests_per_ip() -> usize {
    120
}

pub fn default_ip_geolocation_timeout_seconds() -> f64 {
    1.5
}

pub fn default_ip_geolocation_base_url() -> String {
    "https://ipapi.co".to_string()
}

pub fn default_ip_geolocation_cache_ttl_seconds() -> u64 {
    300
}

pub fn default_turnstile_verify_url() -> String {
    "https://challenges.cloudflare.com/turnstile/v0/siteverify".to_string()
}

pub fn default_turnstile_js_url() -> String {
    "https://challenges.cloudflare.com/turnstile/v0/api.js?render=explicit".to_string()
}

pub fn default_turnstile_timeout_seconds() -> f64 {
    2.0
}

pub fn default_turnstile_challenge_ttl_seconds() -> u64 {
    600
}

pub fn default_turnstile_max_attempts() -> u32 {
    5
}

// ---------------------------------------------------------------------------
// Fingerprint velocity
// ---------------------------------------------------------------------------

pub fn default_fingerprint_velocity_window_seconds() -> u64 {
    300
}

pub fn default_fingerprint_velocity_warn_threshold() -> u32 {
    8
}

pub fn default_fingerprint_velocity_warn_weight() -> u32 {
    10
}

pub fn default_fingerprint_velocity_suspicious_threshold() -> u32 {
    15
}

pub fn default_fingerprint_velocity_suspicious_weight() -> u32 {
    20
}

pub fn default_fingerprint_velocity_critical_threshold() -> u32 {
    30
}

pub fn default_fingerprint_velocity_critical_weight() -> u32 {
    40
}

// ---------------------------------------------------------------------------
// Behavior similarity
// ---------------------------------------------------------------------------

pub fn default_behavior_similarity_history_size() -> usize {
    20
}

pub fn default_behavior_similarity_window_seconds() -> u64 {
    1800
}

pub fn default_behavior_similarity_tolerance_pct() -> f64 {
    0.15
}

pub fn default_behavior_similarity_match_ratio() -> f64 {
    0.8
}

pub fn default_behavior_similarity_warn_threshold() -> u32 {
    3
}

pub fn default_behavior_similarity_warn_weight() -> u32 {
    12
}

pub fn default_behavior_similarity_suspicious_threshold() -> u32 {
    5
}

pub fn default_behavior_similarity_suspicious_weight() -> u32 {
    25
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

pub fn default_sqlite_path() -> String {
    "vigil.db".to_string()
}
