use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::settings::FraudConfig;

use super::{CaptchaVerification, CaptchaVerifier};

/// Cloudflare Turnstile siteverify adapter.
pub struct TurnstileVerifier {
    http: reqwest::Client,
    site_key: Option<String>,
    secret_key: Option<String>,
    verify_url: String,
    timeout: Duration,
}

impl TurnstileVerifier {
    pub fn new(http: reqwest::Client, config: &FraudConfig) -> Self {
        Self {
            http,
            site_key: config.turnstile_site_key.clone(),
            secret_key: config.turnstile_secret_key.clone(),
            verify_url: config.turnstile_verify_url.clone(),
            timeout: Duration::from_secs_f64(config.turnstile_timeout_seconds),
        }
    }

    fn parse_body(data: &Value, status: u16) -> CaptchaVerification {
        let success = data.get("success").and_then(Value::as_bool).unwrap_or(false);

        // Cloudflare documents `error-codes`; tolerate the snake_case
        // spelling and a bare string as well.
        let raw_codes = data
            .get("error-codes")
            .or_else(|| data.get("error_codes"));
        let mut error_codes: Vec<String> = match raw_codes {
            Some(Value::String(code)) if !code.is_empty() => vec![code.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };

        if !success && error_codes.is_empty() && status != 200 {
            error_codes = vec![format!("turnstile_http_{status}")];
        }

        CaptchaVerification {
            success,
            error_codes,
            hostname: data
                .get("hostname")
                .and_then(Value::as_str)
                .map(str::to_string),
            action: data
                .get("action")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }

    fn failure(code: impl Into<String>) -> CaptchaVerification {
        CaptchaVerification {
            success: false,
            error_codes: vec![code.into()],
            hostname: None,
            action: None,
        }
    }
}

#[async_trait]
impl CaptchaVerifier for TurnstileVerifier {
    fn provider(&self) -> &str {
        "turnstile"
    }

    fn site_key(&self) -> Option<&str> {
        self.site_key.as_deref()
    }

    fn is_configured(&self) -> bool {
        self.site_key.as_deref().is_some_and(|k| !k.is_empty())
            && self.secret_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> CaptchaVerification {
        if !self.is_configured() {
            return Self::failure("turnstile_not_configured");
        }

        let mut form: Vec<(&str, &str)> = vec![
            ("secret", self.secret_key.as_deref().unwrap_or("")),
            ("response", token),
        ];
        if let Some(remote_ip) = remote_ip {
            form.push(("remoteip", remote_ip));
        }

        let response = match self
            .http
            .post(&self.verify_url)
            .form(&form)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Turnstile verification request failed");
                debug!(error = %e, "Turnstile verification network error");
                return Self::failure("turnstile_network_error");
            }
        };

        let status = response.status().as_u16();
        let data: Value = match response.json().await {
            Ok(data) => data,
            Err(e) => {
                warn!(status = status, "Turnstile verification returned non-JSON response");
                debug!(error = %e, "Turnstile verification JSON decode error");
                return Self::failure(format!("turnstile_http_{status}"));
            }
        };

        Self::parse_body(&data, status)
    }
}
