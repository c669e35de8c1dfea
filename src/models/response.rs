use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::signal::{Decision, FraudSignal};

/// Result of a fraud check or a captcha verification.
///
/// Snapshots of this struct are stored inside pending captcha challenges, so
/// it must clone deeply (all owned data) to keep the stored verdict
/// independent of later mutation of the live response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudCheckResponse {
    pub decision: Decision,
    pub risk_score: u32,
    pub fingerprint_id: String,
    pub request_ip: Option<String>,
    pub ip_country_iso: Option<String>,
    pub signals: Vec<FraudSignal>,

    pub captcha_required: bool,
    pub captcha_verified: bool,
    pub captcha_provider: Option<String>,
    pub captcha_site_key: Option<String>,
    #[serde(default)]
    pub captcha_error_codes: Vec<String>,
    pub challenge_id: Option<String>,

    pub evaluated_at: DateTime<Utc>,
}

impl FraudCheckResponse {
    /// A fresh response with no captcha state attached.
    pub fn new(
        decision: Decision,
        risk_score: u32,
        fingerprint_id: String,
        request_ip: Option<String>,
        ip_country_iso: Option<String>,
        signals: Vec<FraudSignal>,
    ) -> Self {
        Self {
            decision,
            risk_score,
            fingerprint_id,
            request_ip,
            ip_country_iso,
            signals,
            captcha_required: false,
            captcha_verified: false,
            captcha_provider: None,
            captcha_site_key: None,
            captcha_error_codes: Vec::new(),
            challenge_id: None,
            evaluated_at: Utc::now(),
        }
    }
}
