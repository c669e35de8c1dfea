//! Audit persistence.
//!
//! The scoring pipeline only knows the append-only [`AuditSink`] contract;
//! writes are best-effort and failures never affect the HTTP response.

use serde_json::Value;

pub mod sqlite;

/// One audit record per check and per verify result.
#[derive(Debug, Clone)]
pub struct FraudCheckLog {
    pub request_ip: Option<String>,
    pub ip_country_iso: Option<String>,
    pub fingerprint_id: String,
    pub origin: Option<String>,
    /// Original request payload for checks, `{}` for verifies.
    pub request_payload: Value,
    pub decision: String,
    pub risk_score: u32,
    pub signals: Value,
    pub captcha_required: bool,
    pub captcha_verified: bool,
    pub challenge_id: Option<String>,
}

/// Append-only audit sink.
pub trait AuditSink: Send + Sync {
    fn append(&self, log: &FraudCheckLog) -> anyhow::Result<()>;
}
