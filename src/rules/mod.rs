//! Signal-producing rule modules.
//!
//! Each module is a pure check: payload plus derived inputs in, zero or more
//! signals out. The orchestrator holds them in a fixed order; modules are
//! defensive and emit nothing when their inputs are missing. New rules append
//! new signal codes and never reuse existing ones.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::payload::FraudCheckRequest;
use crate::models::signal::FraudSignal;
use crate::normalize::user_agent::has_mobile_ua;

pub mod automation;
pub mod behavior;
pub mod device;
pub mod geo;
pub mod headers;
pub mod ip;
pub mod locale;
pub mod system;
pub mod timestamp;

/// Derived inputs shared by the stateless rule modules, computed once per
/// check.
pub struct RuleContext<'a> {
    /// Lowercased payload User-Agent.
    pub ua: String,
    /// Lowercased `navigator.platform`, empty when absent.
    pub platform: String,
    pub is_mobile_ua: bool,
    pub is_desktop_ua: bool,
    /// Request headers with lowercased names.
    pub headers: &'a HashMap<String, String>,
    pub request_ip: Option<&'a str>,
    /// Wall-clock evaluation time, used only by the timestamp rule.
    pub now: DateTime<Utc>,
}

impl<'a> RuleContext<'a> {
    pub fn new(
        payload: &FraudCheckRequest,
        headers: &'a HashMap<String, String>,
        request_ip: Option<&'a str>,
    ) -> Self {
        let ua = payload.navigator.user_agent.to_lowercase();
        let platform = payload
            .navigator
            .platform
            .as_deref()
            .unwrap_or("")
            .to_lowercase();
        let is_mobile_ua = has_mobile_ua(&ua);
        Self {
            ua,
            platform,
            is_mobile_ua,
            is_desktop_ua: !is_mobile_ua,
            headers,
            request_ip,
            now: Utc::now(),
        }
    }
}

/// A stateless signal producer.
pub trait Rule: Send + Sync {
    fn collect(&self, payload: &FraudCheckRequest, ctx: &RuleContext<'_>) -> Vec<FraudSignal>;
}

/// The stateless rule pack in its fixed evaluation order. Geo runs separately
/// after IP geolocation resolves; the sliding-window counters run after that.
pub fn rule_pack() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(automation::AutomationRules),
        Box::new(device::DeviceRules),
        Box::new(locale::LocaleRules),
        Box::new(headers::HeaderRules),
        Box::new(timestamp::TimestampRules),
        Box::new(system::SystemRules),
        Box::new(ip::IpRules),
        Box::new(behavior::BehaviorRules),
    ]
}

#[cfg(test)]
pub(crate) mod tests_support {
    use std::collections::HashMap;

    use super::RuleContext;
    use crate::models::payload::FraudCheckRequest;

    pub fn payload_with_ua(ua: &str) -> FraudCheckRequest {
        serde_json::from_value(serde_json::json!({
            "navigator": {"user_agent": ua},
            "screen": {"width": 1920, "height": 1080},
            "viewport": {"width": 1280, "height": 800}
        }))
        .expect("test payload")
    }

    pub fn context_with<'a>(
        payload: &FraudCheckRequest,
        headers: &'a HashMap<String, String>,
    ) -> RuleContext<'a> {
        RuleContext::new(payload, headers, None)
    }
}
