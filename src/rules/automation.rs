use crate::models::payload::FraudCheckRequest;
use crate::models::signal::FraudSignal;
use crate::normalize::user_agent::{
    contains_any, AUTOMATION_MARKERS, BOT_UA_MARKERS, STRONG_BOT_UA_MARKERS,
};

use super::{Rule, RuleContext};

/// Detects automation frameworks and non-browser HTTP clients.
pub struct AutomationRules;

impl Rule for AutomationRules {
    fn collect(&self, payload: &FraudCheckRequest, ctx: &RuleContext<'_>) -> Vec<FraudSignal> {
        let mut signals = Vec::new();

        if payload.navigator.webdriver == Some(true) {
            signals.push(FraudSignal::new(
                "WEBDRIVER_ENABLED",
                70,
                "Browser reports webdriver-enabled automation.",
            ));
        }

        if contains_any(&ctx.ua, AUTOMATION_MARKERS) {
            signals.push(FraudSignal::new(
                "AUTOMATION_UA_MARKER",
                55,
                "User-Agent contains known automation markers.",
            ));
        }

        // A strong bot signature dominates; the generic bot check is skipped.
        if contains_any(&ctx.ua, STRONG_BOT_UA_MARKERS) {
            signals.push(FraudSignal::new(
                "STRONG_BOT_UA_MARKER",
                85,
                "User-Agent matches strong non-browser bot signatures.",
            ));
            return signals;
        }

        if contains_any(&ctx.ua, BOT_UA_MARKERS) {
            signals.push(FraudSignal::new(
                "BOT_UA_MARKER",
                45,
                "User-Agent contains crawler/bot keywords.",
            ));
        }

        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::tests_support::{context_with, payload_with_ua};

    fn codes(payload: &FraudCheckRequest) -> Vec<String> {
        let headers = std::collections::HashMap::new();
        let ctx = context_with(payload, &headers);
        AutomationRules
            .collect(payload, &ctx)
            .into_iter()
            .map(|s| s.code)
            .collect()
    }

    #[test]
    fn test_webdriver_flag() {
        let mut payload = payload_with_ua("Mozilla/5.0 ordinary browser agent");
        payload.navigator.webdriver = Some(true);
        assert_eq!(codes(&payload), vec!["WEBDRIVER_ENABLED"]);
    }

    #[test]
    fn test_strong_bot_suppresses_generic_bot() {
        // "curl/" matches both the strong and generic lists; only the strong
        // signal is emitted.
        let payload = payload_with_ua("curl/8.4.0 something");
        assert_eq!(codes(&payload), vec!["STRONG_BOT_UA_MARKER"]);
    }

    #[test]
    fn test_generic_bot_marker() {
        let payload = payload_with_ua("Mozilla/5.0 compatible Googlebot/2.1");
        assert_eq!(codes(&payload), vec!["BOT_UA_MARKER"]);
    }

    #[test]
    fn test_headless_marker_stacks_with_webdriver() {
        let mut payload = payload_with_ua("Mozilla/5.0 HeadlessChrome/120.0");
        payload.navigator.webdriver = Some(true);
        assert_eq!(
            codes(&payload),
            vec!["WEBDRIVER_ENABLED", "AUTOMATION_UA_MARKER"]
        );
    }

    #[test]
    fn test_clean_browser_emits_nothing() {
        let payload = payload_with_ua("Mozilla/5.0 (Windows NT 10.0) Chrome/120.0");
        assert!(codes(&payload).is_empty());
    }
}
