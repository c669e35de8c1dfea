use chrono::Duration;

use crate::models::payload::FraudCheckRequest;
use crate::models::signal::FraudSignal;

use super::{Rule, RuleContext};

/// Flags client snapshots whose `collected_at` drifts too far from the
/// server clock. Future timestamps indicate a broken or spoofed clock;
/// stale ones indicate replay.
pub struct TimestampRules;

impl Rule for TimestampRules {
    fn collect(&self, payload: &FraudCheckRequest, ctx: &RuleContext<'_>) -> Vec<FraudSignal> {
        let Some(collected_at) = payload.collected_at else {
            return Vec::new();
        };

        if collected_at > ctx.now + Duration::minutes(2) {
            return vec![FraudSignal::new(
                "CLIENT_TIMESTAMP_IN_FUTURE",
                12,
                "Client snapshot timestamp is too far in the future.",
            )];
        }

        if ctx.now - collected_at > Duration::minutes(10) {
            return vec![FraudSignal::new(
                "STALE_CLIENT_SNAPSHOT",
                18,
                "Client snapshot looks stale and may be replayed.",
            )];
        }

        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::rules::tests_support::{context_with, payload_with_ua};

    fn codes(payload: &FraudCheckRequest) -> Vec<String> {
        let headers = std::collections::HashMap::new();
        let ctx = context_with(payload, &headers);
        TimestampRules
            .collect(payload, &ctx)
            .into_iter()
            .map(|s| s.code)
            .collect()
    }

    #[test]
    fn test_absent_timestamp_is_silent() {
        let payload = payload_with_ua("Mozilla/5.0 test agent");
        assert!(codes(&payload).is_empty());
    }

    #[test]
    fn test_future_timestamp() {
        let mut payload = payload_with_ua("Mozilla/5.0 test agent");
        payload.collected_at = Some(Utc::now() + Duration::minutes(5));
        assert_eq!(codes(&payload), vec!["CLIENT_TIMESTAMP_IN_FUTURE"]);
    }

    #[test]
    fn test_stale_timestamp() {
        let mut payload = payload_with_ua("Mozilla/5.0 test agent");
        payload.collected_at = Some(Utc::now() - Duration::minutes(11));
        assert_eq!(codes(&payload), vec!["STALE_CLIENT_SNAPSHOT"]);
    }

    #[test]
    fn test_recent_timestamp_is_clean() {
        let mut payload = payload_with_ua("Mozilla/5.0 test agent");
        payload.collected_at = Some(Utc::now() - Duration::seconds(30));
        assert!(codes(&payload).is_empty());
    }
}
