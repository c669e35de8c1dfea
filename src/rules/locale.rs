use chrono::{DateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

use crate::models::payload::FraudCheckRequest;
use crate::models::signal::FraudSignal;
use crate::normalize::lang::language_base;

use super::{Rule, RuleContext};

/// Actual UTC offset of an IANA timezone at the given instant, in minutes.
/// Unknown timezone names yield `None` (and therefore no signal).
pub fn timezone_offset_minutes(timezone_name: &str, at: DateTime<Utc>) -> Option<i32> {
    let tz: Tz = timezone_name.parse().ok()?;
    let offset = tz.offset_from_utc_datetime(&at.naive_utc());
    Some(offset.fix().local_minus_utc() / 60)
}

/// Language and timezone self-consistency checks.
pub struct LocaleRules;

impl Rule for LocaleRules {
    fn collect(&self, payload: &FraudCheckRequest, ctx: &RuleContext<'_>) -> Vec<FraudSignal> {
        let mut signals = Vec::new();

        let language = payload.navigator.language.as_deref();
        let languages = &payload.navigator.languages;

        if language.is_none() && languages.is_empty() {
            signals.push(FraudSignal::new(
                "MISSING_LANGUAGE_DATA",
                10,
                "Browser language signals are missing.",
            ));
        }

        if let Some(language) = language {
            if !languages.is_empty() {
                let in_list = languages
                    .iter()
                    .any(|item| language_base(item) == language_base(language));
                if !in_list {
                    signals.push(FraudSignal::new(
                        "LANGUAGE_MISMATCH",
                        10,
                        "navigator.language is inconsistent with navigator.languages.",
                    ));
                }
            }
        }

        let Some(location) = &payload.location else {
            return signals;
        };
        let (Some(timezone), Some(reported_offset)) =
            (location.timezone.as_deref(), location.utc_offset_minutes)
        else {
            return signals;
        };

        let at = payload.collected_at.unwrap_or(ctx.now);
        let Some(expected_offset) = timezone_offset_minutes(timezone, at) else {
            return signals;
        };

        if (expected_offset - reported_offset).abs() > 60 {
            signals.push(FraudSignal::new(
                "TIMEZONE_OFFSET_MISMATCH",
                20,
                "Reported timezone and UTC offset are inconsistent.",
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
        LocaleRules
            .collect(payload, &ctx)
            .into_iter()
            .map(|s| s.code)
            .collect()
    }

    #[test]
    fn test_missing_language_data() {
        let payload = payload_with_ua("Mozilla/5.0 test agent");
        assert_eq!(codes(&payload), vec!["MISSING_LANGUAGE_DATA"]);
    }

    #[test]
    fn test_language_mismatch() {
        let mut payload = payload_with_ua("Mozilla/5.0 test agent");
        payload.navigator.language = Some("fr-FR".into());
        payload.navigator.languages = vec!["en-US".into(), "en".into()];
        assert_eq!(codes(&payload), vec!["LANGUAGE_MISMATCH"]);

        payload.navigator.language = Some("en-GB".into());
        assert!(codes(&payload).is_empty());
    }

    #[test]
    fn test_timezone_offset_mismatch() {
        let mut payload = payload_with_ua("Mozilla/5.0 test agent");
        payload.navigator.language = Some("en-US".into());
        payload.navigator.languages = vec!["en-US".into()];
        // UTC in January; claiming +180 minutes is off by more than an hour.
        payload.collected_at = Some("2026-01-15T12:00:00Z".parse().unwrap());
        payload.location = serde_json::from_value(serde_json::json!({
            "timezone": "Etc/UTC", "utc_offset_minutes": 180
        }))
        .map(Some)
        .unwrap();
        assert_eq!(codes(&payload), vec!["TIMEZONE_OFFSET_MISMATCH"]);
    }

    #[test]
    fn test_dst_aware_offset() {
        // Berlin is UTC+2 in July; 120 minutes is exact, no signal.
        let mut payload = payload_with_ua("Mozilla/5.0 test agent");
        payload.navigator.language = Some("de-DE".into());
        payload.navigator.languages = vec!["de-DE".into()];
        payload.collected_at = Some("2026-07-15T12:00:00Z".parse().unwrap());
        payload.location = serde_json::from_value(serde_json::json!({
            "timezone": "Europe/Berlin", "utc_offset_minutes": 120
        }))
        .map(Some)
        .unwrap();
        assert!(codes(&payload).is_empty());
    }

    #[test]
    fn test_unknown_timezone_is_silent() {
        let mut payload = payload_with_ua("Mozilla/5.0 test agent");
        payload.navigator.language = Some("en-US".into());
        payload.navigator.languages = vec!["en-US".into()];
        payload.location = serde_json::from_value(serde_json::json!({
            "timezone": "Mars/Olympus_Mons", "utc_offset_minutes": 0
        }))
        .map(Some)
        .unwrap();
        assert!(codes(&payload).is_empty());
    }

    #[test]
    fn test_timezone_offset_minutes_helper() {
        let at = "2026-01-15T12:00:00Z".parse().unwrap();
        assert_eq!(timezone_offset_minutes("Etc/UTC", at), Some(0));
        assert_eq!(timezone_offset_minutes("America/New_York", at), Some(-300));
        assert_eq!(timezone_offset_minutes("Not/A_Zone", at), None);
    }
}
