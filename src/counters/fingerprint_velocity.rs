use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::settings::FraudConfig;
use crate::models::signal::FraudSignal;

const PURGE_EVERY: u32 = 512;

struct TrackerState {
    events: HashMap<String, VecDeque<Instant>>,
    calls: u32,
}

/// Sliding-window request counter per device fingerprint.
///
/// Emits at most one escalating signal per check: the highest of the
/// (critical, suspicious, warn) thresholds the in-window count reaches.
pub struct FingerprintVelocityTracker {
    window: Duration,
    /// (count threshold, weight, code), ordered by descending threshold.
    thresholds: Vec<(u32, u32, &'static str)>,
    state: Mutex<TrackerState>,
}

impl FingerprintVelocityTracker {
    pub fn new(config: &FraudConfig) -> Self {
        let mut thresholds = vec![
            (
                config.fingerprint_velocity_critical_threshold,
                config.fingerprint_velocity_critical_weight,
                "FINGERPRINT_VELOCITY_CRITICAL",
            ),
            (
                config.fingerprint_velocity_suspicious_threshold,
                config.fingerprint_velocity_suspicious_weight,
                "FINGERPRINT_VELOCITY_SUSPICIOUS",
            ),
            (
                config.fingerprint_velocity_warn_threshold,
                config.fingerprint_velocity_warn_weight,
                "FINGERPRINT_VELOCITY_WARN",
            ),
        ];
        thresholds.sort_by(|a, b| b.0.cmp(&a.0));

        Self {
            window: Duration::from_secs(config.fingerprint_velocity_window_seconds),
            thresholds,
            state: Mutex::new(TrackerState {
                events: HashMap::new(),
                calls: 0,
            }),
        }
    }

    /// Record one event for the fingerprint and return the reached signal,
    /// if any.
    pub fn record_and_check(&self, fingerprint_id: &str) -> Option<FraudSignal> {
        if fingerprint_id.is_empty() {
            return None;
        }

        let now = Instant::now();
        let cutoff = now.checked_sub(self.window);

        let count = {
            let mut state = self.state.lock();

            state.calls += 1;
            if state.calls >= PURGE_EVERY {
                state.calls = 0;
                if let Some(cutoff) = cutoff {
                    state
                        .events
                        .retain(|_, events| events.back().is_some_and(|last| *last >= cutoff));
                }
            }

            let events = state.events.entry(fingerprint_id.to_string()).or_default();
            if let Some(cutoff) = cutoff {
                while events.front().is_some_and(|first| *first < cutoff) {
                    events.pop_front();
                }
            }
            events.push_back(now);
            events.len() as u32
        };

        let window_minutes = self.window.as_secs() / 60;
        for &(threshold, weight, code) in &self.thresholds {
            if count >= threshold {
                return Some(FraudSignal::new(
                    code,
                    weight,
                    format!(
                        "Fingerprint submitted {count} requests in the last {window_minutes} minutes."
                    ),
                ));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::default_fraud_config;

    fn tracker(warn: u32, suspicious: u32, critical: u32) -> FingerprintVelocityTracker {
        let mut config = default_fraud_config();
        config.fingerprint_velocity_window_seconds = 300;
        config.fingerprint_velocity_warn_threshold = warn;
        config.fingerprint_velocity_suspicious_threshold = suspicious;
        config.fingerprint_velocity_critical_threshold = critical;
        FingerprintVelocityTracker::new(&config)
    }

    #[test]
    fn test_escalating_thresholds() {
        let tracker = tracker(3, 5, 8);
        let fp = "aabbccddeeff001122334455";

        assert!(tracker.record_and_check(fp).is_none());
        assert!(tracker.record_and_check(fp).is_none());
        let warn = tracker.record_and_check(fp).unwrap();
        assert_eq!(warn.code, "FINGERPRINT_VELOCITY_WARN");

        tracker.record_and_check(fp);
        let suspicious = tracker.record_and_check(fp).unwrap();
        assert_eq!(suspicious.code, "FINGERPRINT_VELOCITY_SUSPICIOUS");

        for _ in 0..2 {
            tracker.record_and_check(fp);
        }
        let critical = tracker.record_and_check(fp).unwrap();
        assert_eq!(critical.code, "FINGERPRINT_VELOCITY_CRITICAL");
        assert!(critical.message.contains("8 requests"));
    }

    #[test]
    fn test_fingerprints_are_independent() {
        let tracker = tracker(2, 5, 8);
        assert!(tracker.record_and_check("fp-one").is_none());
        assert!(tracker.record_and_check("fp-two").is_none());
        assert!(tracker.record_and_check("fp-one").is_some());
    }

    #[test]
    fn test_empty_fingerprint_ignored() {
        let tracker = tracker(1, 2, 3);
        assert!(tracker.record_and_check("").is_none());
    }
}
