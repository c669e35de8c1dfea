use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::settings::FraudConfig;
use crate::models::payload::BehaviorSignals;
use crate::models::signal::FraudSignal;

const PURGE_EVERY: u32 = 256;
const METRICS_COUNT: usize = 5;

#[derive(Debug, Clone, Copy)]
struct BehaviorSnapshot {
    taken_at: Instant,
    metrics: [u32; METRICS_COUNT],
}

impl BehaviorSnapshot {
    fn from_behavior(behavior: &BehaviorSignals) -> Self {
        Self {
            taken_at: Instant::now(),
            metrics: [
                behavior.max_scroll_y.unwrap_or(0),
                behavior.scroll_count.unwrap_or(0),
                behavior.keydown_count.unwrap_or(0),
                behavior.mouse_move_count.unwrap_or(0),
                behavior.touch_count.unwrap_or(0),
            ],
        }
    }
}

fn values_are_similar(new_val: u32, old_val: u32, tolerance: f64) -> bool {
    if new_val == 0 && old_val == 0 {
        return true;
    }
    let reference = new_val.max(old_val).max(1) as f64;
    (new_val as f64 - old_val as f64).abs() / reference <= tolerance
}

struct DetectorState {
    history: HashMap<String, VecDeque<BehaviorSnapshot>>,
    calls: u32,
}

/// Detects a device fingerprint replaying near-identical behavioral metrics
/// across requests. Humans are noisy; replayed automation is not.
pub struct BehaviorSimilarityDetector {
    history_size: usize,
    window: Duration,
    tolerance_pct: f64,
    match_ratio: f64,
    warn_threshold: u32,
    warn_weight: u32,
    suspicious_threshold: u32,
    suspicious_weight: u32,
    state: Mutex<DetectorState>,
}

impl BehaviorSimilarityDetector {
    pub fn new(config: &FraudConfig) -> Self {
        Self {
            history_size: config.behavior_similarity_history_size,
            window: Duration::from_secs(config.behavior_similarity_window_seconds),
            tolerance_pct: config.behavior_similarity_tolerance_pct,
            match_ratio: config.behavior_similarity_match_ratio,
            warn_threshold: config.behavior_similarity_warn_threshold,
            warn_weight: config.behavior_similarity_warn_weight,
            suspicious_threshold: config.behavior_similarity_suspicious_threshold,
            suspicious_weight: config.behavior_similarity_suspicious_weight,
            state: Mutex::new(DetectorState {
                history: HashMap::new(),
                calls: 0,
            }),
        }
    }

    fn count_similar(&self, snapshot: &BehaviorSnapshot, history: &VecDeque<BehaviorSnapshot>) -> u32 {
        let mut similar = 0;
        for past in history {
            let matching = snapshot
                .metrics
                .iter()
                .zip(past.metrics.iter())
                .filter(|(new_val, old_val)| {
                    values_are_similar(**new_val, **old_val, self.tolerance_pct)
                })
                .count();
            if matching as f64 / METRICS_COUNT as f64 >= self.match_ratio {
                similar += 1;
            }
        }
        similar
    }

    /// Record the current behavior snapshot and return the similarity signal,
    /// if the count of similar past snapshots reaches a threshold.
    pub fn record_and_check(
        &self,
        fingerprint_id: &str,
        behavior: Option<&BehaviorSignals>,
    ) -> Option<FraudSignal> {
        let behavior = behavior?;
        if fingerprint_id.is_empty() {
            return None;
        }

        let snapshot = BehaviorSnapshot::from_behavior(behavior);
        let cutoff = snapshot.taken_at.checked_sub(self.window);

        let similar_count = {
            let mut state = self.state.lock();

            state.calls += 1;
            if state.calls >= PURGE_EVERY {
                state.calls = 0;
                if let Some(cutoff) = cutoff {
                    state.history.retain(|_, snaps| {
                        snaps.back().is_some_and(|last| last.taken_at >= cutoff)
                    });
                }
            }

            let history = state.history.entry(fingerprint_id.to_string()).or_default();
            if let Some(cutoff) = cutoff {
                while history.front().is_some_and(|first| first.taken_at < cutoff) {
                    history.pop_front();
                }
            }

            let similar_count = self.count_similar(&snapshot, history);
            if history.len() >= self.history_size {
                history.pop_front();
            }
            history.push_back(snapshot);
            similar_count
        };

        if similar_count >= self.suspicious_threshold {
            return Some(FraudSignal::new(
                "BEHAVIOR_SIMILARITY_SUSPICIOUS",
                self.suspicious_weight,
                format!(
                    "Fingerprint produced {similar_count} behaviorally similar requests. \
                     Human behavior is rarely this consistent."
                ),
            ));
        }
        if similar_count >= self.warn_threshold {
            return Some(FraudSignal::new(
                "BEHAVIOR_SIMILARITY_WARN",
                self.warn_weight,
                format!(
                    "Fingerprint produced {similar_count} behaviorally similar requests, \
                     suggesting automated activity."
                ),
            ));
        }
        None
    }
}
