use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

const PURGE_EVERY: u32 = 512;

struct LimiterState {
    events: HashMap<String, VecDeque<Instant>>,
    calls: u32,
}

/// Per-IP sliding-window admission control.
///
/// The N-th request within the window is still admitted; the (N+1)-th is
/// rejected. Requests without a resolvable IP are always admitted — the
/// limiter is backpressure, not authentication.
pub struct IpRateLimiter {
    window: Duration,
    max_requests: usize,
    state: Mutex<LimiterState>,
}

impl IpRateLimiter {
    pub fn new(window_seconds: u64, max_requests_per_ip: usize) -> Self {
        Self {
            window: Duration::from_secs(window_seconds),
            max_requests: max_requests_per_ip,
            state: Mutex::new(LimiterState {
                events: HashMap::new(),
                calls: 0,
            }),
        }
    }

    /// Record the request and report whether it is admitted.
    pub fn allow(&self, ip: Option<&str>) -> bool {
        let Some(ip) = ip else {
            return true;
        };

        let now = Instant::now();
        let cutoff = now.checked_sub(self.window);

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

        let events = state.events.entry(ip.to_string()).or_default();
        if let Some(cutoff) = cutoff {
            while events.front().is_some_and(|first| *first < cutoff) {
                events.pop_front();
            }
        }

        if events.len() >= self.max_requests {
            debug!(ip = ip, count = events.len(), "Rate limit exceeded");
            return false;
        }

        events.push_back(now);
        true
    }
}
