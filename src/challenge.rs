//! Short-lived captcha challenges keyed by challenge id.
//!
//! Supports the two-step flow: `/fraud/check` evaluates the payload and may
//! demand a captcha, returning a challenge id; `/fraud/captcha/verify`
//! verifies the captcha token and finalises the decision without
//! re-evaluating fraud. Entries are logically absent once expired or
//! attempts-exhausted. Per-process memory store; multi-replica deployments
//! would need a shared backend instead.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::Mutex;
use rand::RngCore;

use crate::models::response::FraudCheckResponse;

const TOKEN_BYTES: usize = 24;

/// A pending verdict bound to the IP/origin that produced it.
#[derive(Debug, Clone)]
pub struct CaptchaChallenge {
    /// Deep snapshot of the response at issue time; captcha fields added to
    /// the live response afterwards never reach the stored copy.
    pub response: FraudCheckResponse,
    pub request_ip: Option<String>,
    pub origin: Option<String>,
    expires_at: Instant,
    pub attempts: u32,
}

pub struct ChallengeStore {
    ttl: Duration,
    max_attempts: u32,
    items: Mutex<HashMap<String, CaptchaChallenge>>,
}

impl ChallengeStore {
    pub fn new(ttl_seconds: u64, max_attempts: u32) -> Self {
        Self {
            ttl: Duration::from_secs(ttl_seconds.max(1)),
            max_attempts: max_attempts.max(1),
            items: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl.as_secs()
    }

    fn is_dead(&self, item: &CaptchaChallenge, now: Instant) -> bool {
        item.expires_at <= now || item.attempts >= self.max_attempts
    }

    /// Store a challenge and return its freshly generated id: 24 random bytes
    /// from a CSPRNG, URL-safe base64 without padding (32 characters).
    /// Expired entries are purged on every create.
    pub fn create(
        &self,
        response: FraudCheckResponse,
        request_ip: Option<String>,
        origin: Option<String>,
    ) -> String {
        let mut token = [0u8; TOKEN_BYTES];
        rand::rng().fill_bytes(&mut token);
        let challenge_id = URL_SAFE_NO_PAD.encode(token);

        let now = Instant::now();
        let item = CaptchaChallenge {
            response,
            request_ip,
            origin,
            expires_at: now + self.ttl,
            attempts: 0,
        };

        let mut items = self.items.lock();
        items.retain(|_, item| !self.is_dead(item, now));
        items.insert(challenge_id.clone(), item);

        challenge_id
    }

    /// Fetch a live challenge. Dead entries are removed and reported absent.
    pub fn get(&self, challenge_id: &str) -> Option<CaptchaChallenge> {
        let now = Instant::now();
        let mut items = self.items.lock();
        let dead = self.is_dead(items.get(challenge_id)?, now);
        if dead {
            items.remove(challenge_id);
            return None;
        }
        items.get(challenge_id).cloned()
    }

    /// Count one failed verification. Returns the new attempt count, or
    /// `None` when the challenge is already gone. Exhausting the attempt
    /// budget removes the entry.
    pub fn increment_attempts(&self, challenge_id: &str) -> Option<u32> {
        let now = Instant::now();
        let mut items = self.items.lock();

        let dead = self.is_dead(items.get(challenge_id)?, now);
        if dead {
            items.remove(challenge_id);
            return None;
        }

        let attempts = {
            let item = items.get_mut(challenge_id)?;
            item.attempts += 1;
            item.attempts
        };
        if attempts >= self.max_attempts {
            items.remove(challenge_id);
        }
        Some(attempts)
    }

    /// Remove and return a live challenge (single-use, after a successful
    /// verification).
    pub fn consume(&self, challenge_id: &str) -> Option<CaptchaChallenge> {
        let now = Instant::now();
        let mut items = self.items.lock();
        let dead = self.is_dead(items.get(challenge_id)?, now);
        let item = items.remove(challenge_id);
        if dead {
            None
        } else {
            item
        }
    }
}
