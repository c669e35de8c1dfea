//! Per-request scoring orchestrator.
//!
//! Data flows one way: rate limit, stateless rule pack, IP geolocation,
//! sliding-window counters, score aggregation, decision, optional challenge
//! issuance, audit. The verify protocol walks the stored challenge instead of
//! re-evaluating fraud. External calls happen outside every lock.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::HeaderMap;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::challenge::ChallengeStore;
use crate::clients::{CaptchaVerifier, IpGeoResolver};
use crate::config::settings::FraudConfig;
use crate::counters::behavior_similarity::BehaviorSimilarityDetector;
use crate::counters::fingerprint_velocity::FingerprintVelocityTracker;
use crate::counters::rate_limiter::IpRateLimiter;
use crate::fingerprint::build_fingerprint;
use crate::models::payload::FraudCheckRequest;
use crate::models::response::FraudCheckResponse;
use crate::models::signal::{decision_for_score, Decision, FraudSignal};
use crate::normalize::normalize_headers;
use crate::rules::geo::GeoRules;
use crate::rules::{rule_pack, Rule, RuleContext};
use crate::storage::{AuditSink, FraudCheckLog};

/// Protocol-level verify failures. Everything else stays in-band as a
/// `FraudCheckResponse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CaptchaVerifyError {
    #[error("captcha_challenge_not_found")]
    ChallengeNotFound,
    #[error("captcha_challenge_ip_missing")]
    IpMissing,
    #[error("captcha_challenge_ip_mismatch")]
    IpMismatch,
    #[error("captcha_challenge_origin_missing")]
    OriginMissing,
    #[error("captcha_challenge_origin_mismatch")]
    OriginMismatch,
}

impl CaptchaVerifyError {
    /// The not-found variant maps to 404; binding failures map to 400.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CaptchaVerifyError::ChallengeNotFound)
    }
}

fn rate_limit_signal() -> FraudSignal {
    FraudSignal::new(
        "RATE_LIMIT_EXCEEDED",
        100,
        "Too many requests from this IP in a short time.",
    )
}

pub struct FraudPipeline {
    config: FraudConfig,
    rules: Vec<Box<dyn Rule>>,
    geo_rules: GeoRules,
    rate_limiter: Arc<IpRateLimiter>,
    ip_geo: Arc<dyn IpGeoResolver>,
    captcha: Arc<dyn CaptchaVerifier>,
    challenges: Arc<ChallengeStore>,
    velocity: Arc<FingerprintVelocityTracker>,
    similarity: Arc<BehaviorSimilarityDetector>,
    audit: Arc<dyn AuditSink>,
}

impl FraudPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: FraudConfig,
        rate_limiter: Arc<IpRateLimiter>,
        ip_geo: Arc<dyn IpGeoResolver>,
        captcha: Arc<dyn CaptchaVerifier>,
        challenges: Arc<ChallengeStore>,
        velocity: Arc<FingerprintVelocityTracker>,
        similarity: Arc<BehaviorSimilarityDetector>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            config,
            rules: rule_pack(),
            geo_rules: GeoRules,
            rate_limiter,
            ip_geo,
            captcha,
            challenges,
            velocity,
            similarity,
            audit,
        }
    }

    /// Evaluate one telemetry payload.
    pub async fn check(
        &self,
        payload: &FraudCheckRequest,
        request_ip: Option<&str>,
        request_headers: &HeaderMap,
        origin: Option<&str>,
    ) -> FraudCheckResponse {
        let fingerprint_id = build_fingerprint(payload);

        if !self.rate_limiter.allow(request_ip) {
            info!(ip = request_ip.unwrap_or("-"), "Fraud check rate-limited");
            let response = FraudCheckResponse::new(
                Decision::Block,
                100,
                fingerprint_id,
                request_ip.map(str::to_string),
                None,
                vec![rate_limit_signal()],
            );
            self.save_log(&response, Some(payload), origin);
            return response;
        }

        let headers = normalize_headers(request_headers);
        let mut signals = self.collect_stateless(payload, &headers, request_ip);

        let ip_geo = match request_ip {
            Some(ip) => self.ip_geo.resolve(ip).await,
            None => None,
        };
        signals.extend(self.geo_rules.collect(payload, ip_geo.as_ref()));

        if let Some(signal) = self.velocity.record_and_check(&fingerprint_id) {
            signals.push(signal);
        }
        if let Some(signal) = self
            .similarity
            .record_and_check(&fingerprint_id, payload.behavior.as_ref())
        {
            signals.push(signal);
        }

        let score = signals.iter().map(|s| s.weight).sum::<u32>().min(100);
        let decision = decision_for_score(
            score,
            self.config.block_score_threshold,
            self.config.review_score_threshold,
        );

        debug!(
            fingerprint = %fingerprint_id,
            score = score,
            decision = %decision,
            signal_count = signals.len(),
            "Fraud check evaluated"
        );

        let mut response = FraudCheckResponse::new(
            decision,
            score,
            fingerprint_id,
            request_ip.map(str::to_string),
            ip_geo.as_ref().and_then(|geo| geo.country_iso.clone()),
            signals,
        );

        if decision == Decision::Review
            && self.captcha.is_configured()
            && self.challenges.ttl_seconds() > 0
        {
            // Snapshot first: the captcha fields below must not reach the
            // stored verdict.
            let challenge_id = self.challenges.create(
                response.clone(),
                request_ip.map(str::to_string),
                origin.map(str::to_string),
            );
            response.captcha_required = true;
            response.captcha_provider = Some(self.captcha.provider().to_string());
            response.captcha_site_key = self.captcha.site_key().map(str::to_string);
            response.challenge_id = Some(challenge_id);
        }

        self.save_log(&response, Some(payload), origin);
        response
    }

    fn collect_stateless(
        &self,
        payload: &FraudCheckRequest,
        headers: &HashMap<String, String>,
        request_ip: Option<&str>,
    ) -> Vec<FraudSignal> {
        let ctx = RuleContext::new(payload, headers, request_ip);
        let mut signals = Vec::new();
        for rule in &self.rules {
            signals.extend(rule.collect(payload, &ctx));
        }
        signals
    }

    /// Finalise a pending `review` verdict with a captcha token.
    pub async fn verify_captcha(
        &self,
        challenge_id: &str,
        captcha_token: &str,
        request_ip: Option<&str>,
        origin: Option<&str>,
    ) -> Result<FraudCheckResponse, CaptchaVerifyError> {
        let challenge = self
            .challenges
            .get(challenge_id)
            .ok_or(CaptchaVerifyError::ChallengeNotFound)?;

        // Verify consumes rate-limit quota before the binding checks; a
        // denied request does not burn a challenge attempt.
        if !self.rate_limiter.allow(request_ip) {
            info!(ip = request_ip.unwrap_or("-"), "Captcha verify rate-limited");
            let response = FraudCheckResponse::new(
                Decision::Block,
                100,
                challenge.response.fingerprint_id.clone(),
                request_ip.map(str::to_string),
                None,
                vec![rate_limit_signal()],
            );
            self.save_log(&response, None, origin);
            return Ok(response);
        }

        if let Some(bound_ip) = challenge.request_ip.as_deref() {
            let request_ip = request_ip.ok_or(CaptchaVerifyError::IpMissing)?;
            if bound_ip != request_ip {
                return Err(CaptchaVerifyError::IpMismatch);
            }
        }

        if let Some(bound_origin) = challenge.origin.as_deref() {
            let origin = origin.ok_or(CaptchaVerifyError::OriginMissing)?;
            if bound_origin.trim().to_lowercase() != origin.trim().to_lowercase() {
                return Err(CaptchaVerifyError::OriginMismatch);
            }
        }

        let verification = self.captcha.verify(captcha_token, request_ip).await;

        if verification.success {
            let consumed = self
                .challenges
                .consume(challenge_id)
                .ok_or(CaptchaVerifyError::ChallengeNotFound)?;
            let base = consumed.response;

            let mut response = FraudCheckResponse::new(
                Decision::Allow,
                base.risk_score,
                base.fingerprint_id,
                request_ip.map(str::to_string),
                base.ip_country_iso,
                base.signals,
            );
            response.captcha_verified = true;
            response.captcha_provider = Some(self.captcha.provider().to_string());
            response.captcha_site_key = self.captcha.site_key().map(str::to_string);
            response.challenge_id = Some(challenge_id.to_string());

            self.save_log(&response, None, origin);
            return Ok(response);
        }

        self.challenges.increment_attempts(challenge_id);
        let base = challenge.response;

        let mut response = FraudCheckResponse::new(
            base.decision,
            base.risk_score,
            base.fingerprint_id,
            request_ip.map(str::to_string),
            base.ip_country_iso,
            base.signals,
        );
        response.captcha_required = true;
        response.captcha_provider = Some(self.captcha.provider().to_string());
        response.captcha_site_key = self.captcha.site_key().map(str::to_string);
        response.captcha_error_codes = verification.error_codes;
        response.challenge_id = Some(challenge_id.to_string());

        self.save_log(&response, None, origin);
        Ok(response)
    }

    /// Best-effort audit append; failures are logged and swallowed.
    fn save_log(
        &self,
        response: &FraudCheckResponse,
        payload: Option<&FraudCheckRequest>,
        origin: Option<&str>,
    ) {
        let request_payload = payload
            .and_then(|p| serde_json::to_value(p).ok())
            .unwrap_or_else(|| serde_json::json!({}));
        let signals =
            serde_json::to_value(&response.signals).unwrap_or_else(|_| serde_json::json!([]));

        let log = FraudCheckLog {
            request_ip: response.request_ip.clone(),
            ip_country_iso: response.ip_country_iso.clone(),
            fingerprint_id: response.fingerprint_id.clone(),
            origin: origin.map(str::to_string),
            request_payload,
            decision: response.decision.to_string(),
            risk_score: response.risk_score,
            signals,
            captcha_required: response.captcha_required,
            captcha_verified: response.captcha_verified,
            challenge_id: response.challenge_id.clone(),
        };

        if let Err(e) = self.audit.append(&log) {
            error!(error = %e, "Failed to save fraud check log");
        }
    }
}
