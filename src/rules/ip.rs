use crate::models::payload::FraudCheckRequest;
use crate::models::signal::FraudSignal;
use crate::normalize::normalize_ip;

use super::{Rule, RuleContext};

/// Compares the client-reported IP (if the integrator forwards one) with the
/// actual request source address.
pub struct IpRules;

impl Rule for IpRules {
    fn collect(&self, payload: &FraudCheckRequest, ctx: &RuleContext<'_>) -> Vec<FraudSignal> {
        let client_reported = normalize_ip(payload.client_reported_ip.as_deref());
        let request_ip = normalize_ip(ctx.request_ip);

        if let (Some(client_reported), Some(request_ip)) = (client_reported, request_ip) {
            if client_reported != request_ip {
                return vec![FraudSignal::new(
                    "CLIENT_IP_MISMATCH",
                    30,
                    "Client-reported IP differs from request source IP.",
                )];
            }
        }

        Vec::new()
    }
}
