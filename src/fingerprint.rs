//! Deterministic device fingerprint.
//!
//! The fingerprint identifies a browser configuration, not a user: it is the
//! first 24 hex characters of SHA-256 over a canonical JSON snapshot of the
//! identity-bearing payload fields. Canonical form means lexicographically
//! sorted keys and compact separators, so identical configurations always
//! hash identically.

use serde_json::json;
use sha2::{Digest, Sha256};

use crate::models::payload::FraudCheckRequest;

const FINGERPRINT_HEX_LEN: usize = 24;

pub fn build_fingerprint(payload: &FraudCheckRequest) -> String {
    // serde_json maps are BTreeMaps, so every object level serialises with
    // sorted keys; to_string emits compact separators.
    let snapshot = json!({
        "ua": payload.navigator.user_agent,
        "platform": payload.navigator.platform,
        "language": payload.navigator.language,
        "languages": payload.navigator.languages,
        "screen": payload.screen,
        "viewport": payload.viewport,
        "webgl": payload.webgl,
        "hints": payload.client_hints,
    });

    let body = snapshot.to_string();
    let hash = Sha256::digest(body.as_bytes());
    hash.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<String>()[..FINGERPRINT_HEX_LEN]
        .to_string()
}
