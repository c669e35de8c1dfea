use std::fmt;

use serde::{Deserialize, Serialize};

/// Final verdict for a fraud check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Review,
    Block,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Allow => write!(f, "allow"),
            Decision::Review => write!(f, "review"),
            Decision::Block => write!(f, "block"),
        }
    }
}

/// Severity bucket, derived from the signal weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// A named, weighted piece of evidence produced by a rule module.
///
/// Signal codes are the stable vocabulary consumed by downstream systems;
/// messages are human-readable and may change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudSignal {
    pub code: String,
    pub severity: Severity,
    pub weight: u32,
    pub message: String,
}

impl FraudSignal {
    pub fn new(code: &str, weight: u32, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            severity: severity_for_weight(weight),
            weight,
            message: message.into(),
        }
    }
}

pub fn severity_for_weight(weight: u32) -> Severity {
    if weight >= 30 {
        Severity::High
    } else if weight >= 12 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

pub fn decision_for_score(score: u32, block_threshold: u32, review_threshold: u32) -> Decision {
    if score >= block_threshold {
        Decision::Block
    } else if score >= review_threshold {
        Decision::Review
    } else {
        Decision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_boundaries() {
        assert_eq!(severity_for_weight(30), Severity::High);
        assert_eq!(severity_for_weight(29), Severity::Medium);
        assert_eq!(severity_for_weight(12), Severity::Medium);
        assert_eq!(severity_for_weight(11), Severity::Low);
        assert_eq!(severity_for_weight(1), Severity::Low);
    }

    #[test]
    fn test_decision_thresholds() {
        assert_eq!(decision_for_score(70, 70, 40), Decision::Block);
        assert_eq!(decision_for_score(69, 70, 40), Decision::Review);
        assert_eq!(decision_for_score(40, 70, 40), Decision::Review);
        assert_eq!(decision_for_score(39, 70, 40), Decision::Allow);
        assert_eq!(decision_for_score(0, 70, 40), Decision::Allow);
    }

    #[test]
    fn test_signal_severity_follows_weight() {
        let signal = FraudSignal::new("WEBDRIVER_ENABLED", 70, "webdriver on");
        assert_eq!(signal.severity, Severity::High);
        let signal = FraudSignal::new("LOW_CPU_CORE_COUNT", 8, "one core");
        assert_eq!(signal.severity, Severity::Low);
    }

    #[test]
    fn test_decision_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Decision::Review).unwrap(), "\"review\"");
    }
}
