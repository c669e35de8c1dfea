use crate::models::payload::FraudCheckRequest;
use crate::models::signal::FraudSignal;

use super::{Rule, RuleContext};

// Submissions faster than this are suspicious.
const MIN_TIME_ON_PAGE_MS: u32 = 3000;
// At least a few keydowns or mouse/touch events are expected from a human.
const MIN_INTERACTION_EVENTS: u32 = 3;

/// Per-request behavioral plausibility. Stateless; the cross-request
/// similarity detector lives in the counters module.
pub struct BehaviorRules;

impl Rule for BehaviorRules {
    fn collect(&self, payload: &FraudCheckRequest, _ctx: &RuleContext<'_>) -> Vec<FraudSignal> {
        let Some(bhv) = &payload.behavior else {
            return Vec::new();
        };

        let mut signals = Vec::new();

        if bhv
            .time_on_page_ms
            .is_some_and(|ms| ms < MIN_TIME_ON_PAGE_MS)
        {
            signals.push(FraudSignal::new(
                "TOO_FAST_SUBMISSION",
                25,
                "Page was submitted too quickly (under 3 seconds).",
            ));
        }

        if let (Some(0), Some(document_height)) = (bhv.scroll_count, bhv.document_height) {
            if document_height > 1200 && document_height > payload.viewport.height + 200 {
                signals.push(FraudSignal::new(
                    "NO_SCROLL_BEFORE_SUBMIT",
                    18,
                    "No scroll detected on a page that requires scrolling.",
                ));
            }
        }

        let interactions = bhv.keydown_count.unwrap_or(0)
            + bhv.mouse_move_count.unwrap_or(0)
            + bhv.touch_count.unwrap_or(0);
        if interactions < MIN_INTERACTION_EVENTS {
            signals.push(FraudSignal::new(
                "NO_HUMAN_INTERACTION",
                30,
                "No keyboard, mouse, or touch events detected.",
            ));
        }

        signals
    }
}
