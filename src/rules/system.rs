use crate::models::payload::FraudCheckRequest;
use crate::models::signal::FraudSignal;
use crate::normalize::user_agent::is_chromium_ua;

use super::{Rule, RuleContext};

const SOFTWARE_RENDERER_MARKERS: &[&str] = &["swiftshader", "llvmpipe", "software"];

/// Hardware-profile plausibility checks. Virtualised and headless
/// environments report starved hardware and software GPU rendering.
pub struct SystemRules;

impl Rule for SystemRules {
    fn collect(&self, payload: &FraudCheckRequest, ctx: &RuleContext<'_>) -> Vec<FraudSignal> {
        let mut signals = Vec::new();

        if payload
            .navigator
            .hardware_concurrency
            .is_some_and(|cores| cores <= 1)
        {
            signals.push(FraudSignal::new(
                "LOW_CPU_CORE_COUNT",
                8,
                "Very low CPU core count for modern browsers.",
            ));
        }

        if ctx.is_desktop_ua
            && payload
                .navigator
                .device_memory
                .is_some_and(|memory| memory <= 0.5)
        {
            signals.push(FraudSignal::new(
                "LOW_DEVICE_MEMORY_DESKTOP",
                10,
                "Desktop-like browser with very low device memory.",
            ));
        }

        if ctx.is_desktop_ua
            && payload.navigator.plugins_count == Some(0)
            && is_chromium_ua(&ctx.ua)
        {
            signals.push(FraudSignal::new(
                "ZERO_PLUGINS_DESKTOP",
                12,
                "Desktop browser reports zero plugins.",
            ));
        }

        if let Some(renderer) = payload
            .webgl
            .as_ref()
            .and_then(|webgl| webgl.renderer.as_deref())
        {
            let renderer = renderer.to_lowercase();
            if SOFTWARE_RENDERER_MARKERS
                .iter()
                .any(|marker| renderer.contains(marker))
            {
                signals.push(FraudSignal::new(
                    "SOFTWARE_WEBGL_RENDERER",
                    25,
                    "WebGL renderer indicates software rendering/emulation.",
                ));
            }
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
        SystemRules
            .collect(payload, &ctx)
            .into_iter()
            .map(|s| s.code)
            .collect()
    }

    #[test]
    fn test_low_core_count() {
        let mut payload = payload_with_ua("Mozilla/5.0 (Windows NT 10.0) Firefox/121.0");
        payload.navigator.hardware_concurrency = Some(1);
        assert_eq!(codes(&payload), vec!["LOW_CPU_CORE_COUNT"]);
    }

    #[test]
    fn test_low_memory_desktop_only() {
        let mut payload = payload_with_ua("Mozilla/5.0 (Windows NT 10.0) Firefox/121.0");
        payload.navigator.device_memory = Some(0.5);
        assert_eq!(codes(&payload), vec!["LOW_DEVICE_MEMORY_DESKTOP"]);

        let mut payload = payload_with_ua("Mozilla/5.0 (iPhone) Mobile Safari");
        payload.navigator.device_memory = Some(0.5);
        assert!(codes(&payload).is_empty());
    }

    #[test]
    fn test_zero_plugins_requires_chromium_desktop() {
        let mut payload = payload_with_ua("Mozilla/5.0 (Windows NT 10.0) Chrome/120.0");
        payload.navigator.plugins_count = Some(0);
        assert_eq!(codes(&payload), vec!["ZERO_PLUGINS_DESKTOP"]);

        // Firefox with zero plugins is normal
        let mut payload = payload_with_ua("Mozilla/5.0 (Windows NT 10.0) Firefox/121.0");
        payload.navigator.plugins_count = Some(0);
        assert!(codes(&payload).is_empty());
    }

    #[test]
    fn test_software_webgl_renderer() {
        let mut payload = payload_with_ua("Mozilla/5.0 (Windows NT 10.0) Chrome/120.0");
        payload.webgl = serde_json::from_value(serde_json::json!({
            "vendor": "Google Inc.",
            "renderer": "Google SwiftShader"
        }))
        .map(Some)
        .unwrap();
        assert_eq!(codes(&payload), vec!["SOFTWARE_WEBGL_RENDERER"]);
    }
}
