use crate::models::payload::FraudCheckRequest;
use crate::models::signal::FraudSignal;
use crate::normalize::user_agent::{is_android_ua, is_desktop_mac_ua, is_ios_ua, is_tablet_ua};

use super::{Rule, RuleContext};

const ANDROID_PLATFORM_MARKERS: &[&str] = &["android", "linux"];
const IOS_PLATFORM_MARKERS: &[&str] = &["iphone", "ipad", "ipod", "macintel"];

/// Coarse platform bucket derived from the User-Agent string.
pub fn platform_family_from_user_agent(ua: &str) -> Option<&'static str> {
    if ua.contains("android") {
        return Some("android");
    }
    if ua.contains("iphone") || ua.contains("ipad") || ua.contains("ipod") {
        return Some("apple");
    }
    if ua.contains("windows") {
        return Some("windows");
    }
    if ua.contains("macintosh") {
        return Some("apple");
    }
    if ua.contains("cros") {
        return Some("chromeos");
    }
    if ua.contains("linux") {
        return Some("linux");
    }
    None
}

/// Coarse platform bucket derived from `navigator.platform` (lowercased).
pub fn platform_family_from_navigator(platform: &str) -> Option<&'static str> {
    if platform.is_empty() {
        return None;
    }
    if platform.starts_with("win") {
        return Some("windows");
    }
    if platform.contains("android") {
        return Some("android");
    }
    if platform.contains("cros") {
        return Some("chromeos");
    }
    if platform.contains("linux") || platform.contains("x11") {
        return Some("linux");
    }
    if ["mac", "iphone", "ipad", "ipod", "macintel"]
        .iter()
        .any(|item| platform.contains(item))
    {
        return Some("apple");
    }
    None
}

/// Coarse platform bucket derived from `sec-ch-ua-platform` / client hints.
pub fn platform_family_from_client_hints(platform: &str) -> Option<&'static str> {
    let marker = platform.trim().trim_matches('"').to_lowercase();
    match marker.as_str() {
        "windows" => Some("windows"),
        "android" => Some("android"),
        "ios" | "macos" => Some("apple"),
        "linux" => Some("linux"),
        "chrome os" | "chromeos" | "cros" => Some("chromeos"),
        _ => None,
    }
}

fn exceeds_screen(value: u32, screen_value: u32, tolerance: u32) -> bool {
    value > screen_value + tolerance
}

fn invalid_available_dimension(avail_value: Option<u32>, screen_value: u32) -> bool {
    match avail_value {
        Some(avail) => avail > screen_value + 20,
        None => false,
    }
}

/// Cross-checks the UA, navigator, screen, viewport, and client-hint claims
/// against one another. Real devices are internally consistent; spoofed
/// environments usually disagree somewhere.
pub struct DeviceRules;

impl Rule for DeviceRules {
    fn collect(&self, payload: &FraudCheckRequest, ctx: &RuleContext<'_>) -> Vec<FraudSignal> {
        let mut signals = Vec::new();
        let ua = ctx.ua.as_str();
        let platform = ctx.platform.as_str();

        let tablet_ua = is_tablet_ua(ua);
        let max_width = payload.viewport.width.max(payload.screen.width);
        if ctx.is_mobile_ua && !tablet_ua && max_width >= 1280 {
            signals.push(FraudSignal::new(
                "MOBILE_UA_DESKTOP_VIEWPORT",
                30,
                "Mobile User-Agent with desktop-sized viewport/screen.",
            ));
        }

        if let Some(hints) = &payload.client_hints {
            if let Some(hints_mobile) = hints.mobile {
                if hints_mobile != (ctx.is_mobile_ua && !tablet_ua) {
                    signals.push(FraudSignal::new(
                        "UA_CLIENT_HINTS_MISMATCH",
                        20,
                        "Client hints mobile flag is inconsistent with User-Agent.",
                    ));
                }
            }

            if let Some(hints_platform) = hints.platform.as_deref() {
                let ua_family = platform_family_from_user_agent(ua);
                let ch_family = platform_family_from_client_hints(hints_platform);
                if let (Some(ua_family), Some(ch_family)) = (ua_family, ch_family) {
                    if ua_family != ch_family {
                        signals.push(FraudSignal::new(
                            "UA_CH_PLATFORM_MISMATCH",
                            20,
                            "Client hints platform is inconsistent with User-Agent platform.",
                        ));
                    }
                }

                let nav_family = platform_family_from_navigator(platform);
                if let (Some(nav_family), Some(ch_family)) = (nav_family, ch_family) {
                    // Android WebViews legitimately report navigator.platform
                    // as a Linux string.
                    let android_linux_exception = ua_family == Some("android")
                        && nav_family == "linux"
                        && ch_family == "android";
                    if !android_linux_exception && nav_family != ch_family {
                        signals.push(FraudSignal::new(
                            "NAV_CH_PLATFORM_MISMATCH",
                            15,
                            "Client hints platform is inconsistent with navigator.platform.",
                        ));
                    }
                }
            }
        }

        if exceeds_screen(payload.viewport.width, payload.screen.width, 120) {
            signals.push(FraudSignal::new(
                "VIEWPORT_EXCEEDS_SCREEN_WIDTH",
                15,
                "Viewport width significantly exceeds screen width.",
            ));
        }

        if exceeds_screen(payload.viewport.height, payload.screen.height, 160) {
            signals.push(FraudSignal::new(
                "VIEWPORT_EXCEEDS_SCREEN_HEIGHT",
                12,
                "Viewport height significantly exceeds screen height.",
            ));
        }

        if let Some(avail_width) = payload.screen.avail_width {
            if exceeds_screen(payload.viewport.width, avail_width, 240) {
                signals.push(FraudSignal::new(
                    "VIEWPORT_EXCEEDS_SCREEN_AVAIL_WIDTH",
                    8,
                    "Viewport width significantly exceeds screen.availWidth.",
                ));
            }
        }

        if let Some(avail_height) = payload.screen.avail_height {
            if exceeds_screen(payload.viewport.height, avail_height, 320) {
                signals.push(FraudSignal::new(
                    "VIEWPORT_EXCEEDS_SCREEN_AVAIL_HEIGHT",
                    8,
                    "Viewport height significantly exceeds screen.availHeight.",
                ));
            }
        }

        if invalid_available_dimension(payload.screen.avail_width, payload.screen.width) {
            signals.push(FraudSignal::new(
                "SCREEN_AVAIL_WIDTH_INVALID",
                12,
                "screen.availWidth is larger than screen.width.",
            ));
        }

        if invalid_available_dimension(payload.screen.avail_height, payload.screen.height) {
            signals.push(FraudSignal::new(
                "SCREEN_AVAIL_HEIGHT_INVALID",
                12,
                "screen.availHeight is larger than screen.height.",
            ));
        }

        if payload.screen.pixel_ratio.is_some_and(|ratio| ratio > 5.0) {
            signals.push(FraudSignal::new(
                "UNUSUAL_PIXEL_RATIO",
                10,
                "Reported device pixel ratio is unusually high.",
            ));
        }

        if ctx.is_mobile_ua && payload.navigator.max_touch_points == Some(0) {
            signals.push(FraudSignal::new(
                "MOBILE_UA_ZERO_TOUCH_POINTS",
                15,
                "Mobile User-Agent reports zero touch points.",
            ));
        }

        if !ctx.is_mobile_ua && payload.navigator.max_touch_points.unwrap_or(0) >= 10 {
            signals.push(FraudSignal::new(
                "DESKTOP_UA_HIGH_TOUCH_POINTS",
                8,
                "Desktop User-Agent reports unusually high touch points.",
            ));
        }

        if !ctx.is_mobile_ua && payload.viewport.width <= 420 && payload.viewport.height <= 420 {
            signals.push(FraudSignal::new(
                "TINY_VIEWPORT_DESKTOP",
                6,
                "Desktop-like UA with an unusually small viewport.",
            ));
        }

        if is_android_ua(ua)
            && !platform.is_empty()
            && !ANDROID_PLATFORM_MARKERS
                .iter()
                .any(|marker| platform.contains(marker))
        {
            signals.push(FraudSignal::new(
                "UA_PLATFORM_MISMATCH_ANDROID",
                15,
                "UA claims Android but navigator.platform differs.",
            ));
        }

        if is_ios_ua(ua)
            && !platform.is_empty()
            && !IOS_PLATFORM_MARKERS
                .iter()
                .any(|marker| platform.contains(marker))
        {
            signals.push(FraudSignal::new(
                "UA_PLATFORM_MISMATCH_IOS",
                15,
                "UA claims iOS but navigator.platform differs.",
            ));
        }

        if ua.contains("windows") && !platform.is_empty() && !platform.contains("win") {
            signals.push(FraudSignal::new(
                "UA_PLATFORM_MISMATCH_WINDOWS",
                15,
                "UA claims Windows but navigator.platform differs.",
            ));
        }

        if is_desktop_mac_ua(ua) && !platform.is_empty() && !platform.contains("mac") {
            signals.push(FraudSignal::new(
                "UA_PLATFORM_MISMATCH_MAC",
                15,
                "UA claims desktop macOS but navigator.platform differs.",
            ));
        }

        if ua.contains("linux")
            && !is_android_ua(ua)
            && !platform.is_empty()
            && !platform.contains("linux")
            && !platform.contains("x11")
        {
            signals.push(FraudSignal::new(
                "UA_PLATFORM_MISMATCH_LINUX",
                15,
                "UA claims Linux but navigator.platform differs.",
            ));
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
        DeviceRules
            .collect(payload, &ctx)
            .into_iter()
            .map(|s| s.code)
            .collect()
    }

    #[test]
    fn test_mobile_ua_desktop_viewport() {
        let mut payload =
            payload_with_ua("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0) Mobile/15E148");
        payload.navigator.platform = Some("iPhone".into());
        payload.navigator.max_touch_points = Some(5);
        assert_eq!(codes(&payload), vec!["MOBILE_UA_DESKTOP_VIEWPORT"]);
    }

    #[test]
    fn test_tablet_ua_not_flagged_for_wide_viewport() {
        let mut payload = payload_with_ua("Mozilla/5.0 (iPad; CPU OS 17_0)");
        payload.navigator.platform = Some("iPad".into());
        payload.navigator.max_touch_points = Some(5);
        assert!(codes(&payload).is_empty());
    }

    #[test]
    fn test_client_hints_mobile_mismatch() {
        let mut payload = payload_with_ua("Mozilla/5.0 (Windows NT 10.0; Win64; x64)");
        payload.navigator.platform = Some("Win32".into());
        payload.client_hints = serde_json::from_value(serde_json::json!({
            "mobile": true, "platform": "Windows", "brands": []
        }))
        .map(Some)
        .unwrap();
        assert_eq!(codes(&payload), vec!["UA_CLIENT_HINTS_MISMATCH"]);
    }

    #[test]
    fn test_platform_family_tables() {
        assert_eq!(platform_family_from_user_agent("mozilla (x11; linux x86_64)"), Some("linux"));
        assert_eq!(platform_family_from_user_agent("mozilla (windows nt 10.0)"), Some("windows"));
        assert_eq!(platform_family_from_user_agent("mozilla (macintosh)"), Some("apple"));
        assert_eq!(platform_family_from_user_agent("opera/9.80"), None);

        assert_eq!(platform_family_from_navigator("win32"), Some("windows"));
        assert_eq!(platform_family_from_navigator("macintel"), Some("apple"));
        assert_eq!(platform_family_from_navigator("linux armv8l"), Some("linux"));
        assert_eq!(platform_family_from_navigator(""), None);

        assert_eq!(platform_family_from_client_hints("\"Windows\""), Some("windows"));
        assert_eq!(platform_family_from_client_hints("macOS"), Some("apple"));
        assert_eq!(platform_family_from_client_hints("Chrome OS"), Some("chromeos"));
        assert_eq!(platform_family_from_client_hints("BeOS"), None);
    }

    #[test]
    fn test_android_linux_exception() {
        // Android UA + navigator "Linux armv8l" + hints "Android" is a real
        // WebView combination and must not raise NAV_CH_PLATFORM_MISMATCH.
        let mut payload =
            payload_with_ua("Mozilla/5.0 (Linux; Android 14; Pixel 8) Mobile Chrome/120.0");
        payload.navigator.platform = Some("Linux armv8l".into());
        payload.navigator.max_touch_points = Some(5);
        payload.viewport.width = 412;
        payload.viewport.height = 915;
        payload.screen.width = 412;
        payload.screen.height = 915;
        payload.client_hints = serde_json::from_value(serde_json::json!({
            "mobile": true, "platform": "Android", "brands": []
        }))
        .map(Some)
        .unwrap();
        assert!(codes(&payload).is_empty());
    }

    #[test]
    fn test_viewport_exceeds_screen() {
        let mut payload = payload_with_ua("Mozilla/5.0 (Windows NT 10.0; Win64; x64)");
        payload.navigator.platform = Some("Win32".into());
        payload.screen.width = 1000;
        payload.screen.height = 600;
        payload.viewport.width = 1200; // 1000 + 120 < 1200
        payload.viewport.height = 800; // 600 + 160 < 800
        assert_eq!(
            codes(&payload),
            vec![
                "VIEWPORT_EXCEEDS_SCREEN_WIDTH",
                "VIEWPORT_EXCEEDS_SCREEN_HEIGHT"
            ]
        );
    }

    #[test]
    fn test_avail_larger_than_screen() {
        let mut payload = payload_with_ua("Mozilla/5.0 (Windows NT 10.0; Win64; x64)");
        payload.navigator.platform = Some("Win32".into());
        payload.screen.avail_width = Some(payload.screen.width + 21);
        payload.screen.avail_height = Some(payload.screen.height + 21);
        assert_eq!(
            codes(&payload),
            vec!["SCREEN_AVAIL_WIDTH_INVALID", "SCREEN_AVAIL_HEIGHT_INVALID"]
        );
    }

    #[test]
    fn test_ua_platform_mismatches() {
        let mut payload = payload_with_ua("Mozilla/5.0 (Windows NT 10.0; Win64; x64)");
        payload.navigator.platform = Some("MacIntel".into());
        assert_eq!(codes(&payload), vec!["UA_PLATFORM_MISMATCH_WINDOWS"]);

        let mut payload = payload_with_ua("Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0)");
        payload.navigator.platform = Some("Win32".into());
        assert_eq!(codes(&payload), vec!["UA_PLATFORM_MISMATCH_MAC"]);
    }

    #[test]
    fn test_touch_point_checks() {
        let mut payload =
            payload_with_ua("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0) Mobile/15E148");
        payload.navigator.platform = Some("iPhone".into());
        payload.navigator.max_touch_points = Some(0);
        payload.viewport.width = 390;
        payload.viewport.height = 844;
        payload.screen.width = 390;
        payload.screen.height = 844;
        assert_eq!(codes(&payload), vec!["MOBILE_UA_ZERO_TOUCH_POINTS"]);

        let mut payload = payload_with_ua("Mozilla/5.0 (Windows NT 10.0; Win64; x64)");
        payload.navigator.platform = Some("Win32".into());
        payload.navigator.max_touch_points = Some(10);
        assert_eq!(codes(&payload), vec!["DESKTOP_UA_HIGH_TOUCH_POINTS"]);
    }

    #[test]
    fn test_tiny_viewport_desktop() {
        let mut payload = payload_with_ua("Mozilla/5.0 (Windows NT 10.0; Win64; x64)");
        payload.navigator.platform = Some("Win32".into());
        payload.viewport.width = 400;
        payload.viewport.height = 300;
        assert_eq!(codes(&payload), vec!["TINY_VIEWPORT_DESKTOP"]);
    }
}
