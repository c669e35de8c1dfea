//! Case-insensitive substring classifiers over the User-Agent string.
//! All functions expect the UA pre-lowercased by the caller.

pub const MOBILE_UA_MARKERS: &[&str] = &["android", "iphone", "ipad", "ipod", "mobile"];

pub const AUTOMATION_MARKERS: &[&str] = &[
    "headless",
    "phantomjs",
    "puppeteer",
    "playwright",
    "selenium",
    "webdriver",
];

pub const BOT_UA_MARKERS: &[&str] = &["bot", "crawler", "spider", "scrapy", "curl", "wget"];

/// HTTP-client signatures that dominate a check with a single high-weight
/// signal.
pub const STRONG_BOT_UA_MARKERS: &[&str] = &[
    "curl/",
    "wget/",
    "python-requests",
    "go-http-client",
    "httpclient",
];

pub fn contains_any(value: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| value.contains(marker))
}

pub fn has_mobile_ua(ua: &str) -> bool {
    contains_any(ua, MOBILE_UA_MARKERS)
}

pub fn is_android_ua(ua: &str) -> bool {
    ua.contains("android")
}

pub fn is_ios_ua(ua: &str) -> bool {
    ua.contains("iphone") || ua.contains("ipad") || ua.contains("ipod")
}

pub fn is_desktop_mac_ua(ua: &str) -> bool {
    ua.contains("macintosh")
}

pub fn is_chromium_ua(ua: &str) -> bool {
    ["chrome/", "chromium", "crios", "edg/", "opr/"]
        .iter()
        .any(|token| ua.contains(token))
}

/// Android without "mobile" is a tablet per the UA convention.
pub fn is_tablet_ua(ua: &str) -> bool {
    if ua.contains("ipad") || ua.contains("tablet") {
        return true;
    }
    ua.contains("android") && !ua.contains("mobile")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mobile_and_tablet() {
        assert!(has_mobile_ua("mozilla/5.0 (iphone; cpu iphone os 17_0)"));
        assert!(!has_mobile_ua("mozilla/5.0 (windows nt 10.0; win64; x64)"));
        assert!(is_tablet_ua("mozilla/5.0 (ipad; cpu os 17_0)"));
        // Android without "mobile" = tablet
        assert!(is_tablet_ua("mozilla/5.0 (linux; android 14; sm-x910)"));
        assert!(!is_tablet_ua(
            "mozilla/5.0 (linux; android 14; pixel 8) mobile"
        ));
    }

    #[test]
    fn test_chromium_markers() {
        assert!(is_chromium_ua("mozilla/5.0 chrome/120.0 safari/537.36"));
        assert!(is_chromium_ua("mozilla/5.0 edg/120.0"));
        assert!(!is_chromium_ua("mozilla/5.0 (x11; linux) firefox/121.0"));
    }

    #[test]
    fn test_strong_bot_markers() {
        assert!(contains_any("curl/8.4.0", STRONG_BOT_UA_MARKERS));
        assert!(contains_any("python-requests/2.31", STRONG_BOT_UA_MARKERS));
        assert!(!contains_any(
            "mozilla/5.0 chrome/120.0",
            STRONG_BOT_UA_MARKERS
        ));
    }
}
