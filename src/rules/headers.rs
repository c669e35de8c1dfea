use std::collections::HashSet;

use crate::models::payload::FraudCheckRequest;
use crate::models::signal::FraudSignal;
use crate::normalize::lang::{
    extract_primary_language, jaccard_similarity, language_base, normalize_brand,
    parse_accept_language, parse_sec_ch_ua_brands,
};
use crate::normalize::normalize_text;
use crate::normalize::user_agent::is_chromium_ua;

use super::{Rule, RuleContext};

/// Compares what the payload claims against what the transport headers say.
/// A collector payload assembled on a different machine than the HTTP client
/// disagrees here.
pub struct HeaderRules;

impl Rule for HeaderRules {
    fn collect(&self, payload: &FraudCheckRequest, ctx: &RuleContext<'_>) -> Vec<FraudSignal> {
        let mut signals = Vec::new();
        let headers = ctx.headers;

        if let Some(header_ua) = headers.get("user-agent") {
            if normalize_text(header_ua) != normalize_text(&payload.navigator.user_agent) {
                signals.push(FraudSignal::new(
                    "UA_HEADER_PAYLOAD_MISMATCH",
                    40,
                    "Request User-Agent does not match payload user_agent.",
                ));
            }
        }

        let header_accept_language = headers.get("accept-language");
        if let (Some(header_accept_language), Some(payload_language)) =
            (header_accept_language, payload.navigator.language.as_deref())
        {
            if let Some(primary) = extract_primary_language(header_accept_language) {
                if language_base(&primary) != language_base(payload_language) {
                    signals.push(FraudSignal::new(
                        "ACCEPT_LANGUAGE_MISMATCH",
                        15,
                        "Request Accept-Language does not match payload language.",
                    ));
                }
            }
        }

        if let Some(header_accept_language) = header_accept_language {
            if !payload.navigator.languages.is_empty() {
                let header_bases: HashSet<String> = parse_accept_language(header_accept_language)
                    .iter()
                    .map(|item| language_base(item))
                    .collect();
                let payload_bases: HashSet<String> = payload
                    .navigator
                    .languages
                    .iter()
                    .map(|item| language_base(item))
                    .collect();
                if !header_bases.is_empty()
                    && !payload_bases.is_empty()
                    && header_bases.is_disjoint(&payload_bases)
                {
                    signals.push(FraudSignal::new(
                        "ACCEPT_LANGUAGE_LIST_MISMATCH",
                        8,
                        "Accept-Language header is inconsistent with navigator.languages.",
                    ));
                }
            }
        }

        if let Some(hints) = &payload.client_hints {
            if let Some(hints_mobile) = hints.mobile {
                // Only ?0 / ?1 are well-formed sec-ch-ua-mobile values.
                match headers.get("sec-ch-ua-mobile").map(String::as_str) {
                    Some(value @ ("?0" | "?1")) => {
                        if (value == "?1") != hints_mobile {
                            signals.push(FraudSignal::new(
                                "CH_MOBILE_MISMATCH",
                                20,
                                "sec-ch-ua-mobile header does not match payload client hints.",
                            ));
                        }
                    }
                    _ => {}
                }
            }

            if let Some(hints_platform) = hints.platform.as_deref() {
                if let Some(header_platform) = headers.get("sec-ch-ua-platform") {
                    let header_norm = normalize_text(header_platform.trim().trim_matches('"'));
                    let payload_norm = normalize_text(hints_platform);
                    if header_norm != payload_norm {
                        signals.push(FraudSignal::new(
                            "CH_PLATFORM_MISMATCH",
                            15,
                            "sec-ch-ua-platform header does not match payload client hints.",
                        ));
                    }
                }
            }
        }

        let header_ch_ua = headers.get("sec-ch-ua").map(String::as_str);
        if let Some(hints) = &payload.client_hints {
            if !hints.brands.is_empty() {
                let payload_brands: HashSet<String> = hints
                    .brands
                    .iter()
                    .filter(|item| !item.is_empty())
                    .map(|item| normalize_brand(item))
                    .collect();
                let header_brands: HashSet<String> = parse_sec_ch_ua_brands(header_ch_ua)
                    .iter()
                    .map(|item| normalize_brand(item))
                    .collect();

                if !payload_brands.is_empty() && !header_brands.is_empty() {
                    let similarity = jaccard_similarity(&payload_brands, &header_brands);
                    if similarity < 0.5 {
                        signals.push(FraudSignal::new(
                            "CH_BRANDS_MISMATCH",
                            25,
                            "sec-ch-ua brands do not match payload client hints brands.",
                        ));
                    } else if similarity < 1.0 {
                        signals.push(FraudSignal::new(
                            "CH_BRANDS_PARTIAL_MISMATCH",
                            10,
                            "sec-ch-ua brands partially mismatch payload client hints brands.",
                        ));
                    }
                }
            }
        }

        if is_chromium_ua(&ctx.ua) && header_ch_ua.is_none() && payload.client_hints.is_some() {
            signals.push(FraudSignal::new(
                "CH_HEADERS_MISSING",
                8,
                "User-AgentData is present but sec-ch-ua headers are missing.",
            ));
        }

        signals
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::rules::tests_support::{context_with, payload_with_ua};

    fn codes(payload: &FraudCheckRequest, headers: &HashMap<String, String>) -> Vec<String> {
        let ctx = context_with(payload, headers);
        HeaderRules
            .collect(payload, &ctx)
            .into_iter()
            .map(|s| s.code)
            .collect()
    }

    fn headers_of(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_ua_header_payload_mismatch() {
        let payload = payload_with_ua("Mozilla/5.0 payload agent");
        let headers = headers_of(&[("user-agent", "Mozilla/5.0 wire agent")]);
        assert_eq!(codes(&payload, &headers), vec!["UA_HEADER_PAYLOAD_MISMATCH"]);

        // Whitespace and case differences are normalised away.
        let headers = headers_of(&[("user-agent", "  MOZILLA/5.0   Payload Agent ")]);
        assert!(codes(&payload, &headers).is_empty());
    }

    #[test]
    fn test_accept_language_mismatch() {
        let mut payload = payload_with_ua("Mozilla/5.0 payload agent");
        payload.navigator.language = Some("en-US".into());
        let headers = headers_of(&[("accept-language", "de-DE,de;q=0.9")]);
        assert_eq!(codes(&payload, &headers), vec!["ACCEPT_LANGUAGE_MISMATCH"]);

        let headers = headers_of(&[("accept-language", "en-GB,en;q=0.9")]);
        assert!(codes(&payload, &headers).is_empty());
    }

    #[test]
    fn test_accept_language_list_mismatch() {
        let mut payload = payload_with_ua("Mozilla/5.0 payload agent");
        payload.navigator.languages = vec!["ru-RU".into(), "ru".into()];
        let headers = headers_of(&[("accept-language", "en-US,en;q=0.9")]);
        assert_eq!(
            codes(&payload, &headers),
            vec!["ACCEPT_LANGUAGE_LIST_MISMATCH"]
        );
    }

    #[test]
    fn test_ch_mobile_mismatch() {
        let mut payload = payload_with_ua("Mozilla/5.0 payload agent");
        payload.client_hints = serde_json::from_value(serde_json::json!({
            "mobile": false, "platform": null, "brands": []
        }))
        .map(Some)
        .unwrap();
        let headers = headers_of(&[("sec-ch-ua-mobile", "?1")]);
        assert_eq!(codes(&payload, &headers), vec!["CH_MOBILE_MISMATCH"]);

        // Malformed values are ignored
        let headers = headers_of(&[("sec-ch-ua-mobile", "yes")]);
        assert!(codes(&payload, &headers).is_empty());
    }

    #[test]
    fn test_ch_platform_mismatch() {
        let mut payload = payload_with_ua("Mozilla/5.0 payload agent");
        payload.client_hints = serde_json::from_value(serde_json::json!({
            "mobile": null, "platform": "Windows", "brands": []
        }))
        .map(Some)
        .unwrap();
        let headers = headers_of(&[("sec-ch-ua-platform", "\"macOS\"")]);
        assert_eq!(codes(&payload, &headers), vec!["CH_PLATFORM_MISMATCH"]);

        let headers = headers_of(&[("sec-ch-ua-platform", "\"Windows\"")]);
        assert!(codes(&payload, &headers).is_empty());
    }

    #[test]
    fn test_ch_brands_similarity_buckets() {
        let mut payload = payload_with_ua("Mozilla/5.0 payload agent");
        payload.client_hints = serde_json::from_value(serde_json::json!({
            "mobile": null, "platform": null,
            "brands": ["Chromium", "Google Chrome", "Not=A?Brand"]
        }))
        .map(Some)
        .unwrap();

        let headers = headers_of(&[(
            "sec-ch-ua",
            r#""Brave";v="120", "Other";v="99""#,
        )]);
        assert_eq!(codes(&payload, &headers), vec!["CH_BRANDS_MISMATCH"]);

        let headers = headers_of(&[(
            "sec-ch-ua",
            r#""Chromium";v="120", "Google Chrome";v="120""#,
        )]);
        assert_eq!(
            codes(&payload, &headers),
            vec!["CH_BRANDS_PARTIAL_MISMATCH"]
        );

        let headers = headers_of(&[(
            "sec-ch-ua",
            r#""Chromium";v="120", "Google Chrome";v="120", "Not=A?Brand";v="8""#,
        )]);
        assert!(codes(&payload, &headers).is_empty());
    }

    #[test]
    fn test_ch_headers_missing_for_chromium() {
        let mut payload = payload_with_ua("Mozilla/5.0 Chrome/120.0 Safari/537.36");
        payload.client_hints = serde_json::from_value(serde_json::json!({
            "mobile": null, "platform": null, "brands": []
        }))
        .map(Some)
        .unwrap();
        let headers = HashMap::new();
        assert_eq!(codes(&payload, &headers), vec!["CH_HEADERS_MISSING"]);

        // Firefox has no userAgentData expectation
        let payload = payload_with_ua("Mozilla/5.0 (X11; Linux) Firefox/121.0");
        assert!(codes(&payload, &headers).is_empty());
    }
}
