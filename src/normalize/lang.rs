//! Accept-Language and `sec-ch-ua` parsing plus set similarity.

use std::collections::HashSet;

/// Base code of a language tag: `en-US` -> `en`.
pub fn language_base(language: &str) -> String {
    language
        .split('-')
        .next()
        .unwrap_or(language)
        .to_lowercase()
}

/// First language of an Accept-Language header, quality stripped.
pub fn extract_primary_language(accept_language: &str) -> Option<String> {
    let first_token = accept_language.split(',').next()?.trim();
    if first_token.is_empty() {
        return None;
    }
    let language = first_token.split(';').next().unwrap_or("").trim();
    if language.is_empty() {
        None
    } else {
        Some(language.to_string())
    }
}

/// Split an Accept-Language header into its language tags, preserving order
/// and dropping quality parameters.
pub fn parse_accept_language(header: &str) -> Vec<String> {
    header
        .split(',')
        .filter_map(|token| {
            let value = token.trim();
            if value.is_empty() {
                return None;
            }
            let language = value.split(';').next().unwrap_or("").trim();
            if language.is_empty() {
                None
            } else {
                Some(language.to_string())
            }
        })
        .collect()
}

/// Extract quoted brand names from a `sec-ch-ua` header value.
///
/// Entries look like `"Chromium";v="120"`; only entries carrying a numeric
/// `v=` parameter count as brands.
pub fn parse_sec_ch_ua_brands(value: Option<&str>) -> HashSet<String> {
    let mut brands = HashSet::new();
    let Some(value) = value else {
        return brands;
    };

    for entry in value.split(',') {
        let entry = entry.trim();
        let Some(rest) = entry.strip_prefix('"') else {
            continue;
        };
        let Some(end) = rest.find('"') else {
            continue;
        };
        let brand = rest[..end].trim();
        if brand.is_empty() {
            continue;
        }

        // The remainder must carry v="<digits>" (quotes optional).
        let params = &rest[end + 1..];
        let Some(version) = params
            .split(';')
            .map(str::trim)
            .find_map(|p| p.strip_prefix("v").map(str::trim_start))
            .and_then(|p| p.strip_prefix('='))
        else {
            continue;
        };
        let version = version.trim().trim_matches('"');
        if !version.is_empty() && version.bytes().all(|b| b.is_ascii_digit()) {
            brands.insert(brand.to_string());
        }
    }

    brands
}

/// Brand normalisation: collapse whitespace, lowercase.
pub fn normalize_brand(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Jaccard similarity `|A∩B| / |A∪B|`. Two empty sets are identical (1.0).
pub fn jaccard_similarity(left: &HashSet<String>, right: &HashSet<String>) -> f64 {
    let union = left.union(right).count();
    if union == 0 {
        return 1.0;
    }
    let intersection = left.intersection(right).count();
    intersection as f64 / union as f64
}
