use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// `navigator.*` snapshot reported by the collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NavigatorSignals {
    pub user_agent: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub webdriver: Option<bool>,
    #[serde(default)]
    pub hardware_concurrency: Option<u32>,
    #[serde(default)]
    pub device_memory: Option<f64>,
    #[serde(default)]
    pub max_touch_points: Option<u32>,
    #[serde(default)]
    pub cookie_enabled: Option<bool>,
    #[serde(default)]
    pub plugins_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScreenSignals {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub avail_width: Option<u32>,
    #[serde(default)]
    pub avail_height: Option<u32>,
    #[serde(default)]
    pub color_depth: Option<u32>,
    #[serde(default)]
    pub pixel_ratio: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewportSignals {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebGlSignals {
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub renderer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocationSignals {
    #[serde(default)]
    pub country_iso: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub accuracy_meters: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientHintsSignals {
    #[serde(default)]
    pub mobile: Option<bool>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub brands: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BehaviorSignals {
    #[serde(default)]
    pub time_on_page_ms: Option<u32>,
    #[serde(default)]
    pub max_scroll_y: Option<u32>,
    #[serde(default)]
    pub scroll_count: Option<u32>,
    #[serde(default)]
    pub document_height: Option<u32>,
    #[serde(default)]
    pub keydown_count: Option<u32>,
    #[serde(default)]
    pub mouse_move_count: Option<u32>,
    #[serde(default)]
    pub touch_count: Option<u32>,
}

/// Immutable input of a fraud check. One payload per request; discarded
/// after the response is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FraudCheckRequest {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub client_reported_ip: Option<String>,
    pub navigator: NavigatorSignals,
    pub screen: ScreenSignals,
    pub viewport: ViewportSignals,
    #[serde(default)]
    pub webgl: Option<WebGlSignals>,
    #[serde(default)]
    pub location: Option<LocationSignals>,
    #[serde(default)]
    pub client_hints: Option<ClientHintsSignals>,
    #[serde(default)]
    pub behavior: Option<BehaviorSignals>,
    #[serde(default, deserialize_with = "deserialize_utc_lenient")]
    pub collected_at: Option<DateTime<Utc>>,
}

/// Body of `POST /fraud/captcha/verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaptchaVerifyRequest {
    pub challenge_id: String,
    pub captcha_token: String,
}

/// A payload field failed its range/format constraint. Maps to HTTP 422.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn fail(field: &'static str, message: impl Into<String>) -> Result<(), ValidationError> {
    Err(ValidationError {
        field,
        message: message.into(),
    })
}

fn check_u32(
    field: &'static str,
    value: Option<u32>,
    min: u32,
    max: u32,
) -> Result<(), ValidationError> {
    match value {
        Some(v) if v < min || v > max => fail(field, format!("must be between {min} and {max}")),
        _ => Ok(()),
    }
}

fn check_f64(
    field: &'static str,
    value: Option<f64>,
    min: f64,
    max: f64,
) -> Result<(), ValidationError> {
    match value {
        Some(v) if !v.is_finite() || v < min || v > max => {
            fail(field, format!("must be between {min} and {max}"))
        }
        _ => Ok(()),
    }
}

fn check_len(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<(), ValidationError> {
    match value {
        Some(v) if v.len() > max => fail(field, format!("must be at most {max} characters")),
        _ => Ok(()),
    }
}

impl FraudCheckRequest {
    /// Enforce the range/format constraints serde cannot express.
    /// Unknown fields and negative counters are already rejected at
    /// deserialization time.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_len("event_id", self.event_id.as_deref(), 128)?;
        check_len("session_id", self.session_id.as_deref(), 128)?;
        check_len("client_reported_ip", self.client_reported_ip.as_deref(), 64)?;

        let nav = &self.navigator;
        if nav.user_agent.len() < 10 || nav.user_agent.len() > 2048 {
            return fail(
                "navigator.user_agent",
                "must be between 10 and 2048 characters",
            );
        }
        check_len("navigator.language", nav.language.as_deref(), 32)?;
        if nav.languages.len() > 20 {
            return fail("navigator.languages", "must contain at most 20 entries");
        }
        check_len("navigator.platform", nav.platform.as_deref(), 128)?;
        check_u32(
            "navigator.hardware_concurrency",
            nav.hardware_concurrency,
            1,
            256,
        )?;
        check_f64("navigator.device_memory", nav.device_memory, 0.25, 128.0)?;
        check_u32("navigator.max_touch_points", nav.max_touch_points, 0, 64)?;
        check_u32("navigator.plugins_count", nav.plugins_count, 0, 200)?;

        check_u32("screen.width", Some(self.screen.width), 1, 10_000)?;
        check_u32("screen.height", Some(self.screen.height), 1, 10_000)?;
        check_u32("screen.avail_width", self.screen.avail_width, 1, 10_000)?;
        check_u32("screen.avail_height", self.screen.avail_height, 1, 10_000)?;
        check_u32("screen.color_depth", self.screen.color_depth, 1, 64)?;
        check_f64("screen.pixel_ratio", self.screen.pixel_ratio, 0.1, 10.0)?;

        check_u32("viewport.width", Some(self.viewport.width), 1, 10_000)?;
        check_u32("viewport.height", Some(self.viewport.height), 1, 10_000)?;

        if let Some(webgl) = &self.webgl {
            check_len("webgl.vendor", webgl.vendor.as_deref(), 256)?;
            check_len("webgl.renderer", webgl.renderer.as_deref(), 512)?;
        }

        if let Some(location) = &self.location {
            if let Some(iso) = &location.country_iso {
                if iso.len() != 2 || !iso.bytes().all(|b| b.is_ascii_uppercase()) {
                    return fail(
                        "location.country_iso",
                        "must be a two-letter uppercase ISO code",
                    );
                }
            }
            check_len("location.timezone", location.timezone.as_deref(), 128)?;
            if let Some(offset) = location.utc_offset_minutes {
                if !(-840..=840).contains(&offset) {
                    return fail(
                        "location.utc_offset_minutes",
                        "must be between -840 and 840",
                    );
                }
            }
            check_f64("location.latitude", location.latitude, -90.0, 90.0)?;
            check_f64("location.longitude", location.longitude, -180.0, 180.0)?;
            check_f64(
                "location.accuracy_meters",
                location.accuracy_meters,
                0.0,
                50_000.0,
            )?;
        }

        if let Some(hints) = &self.client_hints {
            check_len("client_hints.platform", hints.platform.as_deref(), 64)?;
            if hints.brands.len() > 20 {
                return fail("client_hints.brands", "must contain at most 20 entries");
            }
        }

        if let Some(bhv) = &self.behavior {
            check_u32("behavior.time_on_page_ms", bhv.time_on_page_ms, 0, 3_600_000)?;
            check_u32("behavior.max_scroll_y", bhv.max_scroll_y, 0, 100_000)?;
            check_u32("behavior.scroll_count", bhv.scroll_count, 0, 100_000)?;
            check_u32("behavior.document_height", bhv.document_height, 0, 100_000)?;
            check_u32("behavior.keydown_count", bhv.keydown_count, 0, 100_000)?;
            check_u32(
                "behavior.mouse_move_count",
                bhv.mouse_move_count,
                0,
                1_000_000,
            )?;
            check_u32("behavior.touch_count", bhv.touch_count, 0, 100_000)?;
        }

        Ok(())
    }
}

impl CaptchaVerifyRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.challenge_id.len() < 16 || self.challenge_id.len() > 256 {
            return fail("challenge_id", "must be between 16 and 256 characters");
        }
        if self.captcha_token.len() < 16 || self.captcha_token.len() > 8192 {
            return fail("captcha_token", "must be between 16 and 8192 characters");
        }
        Ok(())
    }
}

/// Accepts RFC 3339 timestamps with an offset, or naive timestamps which are
/// interpreted as UTC.
fn deserialize_utc_lenient<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw else {
        return Ok(None);
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Some(Utc.from_utc_datetime(&naive)));
    }

    Err(serde::de::Error::custom(format!(
        "invalid timestamp: {raw}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_payload_json() -> serde_json::Value {
        serde_json::json!({
            "navigator": {"user_agent": "Mozilla/5.0 test agent"},
            "screen": {"width": 1920, "height": 1080},
            "viewport": {"width": 1280, "height": 800}
        })
    }

    #[test]
    fn test_minimal_payload_deserializes_and_validates() {
        let payload: FraudCheckRequest =
            serde_json::from_value(minimal_payload_json()).unwrap();
        payload.validate().unwrap();
        assert!(payload.behavior.is_none());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let mut json = minimal_payload_json();
        json["surprise"] = serde_json::json!(1);
        assert!(serde_json::from_value::<FraudCheckRequest>(json).is_err());

        let mut json = minimal_payload_json();
        json["navigator"]["vendor"] = serde_json::json!("x");
        assert!(serde_json::from_value::<FraudCheckRequest>(json).is_err());
    }

    #[test]
    fn test_short_user_agent_fails_validation() {
        let mut json = minimal_payload_json();
        json["navigator"]["user_agent"] = serde_json::json!("short");
        let payload: FraudCheckRequest = serde_json::from_value(json).unwrap();
        let err = payload.validate().unwrap_err();
        assert_eq!(err.field, "navigator.user_agent");
    }

    #[test]
    fn test_country_iso_format_enforced() {
        let mut json = minimal_payload_json();
        json["location"] = serde_json::json!({"country_iso": "usa"});
        let payload: FraudCheckRequest = serde_json::from_value(json).unwrap();
        assert!(payload.validate().is_err());

        let mut json = minimal_payload_json();
        json["location"] = serde_json::json!({"country_iso": "US"});
        let payload: FraudCheckRequest = serde_json::from_value(json).unwrap();
        payload.validate().unwrap();
    }

    #[test]
    fn test_range_bounds() {
        let mut json = minimal_payload_json();
        json["navigator"]["hardware_concurrency"] = serde_json::json!(0);
        let payload: FraudCheckRequest = serde_json::from_value(json).unwrap();
        assert!(payload.validate().is_err());

        let mut json = minimal_payload_json();
        json["screen"]["pixel_ratio"] = serde_json::json!(11.0);
        let payload: FraudCheckRequest = serde_json::from_value(json).unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_naive_collected_at_is_utc() {
        let mut json = minimal_payload_json();
        json["collected_at"] = serde_json::json!("2026-03-01T12:00:00");
        let payload: FraudCheckRequest = serde_json::from_value(json).unwrap();
        let collected = payload.collected_at.unwrap();
        assert_eq!(collected.to_rfc3339(), "2026-03-01T12:00:00+00:00");
    }

    #[test]
    fn test_verify_request_bounds() {
        let req = CaptchaVerifyRequest {
            challenge_id: "x".repeat(16),
            captcha_token: "y".repeat(16),
        };
        req.validate().unwrap();

        let req = CaptchaVerifyRequest {
            challenge_id: "short".into(),
            captcha_token: "y".repeat(16),
        };
        assert!(req.validate().is_err());
    }
}
