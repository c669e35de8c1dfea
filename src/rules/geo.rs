use crate::clients::IpGeoResult;
use crate::models::payload::FraudCheckRequest;
use crate::models::signal::FraudSignal;

const EARTH_RADIUS_KM: f64 = 6371.0;

// Browser geolocation coarser than this is not worth cross-checking.
const MAX_USEFUL_ACCURACY_METERS: f64 = 50_000.0;
const MISMATCH_DISTANCE_KM: f64 = 800.0;

/// Great-circle distance between two coordinates using the Haversine formula.
pub fn haversine_distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Cross-checks the payload's claimed location against IP geolocation.
/// Runs only when the resolver produced a result; a disabled or failed
/// lookup yields no signals at all.
pub struct GeoRules;

impl GeoRules {
    pub fn collect(
        &self,
        payload: &FraudCheckRequest,
        ip_geo: Option<&IpGeoResult>,
    ) -> Vec<FraudSignal> {
        let Some(ip_geo) = ip_geo else {
            return Vec::new();
        };

        let mut signals = Vec::new();

        if ip_geo.is_hosting {
            signals.push(FraudSignal::new(
                "HOSTING_PROVIDER_IP",
                20,
                "IP appears to belong to a hosting/data-center provider.",
            ));
        }

        let Some(location) = &payload.location else {
            return signals;
        };

        if let (Some(claimed), Some(resolved)) =
            (location.country_iso.as_deref(), ip_geo.country_iso.as_deref())
        {
            if !claimed.eq_ignore_ascii_case(resolved) {
                signals.push(FraudSignal::new(
                    "IP_COUNTRY_MISMATCH",
                    35,
                    "Location country does not match IP geolocation country.",
                ));
            }
        }

        if let (Some(claimed), Some(resolved)) =
            (location.timezone.as_deref(), ip_geo.timezone.as_deref())
        {
            if claimed != resolved {
                signals.push(FraudSignal::new(
                    "IP_TIMEZONE_MISMATCH",
                    15,
                    "Reported timezone does not match IP geolocation timezone.",
                ));
            }
        }

        if let (Some(claimed), Some(resolved)) =
            (location.utc_offset_minutes, ip_geo.utc_offset_minutes)
        {
            if (claimed - resolved).abs() > 60 {
                signals.push(FraudSignal::new(
                    "IP_UTC_OFFSET_MISMATCH",
                    18,
                    "Reported UTC offset does not match IP geolocation UTC offset.",
                ));
            }
        }

        if let (Some(lat), Some(lon), Some(accuracy), Some(geo_lat), Some(geo_lon)) = (
            location.latitude,
            location.longitude,
            location.accuracy_meters,
            ip_geo.latitude,
            ip_geo.longitude,
        ) {
            if accuracy <= MAX_USEFUL_ACCURACY_METERS {
                let distance_km = haversine_distance_km(lat, lon, geo_lat, geo_lon);
                if distance_km >= MISMATCH_DISTANCE_KM {
                    signals.push(FraudSignal::new(
                        "GEOLOCATION_DISTANCE_MISMATCH",
                        25,
                        "Browser geolocation is too far from IP geolocation for the reported accuracy.",
                    ));
                }
            }
        }

        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::tests_support::payload_with_ua;

    fn geo(json: serde_json::Value) -> IpGeoResult {
        serde_json::from_value(json).unwrap()
    }

    fn codes(payload: &FraudCheckRequest, ip_geo: Option<&IpGeoResult>) -> Vec<String> {
        GeoRules
            .collect(payload, ip_geo)
            .into_iter()
            .map(|s| s.code)
            .collect()
    }

    #[test]
    fn test_haversine_identity_and_antipode() {
        assert!(haversine_distance_km(52.52, 13.405, 52.52, 13.405) < 1e-9);
        let antipodal = haversine_distance_km(0.0, 0.0, 0.0, 180.0);
        assert!((antipodal - std::f64::consts::PI * 6371.0).abs() < 1.0);
    }

    #[test]
    fn test_no_result_no_signals() {
        let payload = payload_with_ua("Mozilla/5.0 test agent");
        assert!(codes(&payload, None).is_empty());
    }

    #[test]
    fn test_hosting_provider_flagged_without_location() {
        let payload = payload_with_ua("Mozilla/5.0 test agent");
        let result = geo(serde_json::json!({
            "country_iso": "US", "is_hosting": true,
            "timezone": null, "utc_offset_minutes": null,
            "latitude": null, "longitude": null
        }));
        assert_eq!(codes(&payload, Some(&result)), vec!["HOSTING_PROVIDER_IP"]);
    }

    #[test]
    fn test_country_mismatch() {
        let mut payload = payload_with_ua("Mozilla/5.0 test agent");
        payload.location = serde_json::from_value(serde_json::json!({"country_iso": "DE"}))
            .map(Some)
            .unwrap();
        let result = geo(serde_json::json!({
            "country_iso": "US", "is_hosting": false,
            "timezone": null, "utc_offset_minutes": null,
            "latitude": null, "longitude": null
        }));
        assert_eq!(codes(&payload, Some(&result)), vec!["IP_COUNTRY_MISMATCH"]);
    }

    #[test]
    fn test_offset_tolerance() {
        let mut payload = payload_with_ua("Mozilla/5.0 test agent");
        payload.location =
            serde_json::from_value(serde_json::json!({"utc_offset_minutes": 120}))
                .map(Some)
                .unwrap();
        let result = geo(serde_json::json!({
            "country_iso": null, "is_hosting": false,
            "timezone": null, "utc_offset_minutes": 60,
            "latitude": null, "longitude": null
        }));
        // 60 minutes apart is within tolerance
        assert!(codes(&payload, Some(&result)).is_empty());

        let result = geo(serde_json::json!({
            "country_iso": null, "is_hosting": false,
            "timezone": null, "utc_offset_minutes": -1,
            "latitude": null, "longitude": null
        }));
        assert_eq!(codes(&payload, Some(&result)), vec!["IP_UTC_OFFSET_MISMATCH"]);
    }

    #[test]
    fn test_distance_mismatch_needs_accurate_fix() {
        // Berlin vs New York is far beyond 800 km.
        let mut payload = payload_with_ua("Mozilla/5.0 test agent");
        payload.location = serde_json::from_value(serde_json::json!({
            "latitude": 52.52, "longitude": 13.405, "accuracy_meters": 100.0
        }))
        .map(Some)
        .unwrap();
        let result = geo(serde_json::json!({
            "country_iso": null, "is_hosting": false,
            "timezone": null, "utc_offset_minutes": null,
            "latitude": 40.71, "longitude": -74.0
        }));
        assert_eq!(
            codes(&payload, Some(&result)),
            vec!["GEOLOCATION_DISTANCE_MISMATCH"]
        );

        // A coarse fix is not cross-checked.
        payload.location.as_mut().unwrap().accuracy_meters = Some(50_001.0);
        assert!(codes(&payload, Some(&result)).is_empty());
    }
}
