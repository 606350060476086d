//! ==============================================================================
//! poller.rs - sensor endpoint fetch and normalization
//! ==============================================================================
//!
//! purpose:
//!     fetches the raw sensor json of one location and maps it to a fully
//!     populated EnvironmentSnapshot.
//!
//! upstream schema (lass airbox):
//!     s_d0 -> pm2.5       s_t0 -> temperature    s_h0 -> humidity
//!     s_g1 -> co2         s_g0 -> tvoc
//!
//!     any of these may be missing, null, zero or junk. such a field counts as
//!     "not provided" and takes its default. wind, sunlight, electricity and
//!     precipitation have no upstream source and are simulated.
//!
//! relationships:
//!     - used by: runtime.rs (one call per poll cycle)
//!     - returns: error.rs PollError on transport / payload failure
//!
//! ==============================================================================

use crate::domain::{EnvironmentSnapshot, Location};
use crate::error::PollError;
use rand::Rng;
use serde_json::{Map, Value};
use std::time::Duration;

pub const DEFAULT_PM25: f64 = 0.0;
pub const DEFAULT_TEMPERATURE: f64 = 24.5;
pub const DEFAULT_HUMIDITY: f64 = 65.0;
pub const DEFAULT_CO2: f64 = 420.0;
pub const DEFAULT_TVOC: f64 = 0.15;

#[derive(Clone)]
pub struct Poller {
    client: reqwest::Client,
}

impl Poller {
    pub fn new(timeout: Duration) -> Result<Self, PollError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// one poll cycle: fetch, parse, normalize
    pub async fn refresh(&self, location: &Location) -> Result<EnvironmentSnapshot, PollError> {
        let response = self.client.get(&location.api_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PollError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let payload: Value = serde_json::from_slice(&body)?;
        let fields = payload.as_object().ok_or(PollError::NotAnObject)?;

        let snapshot = normalize(fields, &mut rand::thread_rng());
        debug_assert!(snapshot.is_finite());
        Ok(snapshot)
    }
}

/// map raw sensor fields to a snapshot, defaulting and simulating as needed
pub fn normalize<R: Rng>(fields: &Map<String, Value>, rng: &mut R) -> EnvironmentSnapshot {
    let field = |key: &str, default: f64| provided(fields.get(key)).unwrap_or(default);

    EnvironmentSnapshot {
        pm25: field("s_d0", DEFAULT_PM25),
        temperature: field("s_t0", DEFAULT_TEMPERATURE),
        humidity: field("s_h0", DEFAULT_HUMIDITY),
        co2: field("s_g1", DEFAULT_CO2),
        tvoc: field("s_g0", DEFAULT_TVOC),
        windspeed: rng.gen_range(0.0..5.0),
        sunlight: rng.gen_range(450.0..550.0),
        electricity: rng.gen_range(12.4..13.4),
        precipitation: rng.gen_range(0..30),
    }
}

/// Some(v) for a finite, non-zero number (or numeric string); None otherwise
fn provided(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    (number.is_finite() && number != 0.0).then_some(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fields(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn assert_simulated_ranges(s: &EnvironmentSnapshot) {
        assert!((0.0..5.0).contains(&s.windspeed), "windspeed {}", s.windspeed);
        assert!((450.0..550.0).contains(&s.sunlight), "sunlight {}", s.sunlight);
        assert!((12.4..13.4).contains(&s.electricity), "electricity {}", s.electricity);
        assert!(s.precipitation < 30, "precipitation {}", s.precipitation);
    }

    #[test]
    fn full_payload_passes_through() {
        let mut rng = StdRng::seed_from_u64(7);
        let s = normalize(
            &fields(json!({"s_d0": 12, "s_t0": 26.3, "s_h0": 70, "s_g1": 410, "s_g0": 0.2})),
            &mut rng,
        );

        assert_eq!(s.pm25, 12.0);
        assert_eq!(s.temperature, 26.3);
        assert_eq!(s.humidity, 70.0);
        assert_eq!(s.co2, 410.0);
        assert_eq!(s.tvoc, 0.2);
        assert_simulated_ranges(&s);
    }

    #[test]
    fn empty_payload_uses_defaults() {
        let mut rng = StdRng::seed_from_u64(7);
        let s = normalize(&Map::new(), &mut rng);

        assert_eq!(s.pm25, 0.0);
        assert_eq!(s.temperature, 24.5);
        assert_eq!(s.humidity, 65.0);
        assert_eq!(s.co2, 420.0);
        assert_eq!(s.tvoc, 0.15);
        assert!(s.is_finite());
    }

    #[test]
    fn falsy_and_junk_fields_are_not_provided() {
        let mut rng = StdRng::seed_from_u64(1);
        let s = normalize(
            &fields(json!({
                "s_d0": null,
                "s_t0": 0,
                "s_h0": "",
                "s_g1": false,
                "s_g0": "n/a",
            })),
            &mut rng,
        );

        assert_eq!(s.pm25, DEFAULT_PM25);
        assert_eq!(s.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(s.humidity, DEFAULT_HUMIDITY);
        assert_eq!(s.co2, DEFAULT_CO2);
        assert_eq!(s.tvoc, DEFAULT_TVOC);
    }

    #[test]
    fn partial_payload_mixes_values_and_defaults() {
        let mut rng = StdRng::seed_from_u64(3);
        let s = normalize(&fields(json!({"s_t0": "18.5", "s_g1": 655, "extra": [1, 2]})), &mut rng);

        assert_eq!(s.temperature, 18.5);
        assert_eq!(s.co2, 655.0);
        assert_eq!(s.pm25, DEFAULT_PM25);
        assert_eq!(s.humidity, DEFAULT_HUMIDITY);
        assert_eq!(s.tvoc, DEFAULT_TVOC);
    }

    #[test]
    fn simulated_fields_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let empty = Map::new();
        for _ in 0..2000 {
            let s = normalize(&empty, &mut rng);
            assert_simulated_ranges(&s);
            assert!(s.is_finite());
        }
    }

    fn location(url: String) -> Location {
        Location { id: "T".into(), name: "測試站".into(), api_url: url }
    }

    #[tokio::test]
    async fn refresh_reads_sensor_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/last"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"s_d0": 9, "s_h0": 80})))
            .expect(1)
            .mount(&server)
            .await;

        let poller = Poller::new(Duration::from_secs(5)).unwrap();
        let s = poller.refresh(&location(format!("{}/last", server.uri()))).await.unwrap();

        assert_eq!(s.pm25, 9.0);
        assert_eq!(s.humidity, 80.0);
        assert_eq!(s.temperature, DEFAULT_TEMPERATURE);
        assert_simulated_ranges(&s);
    }

    #[tokio::test]
    async fn refresh_reports_bad_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let poller = Poller::new(Duration::from_secs(5)).unwrap();
        let err = poller.refresh(&location(server.uri())).await.unwrap_err();
        assert!(matches!(err, PollError::Status(503)));
    }

    #[tokio::test]
    async fn error_status_with_object_body_is_not_published() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"s_d0": 99, "error": "upstream"})))
            .mount(&server)
            .await;

        let poller = Poller::new(Duration::from_secs(5)).unwrap();
        let err = poller.refresh(&location(server.uri())).await.unwrap_err();
        assert!(matches!(err, PollError::Status(500)));
    }

    #[tokio::test]
    async fn refresh_reports_malformed_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/array"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2, 3])))
            .mount(&server)
            .await;

        let poller = Poller::new(Duration::from_secs(5)).unwrap();
        let html = poller.refresh(&location(format!("{}/html", server.uri()))).await;
        assert!(matches!(html, Err(PollError::Json(_))));

        let array = poller.refresh(&location(format!("{}/array", server.uri()))).await;
        assert!(matches!(array, Err(PollError::NotAnObject)));
    }

    #[tokio::test]
    async fn refresh_reports_transport_failure() {
        let poller = Poller::new(Duration::from_secs(1)).unwrap();
        let err = poller.refresh(&location("http://127.0.0.1:9/unreachable".into())).await.unwrap_err();
        assert!(matches!(err, PollError::Http(_)));
    }
}
