//! OpenWeatherMap air-pollution client

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use super::{Coordinates, FetchError, Reading, ReadingProvider};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// Fetches current air quality from the OpenWeatherMap API
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenWeatherProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http_client: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait::async_trait]
impl ReadingProvider for OpenWeatherProvider {
    async fn fetch_reading(&self, coords: Coordinates) -> Result<Reading, FetchError> {
        let url = format!("{}/data/2.5/air_pollution", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("lat", coords.lat.to_string()),
                ("lon", coords.lon.to_string()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: AirPollutionResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Payload(e.to_string()))?;

        payload.into_reading()
    }
}

#[derive(Debug, Deserialize)]
struct AirPollutionResponse {
    list: Vec<AirPollutionEntry>,
}

#[derive(Debug, Deserialize)]
struct AirPollutionEntry {
    main: AirQualityMain,
    #[serde(default)]
    components: BTreeMap<String, f64>,
    dt: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct AirQualityMain {
    aqi: u32,
}

impl AirPollutionResponse {
    fn into_reading(self) -> Result<Reading, FetchError> {
        let entry = self
            .list
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::Payload("empty measurement list".to_string()))?;

        let captured_at: DateTime<Utc> = entry
            .dt
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(Utc::now);

        Ok(Reading {
            pollution_index: entry.main.aqi,
            components: entry.components,
            captured_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    async fn spawn_upstream(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn provider(base_url: &str) -> OpenWeatherProvider {
        OpenWeatherProvider::new(base_url, "test-key", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_parse_payload() {
        let payload: AirPollutionResponse = serde_json::from_value(serde_json::json!({
            "coord": { "lon": 106.8456, "lat": -6.2088 },
            "list": [{
                "main": { "aqi": 4 },
                "components": { "co": 520.71, "pm2_5": 61.2, "pm10": 80.5 },
                "dt": 1700000000
            }]
        }))
        .unwrap();

        let reading = payload.into_reading().unwrap();
        assert_eq!(reading.pollution_index, 4);
        assert_eq!(reading.components.get("pm2_5"), Some(&61.2));
        assert_eq!(reading.captured_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_empty_list_is_payload_error() {
        let payload: AirPollutionResponse =
            serde_json::from_value(serde_json::json!({ "list": [] })).unwrap();
        assert!(matches!(payload.into_reading(), Err(FetchError::Payload(_))));
    }

    #[tokio::test]
    async fn test_fetch_sends_coordinates_and_key() {
        let app = Router::new().route(
            "/data/2.5/air_pollution",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("appid").map(String::as_str), Some("test-key"));
                assert_eq!(params.get("lat").map(String::as_str), Some("-6.2"));
                assert_eq!(params.get("lon").map(String::as_str), Some("106.8"));
                Json(serde_json::json!({
                    "list": [{ "main": { "aqi": 2 }, "components": { "o3": 30.0 }, "dt": 1 }]
                }))
            }),
        );
        let base = spawn_upstream(app).await;

        let reading = provider(&base)
            .fetch_reading(Coordinates::new(-6.2, 106.8))
            .await
            .unwrap();
        assert_eq!(reading.pollution_index, 2);
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let app = Router::new().route(
            "/data/2.5/air_pollution",
            get(|| async { (StatusCode::UNAUTHORIZED, "invalid api key") }),
        );
        let base = spawn_upstream(app).await;

        let err = provider(&base)
            .fetch_reading(Coordinates::new(0.0, 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_malformed_payload() {
        let app = Router::new().route(
            "/data/2.5/air_pollution",
            get(|| async { Json(serde_json::json!({ "list": [{ "main": {} }] })) }),
        );
        let base = spawn_upstream(app).await;

        let err = provider(&base)
            .fetch_reading(Coordinates::new(0.0, 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Payload(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = provider(&format!("http://{}", addr))
            .fetch_reading(Coordinates::new(0.0, 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }
}
