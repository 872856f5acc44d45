//! Weather lookup against OpenWeatherMap
//!
//! One outbound GET per call, bounded by a short timeout. No retries here;
//! the model layer decides whether to ask again.

use crate::config::is_usable_key;
use crate::error::ServiceError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Upper bound on a single weather request
pub const WEATHER_TIMEOUT: Duration = Duration::from_secs(5);

/// Current conditions for one city
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    /// Natural-language summary
    pub report: String,
    /// Signed UTC offset in seconds
    pub timezone_offset: i64,
    /// Provider-normalized city name
    pub city_name: String,
    #[serde(skip)]
    pub description: String,
    #[serde(skip)]
    pub temperature: f64,
    #[serde(skip)]
    pub feels_like: f64,
    #[serde(skip)]
    pub humidity: f64,
    #[serde(skip)]
    pub country: String,
}

/// Anything that can report the weather for a city
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch_weather(&self, city: &str) -> Result<WeatherReport, ServiceError>;
}

/// OpenWeatherMap current-weather client
pub struct OpenWeatherClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenWeatherClient {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        Self::with_timeout(api_key, base_url, WEATHER_TIMEOUT)
    }

    pub fn with_timeout(
        api_key: Option<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.filter(|k| is_usable_key(k)),
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn fetch_weather(&self, city: &str) -> Result<WeatherReport, ServiceError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ServiceError::config("Weather API Key is not configured."));
        };

        let start = std::time::Instant::now();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", city), ("appid", api_key), ("units", "metric")])
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(city = %city, error = %e, timeout = e.is_timeout(), "Weather request failed");
                ServiceError::network(format!("Network error: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::info!(city = %city, status = %status, "Weather provider rejected request");
            return Err(ServiceError::provider(format!(
                "City '{city}' not found or API error."
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::network(format!("Network error: {e}")))?;
        let data: Value = serde_json::from_str(&body)
            .map_err(|e| ServiceError::parse(format!("An unexpected error occurred: {e}")))?;

        let report = parse_weather(city, &data)?;
        tracing::info!(
            city = %city,
            resolved = %report.city_name,
            offset_secs = report.timezone_offset,
            duration_ms = %start.elapsed().as_millis(),
            "Weather lookup completed"
        );
        Ok(report)
    }
}

/// Whether the body's `cod` field reports success (number or numeric string)
fn reports_success(data: &Value) -> bool {
    match data.get("cod") {
        None => true,
        Some(Value::Number(n)) => n.as_i64() == Some(200),
        Some(Value::String(s)) => s.trim() == "200",
        Some(_) => false,
    }
}

/// Build a [`WeatherReport`] from an OpenWeatherMap response body
pub fn parse_weather(city: &str, data: &Value) -> Result<WeatherReport, ServiceError> {
    if !reports_success(data) {
        let message = data
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("City not found");
        return Err(ServiceError::provider(message));
    }

    let missing = |field: &str| ServiceError::parse(format!("An unexpected error occurred: missing field '{field}'"));

    let description = data["weather"][0]["description"]
        .as_str()
        .ok_or_else(|| missing("weather[0].description"))?
        .to_string();
    // Readings keep the provider's own number formatting in the report
    let reading = |field: &str| match &data["main"][field] {
        Value::Number(n) => n
            .as_f64()
            .map(|v| (v, n.to_string()))
            .ok_or_else(|| missing(&format!("main.{field}"))),
        _ => Err(missing(&format!("main.{field}"))),
    };
    let (temperature, temperature_text) = reading("temp")?;
    let (feels_like, feels_like_text) = reading("feels_like")?;
    let (humidity, humidity_text) = reading("humidity")?;
    let country = data["sys"]["country"]
        .as_str()
        .ok_or_else(|| missing("sys.country"))?
        .to_string();

    let timezone_offset = match data.get("timezone") {
        None | Some(Value::Null) => 0,
        Some(v) => v
            .as_i64()
            .ok_or_else(|| ServiceError::parse("An unexpected error occurred: non-integer timezone"))?,
    };
    let city_name = data
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .unwrap_or(city)
        .to_string();

    let report = format!(
        "The weather in {city}, {country} is currently {description}. \
         The temperature is {temperature_text}°C, but feels like {feels_like_text}°C. \
         The humidity is {humidity_text}%."
    );

    Ok(WeatherReport {
        report,
        timezone_offset,
        city_name,
        description,
        temperature,
        feels_like,
        humidity,
        country,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{spawn_silent_server, spawn_stub};
    use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    fn london_body() -> Value {
        json!({
            "cod": 200,
            "name": "London",
            "timezone": 3600,
            "weather": [{"description": "light rain"}],
            "main": {"temp": 14.5, "feels_like": 13.0, "humidity": 81},
            "sys": {"country": "GB"}
        })
    }

    #[test]
    fn test_parse_success() {
        let report = parse_weather("london", &london_body()).unwrap();
        assert_eq!(report.city_name, "London");
        assert_eq!(report.timezone_offset, 3600);
        assert_eq!(report.country, "GB");
        assert_eq!(
            report.report,
            "The weather in london, GB is currently light rain. \
             The temperature is 14.5°C, but feels like 13.0°C. The humidity is 81%."
        );
    }

    #[test]
    fn test_report_keeps_integer_readings() {
        let mut body = london_body();
        body["main"] = json!({"temp": 21, "feels_like": 20.0, "humidity": 40});
        let report = parse_weather("Lima", &body).unwrap();
        assert!(report.report.contains("The temperature is 21°C, but feels like 20.0°C."));
    }

    #[test]
    fn test_parse_missing_timezone_defaults_to_zero() {
        let mut body = london_body();
        body.as_object_mut().unwrap().remove("timezone");
        body.as_object_mut().unwrap().remove("name");
        let report = parse_weather("Reykjavik", &body).unwrap();
        assert_eq!(report.timezone_offset, 0);
        assert_eq!(report.city_name, "Reykjavik");
    }

    #[test]
    fn test_parse_provider_code() {
        let body = json!({"cod": "404", "message": "city not found"});
        let err = parse_weather("Atlantis", &body).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Provider);
        assert_eq!(err.message, "city not found");

        let body = json!({"cod": 401});
        let err = parse_weather("Atlantis", &body).unwrap_err();
        assert_eq!(err.message, "City not found");
    }

    #[test]
    fn test_parse_missing_fields() {
        let body = json!({"cod": 200, "weather": [], "main": {}});
        let err = parse_weather("Paris", &body).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse);
        assert!(err.message.starts_with("An unexpected error occurred"));
    }

    #[tokio::test]
    async fn test_missing_key_is_config_error() {
        let client = OpenWeatherClient::new(Some("YOUR_API_KEY_HERE".to_string()), "http://127.0.0.1:9").unwrap();
        let err = client.fetch_weather("Paris").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Config);
        assert_eq!(err.message, "Weather API Key is not configured.");
    }

    #[tokio::test]
    async fn test_fetch_sends_expected_query() {
        let router = Router::new().route(
            "/weather",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("q").map(String::as_str), Some("London"));
                assert_eq!(params.get("appid").map(String::as_str), Some("test-key"));
                assert_eq!(params.get("units").map(String::as_str), Some("metric"));
                Json(london_body())
            }),
        );
        let base = spawn_stub(router).await;

        let client = OpenWeatherClient::new(Some("test-key".to_string()), format!("{base}/weather")).unwrap();
        let report = client.fetch_weather("London").await.unwrap();
        assert_eq!(report.city_name, "London");
        assert_eq!(report.timezone_offset, 3600);
    }

    #[tokio::test]
    async fn test_http_error_names_city() {
        let router = Router::new().route(
            "/weather",
            get(|| async { (StatusCode::NOT_FOUND, Json(json!({"cod": "404", "message": "city not found"}))) }),
        );
        let base = spawn_stub(router).await;

        let client = OpenWeatherClient::new(Some("test-key".to_string()), format!("{base}/weather")).unwrap();
        let err = client.fetch_weather("Atlantis").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Provider);
        assert_eq!(err.message, "City 'Atlantis' not found or API error.");
    }

    #[tokio::test]
    async fn test_timeout_is_network_error() {
        let base = spawn_silent_server().await;

        let client = OpenWeatherClient::with_timeout(
            Some("test-key".to_string()),
            format!("{base}/weather"),
            Duration::from_millis(200),
        )
        .unwrap();
        let err = client.fetch_weather("Paris").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Network);
        assert!(err.message.starts_with("Network error"), "got: {}", err.message);
    }
}
