use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    config::Config,
    error::WeatherError,
    model::{CitySuggestion, Coordinates, CurrentWeather, HourlyForecast, WeatherBundle},
    provider::{Location, UpstreamCall, WeatherSource, weatherapi},
};

/// Normalization client: calls the proxy and reshapes provider payloads.
///
/// The client never holds the provider credential; the proxy injects it.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    proxy_url: String,
    http: Client,
}

impl WeatherClient {
    pub fn new(proxy_url: impl Into<String>) -> Self {
        Self { proxy_url: proxy_url.into(), http: Client::new() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.proxy_url())
    }

    pub fn proxy_url(&self) -> &str {
        &self.proxy_url
    }

    /// Issue one proxy request and return the raw JSON body.
    ///
    /// Non-success statuses and non-JSON bodies become
    /// [`WeatherError::Upstream`] carrying the upstream message when there is one.
    pub async fn request(&self, call: &UpstreamCall) -> Result<Value, WeatherError> {
        let endpoint = call.endpoint();
        debug!(%endpoint, "requesting weather data");

        let res = self.http.get(&self.proxy_url).query(&call.proxy_query()).send().await?;

        let status = res.status();
        let body = res.text().await?;
        let parsed = serde_json::from_str::<Value>(&body).ok();

        if !status.is_success() {
            warn!(%endpoint, %status, body = %truncate_body(&body), "weather request failed");
            return Err(WeatherError::upstream(
                status.as_u16(),
                parsed.as_ref().and_then(error_message),
            ));
        }

        parsed.ok_or_else(|| {
            warn!(%endpoint, %status, "weather response was not valid JSON");
            WeatherError::upstream(status.as_u16(), None)
        })
    }
}

#[async_trait]
impl WeatherSource for WeatherClient {
    async fn fetch_current_weather_by_city(
        &self,
        city: &str,
    ) -> Result<CurrentWeather, WeatherError> {
        let call = UpstreamCall::Current(Location::City(city.to_string()));
        weatherapi::current_weather(self.request(&call).await?)
    }

    async fn fetch_hourly_forecast_by_city(
        &self,
        city: &str,
    ) -> Result<HourlyForecast, WeatherError> {
        let call = UpstreamCall::Forecast { location: Location::City(city.to_string()), days: 1 };
        weatherapi::hourly_forecast(self.request(&call).await?)
    }

    async fn fetch_weather_by_coords(
        &self,
        coords: Coordinates,
    ) -> Result<WeatherBundle, WeatherError> {
        let call = UpstreamCall::Forecast { location: Location::Coords(coords), days: 1 };
        weatherapi::weather_bundle(self.request(&call).await?, weatherapi::COORDS_HOURS)
    }

    async fn fetch_autocomplete_weather_by_city(
        &self,
        partial: &str,
    ) -> Result<Vec<CitySuggestion>, WeatherError> {
        let call = UpstreamCall::Search(partial.to_string());
        weatherapi::city_suggestions(self.request(&call).await?)
    }
}

/// Extract a human-readable message from an error body.
///
/// Understands the provider shape `{"error": {"message": ..}}`, the proxy
/// shape `{"error": ".."}` and a bare `{"message": ".."}`.
pub fn error_message(body: &Value) -> Option<String> {
    let text = body
        .pointer("/error/message")
        .and_then(Value::as_str)
        .or_else(|| body.get("error").and_then(Value::as_str))
        .or_else(|| body.get("message").and_then(Value::as_str))?;

    Some(text.to_string())
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::weatherapi::fixtures;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> WeatherClient {
        WeatherClient::new(format!("{}/api/weather", server.uri()))
    }

    #[tokio::test]
    async fn current_by_city_round_trip() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/weather"))
            .and(query_param("endpoint", "current"))
            .and(query_param("city", "London"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::current_payload()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let current = client.fetch_current_weather_by_city("London").await.unwrap();

        assert_eq!(current.name.as_deref(), Some("London"));
        assert_eq!(current.main.temp, Some(21.4));
        assert!(current.main.temp.unwrap().is_finite());
        assert_eq!(current.weather[0].description.as_deref(), Some("Partly cloudy"));
    }

    #[tokio::test]
    async fn hourly_by_city_keeps_all_hours() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/weather"))
            .and(query_param("endpoint", "forecast"))
            .and(query_param("city", "London"))
            .and(query_param("days", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::forecast_payload(24)))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let forecast = client.fetch_hourly_forecast_by_city("London").await.unwrap();

        assert_eq!(forecast.list.len(), 24);
        assert!(forecast.list.iter().all(|e| (0.0..=1.0).contains(&e.pop)));
    }

    #[tokio::test]
    async fn coords_use_single_forecast_call() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/weather"))
            .and(query_param("endpoint", "forecast"))
            .and(query_param("lat", "51.52"))
            .and(query_param("lon", "-0.11"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::forecast_payload(24)))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let bundle = client.fetch_weather_by_coords(Coordinates::new(51.52, -0.11)).await.unwrap();

        assert_eq!(bundle.forecast.list.len(), 8);
        assert_eq!(bundle.current.main.temp, Some(21.4));
    }

    #[tokio::test]
    async fn autocomplete_maps_search_results() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/weather"))
            .and(query_param("endpoint", "search"))
            .and(query_param("city", "Lon"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::search_payload()))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let hits = client.fetch_autocomplete_weather_by_city("Lon").await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].country.as_deref(), Some("Canada"));
    }

    #[tokio::test]
    async fn by_city_joins_both_calls() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("endpoint", "current"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::current_payload()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("endpoint", "forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::forecast_payload(24)))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let bundle = client.fetch_weather_by_city("London").await.unwrap();

        assert_eq!(bundle.current.name.as_deref(), Some("London"));
        assert_eq!(bundle.forecast.list.len(), 24);
    }

    #[tokio::test]
    async fn by_city_fails_as_a_unit() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("endpoint", "current"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::current_payload()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("endpoint", "forecast"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.fetch_weather_by_city("London").await.unwrap_err();

        assert_eq!(err.to_string(), "HTTP 502");
    }

    #[tokio::test]
    async fn upstream_message_is_surfaced() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": 1006, "message": "No matching location found." }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.fetch_current_weather_by_city("Atlantis").await.unwrap_err();

        assert_eq!(err.to_string(), "No matching location found.");
        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test]
    async fn top_level_message_backs_up_error_object() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": { "code": 2007 },
                "message": "Monthly quota exceeded."
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.fetch_current_weather_by_city("London").await.unwrap_err();

        assert_eq!(err.to_string(), "Monthly quota exceeded.");
        assert_eq!(err.status(), Some(429));
    }

    #[tokio::test]
    async fn non_json_error_body_reports_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("<html>busy</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.fetch_current_weather_by_city("London").await.unwrap_err();

        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn non_json_success_body_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.fetch_hourly_forecast_by_city("London").await.unwrap_err();

        assert_eq!(err.to_string(), "HTTP 200");
    }

    #[test]
    fn error_message_shapes() {
        assert_eq!(
            error_message(&json!({ "error": { "message": "Bad key" } })).as_deref(),
            Some("Bad key")
        );
        assert_eq!(error_message(&json!({ "error": "Missing API key" })).as_deref(), Some("Missing API key"));
        assert_eq!(error_message(&json!({ "message": "nope" })).as_deref(), Some("nope"));
        assert_eq!(
            error_message(&json!({ "error": { "code": 1 }, "message": "x" })).as_deref(),
            Some("x")
        );
        assert_eq!(error_message(&json!({ "error": { "code": 1 } })), None);
        assert_eq!(error_message(&json!({ "status": 1 })), None);
        assert_eq!(error_message(&json!([1, 2])), None);
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "é".repeat(300);
        let out = truncate_body(&long);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
