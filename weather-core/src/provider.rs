use crate::{
    error::WeatherError,
    model::{CitySuggestion, Coordinates, CurrentWeather, HourlyForecast, WeatherBundle},
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug};

pub mod weatherapi;

/// Upstream call kinds, one per provider endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Current,
    Forecast,
    Search,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Current => "current",
            Endpoint::Forecast => "forecast",
            Endpoint::Search => "search",
        }
    }

    /// Provider path, e.g. `/v1/forecast.json`.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Current => "/v1/current.json",
            Endpoint::Forecast => "/v1/forecast.json",
            Endpoint::Search => "/v1/search.json",
        }
    }

    pub const fn all() -> &'static [Endpoint] {
        &[Endpoint::Current, Endpoint::Forecast, Endpoint::Search]
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Endpoint {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "current" => Ok(Endpoint::Current),
            "forecast" => Ok(Endpoint::Forecast),
            "search" => Ok(Endpoint::Search),
            _ => Err(anyhow::anyhow!(
                "Invalid endpoint '{value}'. Expected one of: current, forecast, search."
            )),
        }
    }
}

/// Where a lookup is aimed.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    City(String),
    Coords(Coordinates),
}

impl Location {
    fn push_query(&self, params: &mut Vec<(&'static str, String)>) {
        match self {
            Location::City(city) => params.push(("city", city.clone())),
            Location::Coords(c) => {
                params.push(("lat", c.lat.to_string()));
                params.push(("lon", c.lon.to_string()));
            }
        }
    }
}

/// A single proxy request, parameterized by call kind.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamCall {
    Current(Location),
    Forecast { location: Location, days: u8 },
    Search(String),
}

impl UpstreamCall {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            UpstreamCall::Current(_) => Endpoint::Current,
            UpstreamCall::Forecast { .. } => Endpoint::Forecast,
            UpstreamCall::Search(_) => Endpoint::Search,
        }
    }

    /// Query string pairs for `GET /api/weather`.
    pub fn proxy_query(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("endpoint", self.endpoint().as_str().to_string())];

        match self {
            UpstreamCall::Current(location) => location.push_query(&mut params),
            UpstreamCall::Forecast { location, days } => {
                location.push_query(&mut params);
                params.push(("days", days.to_string()));
                params.push(("aqi", "no".to_string()));
                params.push(("alerts", "no".to_string()));
            }
            UpstreamCall::Search(partial) => params.push(("city", partial.clone())),
        }

        params
    }
}

/// The four lookups the dashboard needs, whatever transport backs them.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn fetch_current_weather_by_city(&self, city: &str)
    -> Result<CurrentWeather, WeatherError>;

    async fn fetch_hourly_forecast_by_city(
        &self,
        city: &str,
    ) -> Result<HourlyForecast, WeatherError>;

    async fn fetch_weather_by_coords(
        &self,
        coords: Coordinates,
    ) -> Result<WeatherBundle, WeatherError>;

    async fn fetch_autocomplete_weather_by_city(
        &self,
        partial: &str,
    ) -> Result<Vec<CitySuggestion>, WeatherError>;

    /// Current and hourly issued together; fails if either fails.
    async fn fetch_weather_by_city(&self, city: &str) -> Result<WeatherBundle, WeatherError> {
        let (current, forecast) = tokio::try_join!(
            self.fetch_current_weather_by_city(city),
            self.fetch_hourly_forecast_by_city(city),
        )?;
        Ok(WeatherBundle { current, forecast })
    }
}
