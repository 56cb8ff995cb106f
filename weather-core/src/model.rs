use chrono::{DateTime, FixedOffset, Timelike};
use serde::{Deserialize, Serialize};

/// A point on the globe, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Both present, or nothing.
    pub fn from_parts(lat: Option<f64>, lon: Option<f64>) -> Option<Self> {
        Some(Self { lat: lat?, lon: lon? })
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

/// Primary weather condition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub main: Option<String>,
    pub description: Option<String>,
    /// Always an absolute `https:` URL when present.
    pub icon: Option<String>,
}

/// Temperatures in °C, pressure in hPa, humidity in percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Readings {
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub temp_min: Option<f64>,
    pub temp_max: Option<f64>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
}

/// Wind speed in km/h, direction in degrees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: Option<f64>,
    pub deg: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub name: Option<String>,
    pub country: Option<String>,
    pub coord: Option<Coordinates>,
    pub main: Readings,
    pub wind: Wind,
    pub weather: Vec<Condition>,
    /// Observation time, epoch seconds.
    pub dt: Option<i64>,
    /// Local time at the location as reported by the provider.
    pub timezone: Option<String>,
}

impl CurrentWeather {
    pub fn condition(&self) -> Option<&Condition> {
        self.weather.first()
    }
}

/// One hourly forecast sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub dt: Option<i64>,
    pub main: Readings,
    pub wind: Wind,
    pub weather: Vec<Condition>,
    /// Probability of precipitation in `[0, 1]`.
    pub pop: f64,
    pub dt_txt: Option<String>,
}

impl ForecastEntry {
    /// Local hour such as `"3 PM"`, shifted by `offset_seconds`.
    pub fn hour_label(&self, offset_seconds: i32) -> Option<String> {
        let offset = FixedOffset::east_opt(offset_seconds)?;
        let local = DateTime::from_timestamp(self.dt?, 0)?.with_timezone(&offset);
        let (pm, hour) = local.hour12();
        Some(format!("{hour} {}", if pm { "PM" } else { "AM" }))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastCity {
    pub name: Option<String>,
    pub coord: Option<Coordinates>,
    pub country: Option<String>,
    /// Local time at the location as reported by the provider.
    pub timezone: Option<String>,
    /// IANA zone identifier, e.g. `Europe/London`.
    pub tz_id: Option<String>,
    /// UTC offset in seconds, derived from `tz_id`.
    pub timezone_offset: Option<i32>,
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecast {
    pub list: Vec<ForecastEntry>,
    pub city: ForecastCity,
}

/// Lightweight search hit used for autocomplete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitySuggestion {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub url: Option<String>,
}

impl CitySuggestion {
    /// `"Paris, Ile-de-France, France"`, skipping missing or empty parts.
    pub fn label(&self) -> String {
        [&self.name, &self.region, &self.country]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Current conditions and hourly series, always replaced together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherBundle {
    pub current: CurrentWeather,
    pub forecast: HourlyForecast,
}
