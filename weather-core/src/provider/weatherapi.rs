//! WeatherAPI.com payload shapes and their mapping onto the internal records.
//!
//! Every numeric field comes from exactly one path in the payload. When that
//! path is absent the field stays `None`.

use chrono::{DateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::WeatherError,
    model::{
        CitySuggestion, Condition, Coordinates, CurrentWeather, ForecastCity, ForecastEntry,
        HourlyForecast, Readings, WeatherBundle, Wind,
    },
};

/// Hours kept for coordinate lookups.
pub const COORDS_HOURS: usize = 8;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaLocation {
    name: Option<String>,
    country: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    tz_id: Option<String>,
    localtime_epoch: Option<i64>,
    localtime: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaCondition {
    text: Option<String>,
    icon: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaCurrent {
    last_updated_epoch: Option<i64>,
    temp_c: Option<f64>,
    feelslike_c: Option<f64>,
    pressure_mb: Option<f64>,
    humidity: Option<f64>,
    wind_kph: Option<f64>,
    wind_degree: Option<f64>,
    condition: Option<WaCondition>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaHour {
    time_epoch: Option<i64>,
    time: Option<String>,
    temp_c: Option<f64>,
    feelslike_c: Option<f64>,
    pressure_mb: Option<f64>,
    humidity: Option<f64>,
    wind_kph: Option<f64>,
    wind_degree: Option<f64>,
    chance_of_rain: Option<f64>,
    condition: Option<WaCondition>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaAstro {
    sunrise: Option<String>,
    sunset: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaForecastDay {
    astro: WaAstro,
    hour: Vec<WaHour>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaForecast {
    forecastday: Vec<WaForecastDay>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaCurrentResponse {
    location: WaLocation,
    current: WaCurrent,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaForecastResponse {
    location: WaLocation,
    current: WaCurrent,
    forecast: WaForecast,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaSearchHit {
    id: Option<i64>,
    name: Option<String>,
    region: Option<String>,
    country: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    url: Option<String>,
}

/// Map a `current.json` payload.
pub fn current_weather(payload: Value) -> Result<CurrentWeather, WeatherError> {
    let parsed: WaCurrentResponse = decode(payload, "current weather")?;
    Ok(map_current(&parsed.location, parsed.current))
}

/// Map a `forecast.json` payload, keeping every hour of the first day.
pub fn hourly_forecast(payload: Value) -> Result<HourlyForecast, WeatherError> {
    let parsed: WaForecastResponse = decode(payload, "forecast")?;
    map_forecast(&parsed.location, parsed.forecast, None)
}

/// Map a combined `forecast.json` payload into current conditions plus the
/// first `hours` hourly samples.
pub fn weather_bundle(payload: Value, hours: usize) -> Result<WeatherBundle, WeatherError> {
    let parsed: WaForecastResponse = decode(payload, "forecast")?;
    let forecast = map_forecast(&parsed.location, parsed.forecast, Some(hours))?;
    let current = map_current(&parsed.location, parsed.current);
    Ok(WeatherBundle { current, forecast })
}

/// Map a `search.json` result array.
pub fn city_suggestions(payload: Value) -> Result<Vec<CitySuggestion>, WeatherError> {
    let hits: Vec<WaSearchHit> = decode(payload, "search results")?;
    Ok(hits
        .into_iter()
        .map(|h| CitySuggestion {
            id: h.id,
            name: h.name,
            region: h.region,
            country: h.country,
            lat: h.lat,
            lon: h.lon,
            url: h.url,
        })
        .collect())
}

/// Scheme-relative icon paths (`//cdn...`) become `https://cdn...`.
pub fn upgrade_icon_url(icon: &str) -> String {
    if icon.starts_with("//") {
        format!("https:{icon}")
    } else {
        icon.to_string()
    }
}

/// UTC offset of an IANA zone at `at`, in seconds.
pub fn timezone_offset_seconds(tz_id: &str, at: DateTime<Utc>) -> Option<i32> {
    let tz: Tz = tz_id.parse().ok()?;
    Some(tz.offset_from_utc_datetime(&at.naive_utc()).fix().local_minus_utc())
}

fn decode<T: serde::de::DeserializeOwned>(
    payload: Value,
    what: &'static str,
) -> Result<T, WeatherError> {
    serde_json::from_value(payload).map_err(|source| WeatherError::Decode { what, source })
}

fn map_condition(condition: Option<WaCondition>) -> Vec<Condition> {
    condition
        .map(|c| Condition {
            main: c.text.clone(),
            description: c.text,
            icon: c.icon.as_deref().map(upgrade_icon_url),
        })
        .into_iter()
        .collect()
}

fn map_current(location: &WaLocation, current: WaCurrent) -> CurrentWeather {
    CurrentWeather {
        name: location.name.clone(),
        country: location.country.clone(),
        coord: Coordinates::from_parts(location.lat, location.lon),
        main: Readings {
            temp: current.temp_c,
            feels_like: current.feelslike_c,
            temp_min: current.temp_c,
            temp_max: current.temp_c,
            pressure: current.pressure_mb,
            humidity: current.humidity,
        },
        wind: Wind {
            speed: current.wind_kph,
            deg: current.wind_degree,
        },
        weather: map_condition(current.condition),
        dt: current.last_updated_epoch,
        timezone: location.localtime.clone(),
    }
}

fn map_hour(hour: WaHour) -> ForecastEntry {
    ForecastEntry {
        dt: hour.time_epoch,
        main: Readings {
            temp: hour.temp_c,
            feels_like: hour.feelslike_c,
            temp_min: hour.temp_c,
            temp_max: hour.temp_c,
            pressure: hour.pressure_mb,
            humidity: hour.humidity,
        },
        wind: Wind {
            speed: hour.wind_kph,
            deg: hour.wind_degree,
        },
        weather: map_condition(hour.condition),
        pop: hour
            .chance_of_rain
            .map(|p| (p / 100.0).clamp(0.0, 1.0))
            .filter(|p| p.is_finite())
            .unwrap_or(0.0),
        dt_txt: hour.time,
    }
}

fn map_forecast(
    location: &WaLocation,
    forecast: WaForecast,
    limit: Option<usize>,
) -> Result<HourlyForecast, WeatherError> {
    let day = forecast
        .forecastday
        .into_iter()
        .next()
        .ok_or(WeatherError::MissingData("forecastday"))?;

    let hours = day.hour.into_iter().take(limit.unwrap_or(usize::MAX));
    let list: Vec<ForecastEntry> = hours.map(map_hour).collect();

    let at = location
        .localtime_epoch
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .unwrap_or_else(Utc::now);
    let timezone_offset = location
        .tz_id
        .as_deref()
        .and_then(|tz| timezone_offset_seconds(tz, at));

    if timezone_offset.is_none() {
        tracing::debug!(tz_id = ?location.tz_id, "could not derive timezone offset");
    }

    Ok(HourlyForecast {
        list,
        city: ForecastCity {
            name: location.name.clone(),
            coord: Coordinates::from_parts(location.lat, location.lon),
            country: location.country.clone(),
            timezone: location.localtime.clone(),
            tz_id: location.tz_id.clone(),
            timezone_offset,
            sunrise: day.astro.sunrise,
            sunset: day.astro.sunset,
        },
    })
}
