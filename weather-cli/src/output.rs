//! Human-readable rendering of normalized records.

use std::fmt::Write;

use chrono::DateTime;
use weather_core::{CitySuggestion, CurrentWeather, HourlyForecast, WeatherBundle};

const MISSING: &str = "n/a";

pub fn render_bundle(bundle: &WeatherBundle) -> String {
    let mut out = render_current(&bundle.current);
    out.push_str(&render_forecast(&bundle.forecast));
    out
}

pub fn render_current(current: &CurrentWeather) -> String {
    let mut out = String::new();

    let place = [current.name.as_deref(), current.country.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ");
    let _ = write!(out, "{}", if place.is_empty() { "Unknown location" } else { place.as_str() });
    if let Some(coord) = current.coord {
        let _ = write!(out, " ({:.2}, {:.2})", coord.lat, coord.lon);
    }
    out.push('\n');

    if let Some(local) = &current.timezone {
        let _ = writeln!(out, "Local time:  {local}");
    }
    if let Some(observed) = current.dt.and_then(|ts| DateTime::from_timestamp(ts, 0)) {
        let _ = writeln!(out, "Observed:    {}", observed.format("%Y-%m-%d %H:%M UTC"));
    }
    if let Some(text) = current.condition().and_then(|c| c.description.as_deref()) {
        let _ = writeln!(out, "Conditions:  {text}");
    }

    let main = &current.main;
    let _ = writeln!(
        out,
        "Temperature: {} (feels like {})",
        fmt_unit(main.temp, "°C", 1),
        fmt_unit(main.feels_like, "°C", 1)
    );
    let _ = writeln!(
        out,
        "Humidity:    {}   Pressure: {}",
        fmt_unit(main.humidity, "%", 0),
        fmt_unit(main.pressure, " hPa", 0)
    );
    let _ = writeln!(
        out,
        "Wind:        {} from {}",
        fmt_unit(current.wind.speed, " km/h", 1),
        fmt_unit(current.wind.deg, "°", 0)
    );

    out
}

pub fn render_forecast(forecast: &HourlyForecast) -> String {
    let mut out = String::new();
    let city = &forecast.city;

    if city.sunrise.is_some() || city.sunset.is_some() {
        let _ = writeln!(
            out,
            "Sunrise:     {}   Sunset: {}",
            city.sunrise.as_deref().unwrap_or(MISSING),
            city.sunset.as_deref().unwrap_or(MISSING)
        );
    }

    if forecast.list.is_empty() {
        return out;
    }

    out.push_str("\nHourly:\n");
    let offset = city.timezone_offset.unwrap_or(0);
    for entry in &forecast.list {
        let label = entry
            .hour_label(offset)
            .or_else(|| entry.dt_txt.clone())
            .unwrap_or_else(|| MISSING.to_string());
        let condition = entry
            .weather
            .first()
            .and_then(|c| c.description.as_deref())
            .unwrap_or("");
        let _ = writeln!(
            out,
            "  {label:>5}  {:>8}  rain {:>3.0}%  {condition}",
            fmt_unit(entry.main.temp, "°C", 1),
            entry.pop * 100.0
        );
    }

    out
}

pub fn render_suggestions(hits: &[CitySuggestion]) -> String {
    if hits.is_empty() {
        return "No matching cities.\n".to_string();
    }

    let mut out = String::new();
    for hit in hits {
        let _ = write!(out, "{}", hit.label());
        if let (Some(lat), Some(lon)) = (hit.lat, hit.lon) {
            let _ = write!(out, "  ({lat:.2}, {lon:.2})");
        }
        out.push('\n');
    }
    out
}

fn fmt_unit(value: Option<f64>, unit: &str, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$}{unit}"),
        None => MISSING.to_string(),
    }
}
