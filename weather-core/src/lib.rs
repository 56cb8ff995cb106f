//! Core library for the `weather` proxy and CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The proxy endpoint that holds the provider credential
//! - Normalization of provider payloads into stable records
//! - A framework-free dashboard state container and debounced autocomplete
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod autocomplete;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod model;
pub mod provider;
pub mod proxy;

pub use client::WeatherClient;
pub use config::Config;
pub use error::WeatherError;
pub use model::{
    CitySuggestion, Condition, Coordinates, CurrentWeather, ForecastCity, ForecastEntry,
    HourlyForecast, Readings, WeatherBundle, Wind,
};
pub use provider::{Endpoint, Location, UpstreamCall, WeatherSource};
