//! Proxy endpoint: injects the server-held credential and forwards the
//! query to the provider, passing its status and body back.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info, warn};

use crate::{config::Config, provider::Endpoint};

pub const ROUTE: &str = "/api/weather";

type ProxyResponse = (StatusCode, Json<Value>);

#[derive(Debug, Clone)]
pub struct ProxyState {
    api_key: Option<String>,
    base_url: String,
    http: Client,
}

impl ProxyState {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.api_key().map(str::to_owned), config.upstream_base_url())
    }

    async fn forward(&self, api_key: &str, request: &UpstreamRequest) -> ProxyResponse {
        let path = request.endpoint.path();
        let url = format!("{}{}", self.base_url, path);
        debug!(endpoint = %request.endpoint, q = %request.q, "forwarding to provider");

        let res = match self.http.get(&url).query(&request.query_pairs(api_key)).send().await {
            Ok(res) => res,
            Err(err) => {
                error!(endpoint = %request.endpoint, error = %err, "provider call failed");
                return internal_error();
            }
        };

        let status = res.status();
        let body = match res.text().await {
            Ok(body) => body,
            Err(err) => {
                error!(endpoint = %request.endpoint, error = %err, "failed to read provider body");
                return internal_error();
            }
        };

        let parsed = serde_json::from_str::<Value>(&body);

        if !status.is_success() {
            warn!(endpoint = %request.endpoint, %status, "provider returned an error");
            let status = StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
            let body = parsed.unwrap_or_else(|_| json!({ "error": body }));
            return (status, Json(body));
        }

        match parsed {
            Ok(value) => (StatusCode::OK, Json(value)),
            Err(err) => {
                error!(endpoint = %request.endpoint, error = %err, "provider body was not JSON");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": format!("Invalid response from WeatherAPI for {path}: Not valid JSON"),
                        "details": err.to_string(),
                    })),
                )
            }
        }
    }
}

/// Query string accepted by `GET /api/weather`.
///
/// Both the legacy `?q=<city>` form and the selector form
/// `?endpoint=forecast&city=..` / `&lat=..&lon=..` are understood.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxyQuery {
    pub endpoint: Option<String>,
    pub q: Option<String>,
    pub city: Option<String>,
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub days: Option<String>,
    pub aqi: Option<String>,
    pub alerts: Option<String>,
}

/// A provider call resolved from a [`ProxyQuery`].
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub endpoint: Endpoint,
    pub q: String,
    pub days: String,
    pub aqi: String,
    pub alerts: String,
}

impl UpstreamRequest {
    /// Resolve the endpoint and location; the error is a client-facing message.
    pub fn resolve(query: &ProxyQuery) -> Result<Self, String> {
        let endpoint = match non_blank(&query.endpoint) {
            None => Endpoint::Current,
            Some(raw) => Endpoint::try_from(raw).map_err(|e| e.to_string())?,
        };

        let q = if let Some(city) = non_blank(&query.city).or_else(|| non_blank(&query.q)) {
            city.to_string()
        } else if let (Some(lat), Some(lon)) = (non_blank(&query.lat), non_blank(&query.lon)) {
            let (lat, lon) = lat
                .parse::<f64>()
                .ok()
                .zip(lon.parse::<f64>().ok())
                .filter(|(lat, lon)| lat.is_finite() && lon.is_finite())
                .ok_or_else(|| format!("Invalid coordinates '{lat},{lon}'."))?;
            format!("{lat},{lon}")
        } else {
            return Err("Missing location. Provide `city`, `q`, or both `lat` and `lon`.".into());
        };

        Ok(Self {
            endpoint,
            q,
            days: non_blank(&query.days).unwrap_or("1").to_string(),
            aqi: non_blank(&query.aqi).unwrap_or("no").to_string(),
            alerts: non_blank(&query.alerts).unwrap_or("no").to_string(),
        })
    }

    /// Provider query pairs; forecast-only flags are attached only for forecasts.
    pub fn query_pairs<'a>(&'a self, api_key: &'a str) -> Vec<(&'static str, &'a str)> {
        let mut pairs = vec![("key", api_key), ("q", self.q.as_str())];
        if self.endpoint == Endpoint::Forecast {
            pairs.push(("days", self.days.as_str()));
            pairs.push(("aqi", self.aqi.as_str()));
            pairs.push(("alerts", self.alerts.as_str()));
        }
        pairs
    }
}

pub fn router(state: ProxyState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(ROUTE, get(handle_weather))
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Bind the configured address and serve until the process stops.
pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let addr = config.listen_addr()?;
    if config.api_key().is_none() {
        warn!("No API key configured; every request will fail with 500");
    }

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind proxy to {addr}"))?;

    serve_listener(listener, ProxyState::from_config(config)).await
}

pub async fn serve_listener(listener: TcpListener, state: ProxyState) -> anyhow::Result<()> {
    let addr = listener.local_addr().context("Failed to read listener address")?;
    info!("Weather proxy running at http://{addr}{ROUTE}");

    axum::serve(listener, router(state)).await.context("Weather proxy stopped unexpectedly")
}

async fn handle_weather(
    State(state): State<Arc<ProxyState>>,
    Query(query): Query<ProxyQuery>,
) -> ProxyResponse {
    let Some(api_key) = state.api_key.as_deref() else {
        error!("Rejecting request: provider API key is not configured");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Missing API key");
    };

    match UpstreamRequest::resolve(&query) {
        Ok(request) => state.forward(api_key, &request).await,
        Err(message) => {
            debug!(%message, "rejecting proxy query");
            error_response(StatusCode::BAD_REQUEST, &message)
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn error_response(status: StatusCode, message: &str) -> ProxyResponse {
    (status, Json(json!({ "error": message })))
}

fn internal_error() -> ProxyResponse {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}
