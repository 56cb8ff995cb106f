//! Debounced city autocomplete.
//!
//! Keystrokes are collapsed until the input has been quiet for the configured
//! period; only then is one search issued for the latest text. Every keystroke
//! carries a sequence number chosen by the caller and the batch reports the
//! number of the keystroke it answers. Searches are never cancelled, so
//! consumers must discard any batch whose `seq` is not the newest they have seen.

use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc;
use tracing::debug;

use crate::{model::CitySuggestion, provider::WeatherSource};

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(300);

/// Result of one debounced search.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionBatch {
    pub seq: u64,
    pub query: String,
    pub result: Result<Vec<CitySuggestion>, String>,
}

/// Handle feeding keystrokes into the debounce task.
#[derive(Debug, Clone)]
pub struct Autocomplete {
    keys: mpsc::UnboundedSender<(u64, String)>,
}

impl Autocomplete {
    /// Start the debounce task on the current runtime.
    ///
    /// The task stops once every handle has been dropped.
    pub fn spawn<S>(
        source: Arc<S>,
        quiet: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<SuggestionBatch>)
    where
        S: WeatherSource + 'static,
    {
        let (keys_tx, keys_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        tokio::spawn(debounce(source, quiet, keys_rx, out_tx));

        (Self { keys: keys_tx }, out_rx)
    }

    /// Record the current input text under `seq`. Returns `false` if the task
    /// has stopped.
    pub fn keystroke(&self, seq: u64, text: impl Into<String>) -> bool {
        self.keys.send((seq, text.into())).is_ok()
    }
}

async fn debounce<S>(
    source: Arc<S>,
    quiet: Duration,
    mut keys: mpsc::UnboundedReceiver<(u64, String)>,
    out: mpsc::UnboundedSender<SuggestionBatch>,
) where
    S: WeatherSource + 'static,
{
    while let Some(mut latest) = keys.recv().await {
        loop {
            tokio::select! {
                next = keys.recv() => match next {
                    Some(key) => latest = key,
                    None => break,
                },
                _ = tokio::time::sleep(quiet) => break,
            }
        }

        let (seq, text) = latest;
        let query = text.trim().to_string();

        if query.is_empty() {
            let _ = out.send(SuggestionBatch { seq, query, result: Ok(Vec::new()) });
            continue;
        }

        debug!(seq, %query, "searching cities");
        let source = Arc::clone(&source);
        let out = out.clone();
        tokio::spawn(async move {
            let result = source
                .fetch_autocomplete_weather_by_city(&query)
                .await
                .map_err(|e| e.to_string());
            let _ = out.send(SuggestionBatch { seq, query, result });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::WeatherClient,
        dashboard::{DashboardState, Event},
        error::WeatherError,
        model::{Coordinates, CurrentWeather, HourlyForecast, WeatherBundle},
        provider::weatherapi::fixtures,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::time::{sleep, timeout};
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const QUIET: Duration = Duration::from_millis(100);

    #[derive(Debug, Default)]
    struct RecordingSource {
        queries: Mutex<Vec<String>>,
        slow_query: Option<&'static str>,
    }

    impl RecordingSource {
        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WeatherSource for RecordingSource {
        async fn fetch_current_weather_by_city(
            &self,
            _city: &str,
        ) -> Result<CurrentWeather, WeatherError> {
            unimplemented!()
        }

        async fn fetch_hourly_forecast_by_city(
            &self,
            _city: &str,
        ) -> Result<HourlyForecast, WeatherError> {
            unimplemented!()
        }

        async fn fetch_weather_by_coords(
            &self,
            _coords: Coordinates,
        ) -> Result<WeatherBundle, WeatherError> {
            unimplemented!()
        }

        async fn fetch_autocomplete_weather_by_city(
            &self,
            partial: &str,
        ) -> Result<Vec<CitySuggestion>, WeatherError> {
            self.queries.lock().unwrap().push(partial.to_string());
            if self.slow_query == Some(partial) {
                sleep(Duration::from_millis(400)).await;
            }
            Ok(vec![CitySuggestion {
                id: None,
                name: Some(partial.to_string()),
                region: None,
                country: None,
                lat: None,
                lon: None,
                url: None,
            }])
        }
    }

    #[tokio::test]
    async fn burst_of_keystrokes_triggers_one_search() {
        let source = Arc::new(RecordingSource::default());
        let (handle, mut batches) = Autocomplete::spawn(Arc::clone(&source), QUIET);

        handle.keystroke(1, "L");
        handle.keystroke(2, "Lo");
        handle.keystroke(3, "Lon");

        let batch = batches.recv().await.unwrap();
        assert_eq!(batch.seq, 3);
        assert_eq!(batch.query, "Lon");

        assert!(timeout(QUIET * 3, batches.recv()).await.is_err());
        assert_eq!(source.queries(), vec!["Lon".to_string()]);
    }

    #[tokio::test]
    async fn blank_input_skips_the_network() {
        let source = Arc::new(RecordingSource::default());
        let (handle, mut batches) = Autocomplete::spawn(Arc::clone(&source), QUIET);

        handle.keystroke(1, "   ");

        let batch = batches.recv().await.unwrap();
        assert_eq!(batch.result, Ok(vec![]));
        assert!(source.queries().is_empty());
    }

    #[tokio::test]
    async fn late_response_does_not_overwrite_newer_suggestions() {
        let source = Arc::new(RecordingSource { slow_query: Some("Lo"), ..Default::default() });
        let (handle, mut batches) = Autocomplete::spawn(Arc::clone(&source), QUIET);

        handle.keystroke(1, "Lo");
        sleep(QUIET * 2).await;
        handle.keystroke(2, "Lond");

        let first = batches.recv().await.unwrap();
        let second = batches.recv().await.unwrap();
        assert_eq!((first.seq, second.seq), (2, 1));

        let mut state = DashboardState::default();
        state.apply(Event::SuggestionsLoaded(first));
        state.apply(Event::SuggestionsLoaded(second));

        assert_eq!(state.suggestions[0].name.as_deref(), Some("Lond"));
    }

    #[tokio::test]
    async fn debounced_search_hits_proxy_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("endpoint", "search"))
            .and(query_param("city", "Lond"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::search_payload()))
            .expect(1)
            .mount(&server)
            .await;

        let client = Arc::new(WeatherClient::new(format!("{}/api/weather", server.uri())));
        let (handle, mut batches) = Autocomplete::spawn(client, QUIET);

        for (seq, text) in (1..).zip(["L", "Lo", "Lon", "Lond"]) {
            assert!(handle.keystroke(seq, text));
        }

        let batch = batches.recv().await.unwrap();
        assert_eq!(batch.query, "Lond");
        assert_eq!(batch.result.unwrap().len(), 2);
    }
}
