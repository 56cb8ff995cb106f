//! Dashboard state container.
//!
//! `reduce` is a pure transition function; side effects are described by the
//! returned [`Command`] and executed by [`Dashboard`] (or any other driver).

use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc;
use tracing::debug;

use crate::{
    autocomplete::{Autocomplete, SuggestionBatch},
    model::{CitySuggestion, Coordinates, WeatherBundle},
    provider::WeatherSource,
};

/// City loaded on first mount.
pub const DEFAULT_CITY: &str = "London";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub phase: Phase,
    /// Last successful lookup; kept while a new one is loading.
    pub data: Option<WeatherBundle>,
    /// Main error channel, shown verbatim.
    pub error: Option<String>,
    /// Advisory geolocation message, shown alongside data.
    pub geo_notice: Option<String>,
    pub query: String,
    pub suggestions: Vec<CitySuggestion>,
    /// Ticket of the fetch whose result will be accepted.
    pending: Option<u64>,
    last_ticket: u64,
    /// Sequence number of the last suggestion search requested.
    last_suggest_seq: u64,
    /// Highest suggestion sequence applied so far.
    suggestion_seq: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Mounted,
    SearchSubmitted(String),
    GeolocateRequested,
    GeolocationSucceeded(Coordinates),
    GeolocationFailed(String),
    Loaded { ticket: u64, bundle: Box<WeatherBundle> },
    Failed { ticket: u64, message: String },
    QueryChanged(String),
    SuggestionsLoaded(SuggestionBatch),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    FetchCity { ticket: u64, city: String },
    FetchCoords { ticket: u64, coords: Coordinates },
    /// Feed the debounced autocomplete; `seq` comes back on the batch.
    Suggest { seq: u64, query: String },
}

impl DashboardState {
    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    fn settled_phase(&self) -> Phase {
        if self.data.is_some() {
            Phase::Success
        } else if self.error.is_some() {
            Phase::Error
        } else {
            Phase::Idle
        }
    }

    fn start_fetch(&mut self) -> u64 {
        self.last_ticket += 1;
        self.pending = Some(self.last_ticket);
        self.phase = Phase::Loading;
        self.error = None;
        self.geo_notice = None;
        self.last_ticket
    }

    /// Drop every suggestion list still in flight.
    fn discard_suggestions(&mut self) {
        self.suggestions.clear();
        self.suggestion_seq = self.last_suggest_seq;
    }

    /// Apply `event` in place, returning the follow-up command if any.
    pub fn apply(&mut self, event: Event) -> Option<Command> {
        let (next, command) = reduce(std::mem::take(self), event);
        *self = next;
        command
    }
}

/// Pure transition: the next state plus the side effect to run, if any.
pub fn reduce(mut state: DashboardState, event: Event) -> (DashboardState, Option<Command>) {
    let command = match event {
        Event::Mounted => {
            let ticket = state.start_fetch();
            Some(Command::FetchCity { ticket, city: DEFAULT_CITY.to_string() })
        }
        Event::SearchSubmitted(city) => {
            let city = city.trim();
            if city.is_empty() {
                None
            } else {
                let city = city.to_string();
                let ticket = state.start_fetch();
                state.discard_suggestions();
                Some(Command::FetchCity { ticket, city })
            }
        }
        Event::GeolocateRequested => {
            state.phase = Phase::Loading;
            state.geo_notice = None;
            None
        }
        Event::GeolocationSucceeded(coords) => {
            let ticket = state.start_fetch();
            Some(Command::FetchCoords { ticket, coords })
        }
        Event::GeolocationFailed(message) => {
            state.geo_notice = Some(message);
            if state.pending.is_none() {
                state.phase = state.settled_phase();
            }
            None
        }
        Event::Loaded { ticket, bundle } => {
            if state.pending == Some(ticket) {
                state.pending = None;
                state.data = Some(*bundle);
                state.error = None;
                state.phase = Phase::Success;
            } else {
                debug!(ticket, "dropping stale weather result");
            }
            None
        }
        Event::Failed { ticket, message } => {
            if state.pending == Some(ticket) {
                state.pending = None;
                state.data = None;
                state.error = Some(message);
                state.phase = Phase::Error;
            } else {
                debug!(ticket, "dropping stale weather failure");
            }
            None
        }
        Event::QueryChanged(text) => {
            let query = text.trim().to_string();
            state.query = text;
            if query.is_empty() {
                state.discard_suggestions();
                None
            } else {
                state.last_suggest_seq += 1;
                Some(Command::Suggest { seq: state.last_suggest_seq, query })
            }
        }
        Event::SuggestionsLoaded(batch) => {
            if batch.seq > state.suggestion_seq {
                state.suggestion_seq = batch.seq;
                // A failed lookup clears the list; it never reaches the error banner.
                state.suggestions = batch.result.unwrap_or_default();
            } else {
                debug!(seq = batch.seq, latest = state.suggestion_seq, "dropping stale suggestions");
            }
            None
        }
    };

    (state, command)
}

/// Runs reducer commands against a [`WeatherSource`].
///
/// `Suggest` commands go to a debounced [`Autocomplete`] task when one is
/// attached; its batches are applied through [`Dashboard::recv_suggestions`].
#[derive(Debug)]
pub struct Dashboard<S> {
    source: Arc<S>,
    state: DashboardState,
    autocomplete: Option<Autocomplete>,
    batches: Option<mpsc::UnboundedReceiver<SuggestionBatch>>,
}

impl<S: WeatherSource> Dashboard<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
            state: DashboardState::default(),
            autocomplete: None,
            batches: None,
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Apply `event` and run any resulting fetch to completion.
    pub async fn dispatch(&mut self, event: Event) -> &DashboardState {
        let mut next = Some(event);
        while let Some(event) = next.take() {
            if let Some(command) = self.state.apply(event) {
                next = self.run(command).await;
            }
        }
        &self.state
    }

    /// Wait for the next autocomplete batch and apply it.
    ///
    /// Returns `None` when no autocomplete task is attached or it has stopped.
    pub async fn recv_suggestions(&mut self) -> Option<&DashboardState> {
        let batch = self.batches.as_mut()?.recv().await?;
        self.state.apply(Event::SuggestionsLoaded(batch));
        Some(&self.state)
    }

    async fn run(&self, command: Command) -> Option<Event> {
        let (ticket, result) = match command {
            Command::FetchCity { ticket, city } => {
                (ticket, self.source.fetch_weather_by_city(&city).await)
            }
            Command::FetchCoords { ticket, coords } => {
                (ticket, self.source.fetch_weather_by_coords(coords).await)
            }
            Command::Suggest { seq, query } => {
                match &self.autocomplete {
                    Some(autocomplete) if !autocomplete.keystroke(seq, query) => {
                        debug!(seq, "autocomplete task stopped");
                    }
                    Some(_) => {}
                    None => debug!(seq, "no autocomplete attached; ignoring query"),
                }
                return None;
            }
        };

        Some(match result {
            Ok(bundle) => Event::Loaded { ticket, bundle: Box::new(bundle) },
            Err(err) => Event::Failed { ticket, message: err.to_string() },
        })
    }
}

impl<S: WeatherSource + 'static> Dashboard<S> {
    /// Dashboard whose query changes drive a debounced search on `source`.
    pub fn with_autocomplete(source: S, quiet: Duration) -> Self {
        let mut dashboard = Self::new(source);
        let (autocomplete, batches) = Autocomplete::spawn(Arc::clone(&dashboard.source), quiet);
        dashboard.autocomplete = Some(autocomplete);
        dashboard.batches = Some(batches);
        dashboard
    }
}
