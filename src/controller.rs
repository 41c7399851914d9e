//! Suggestion/prediction controller.
//!
//! Owns the debounce timer, the cancellation token of the live suggestion
//! fetch, the current selection and the prediction status. Timers and
//! requests run as spawned tasks; they report back through a
//! [`ControllerEvent`] channel that the owner drains and feeds to
//! [`Controller::handle_event`]. All state changes happen there, on one task.

use crate::api::PredictionService;
use crate::error::{ApiError, SubmitError, ValidationError};
use crate::highlight::{Highlight, highlight};
use crate::models::{
    PredictOutcome, PredictionRecord, PredictionRequest, PredictionStatus, Selection, Suggestion,
    parse_horizon,
};
use chrono::Local;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Quiet period after the last keystroke before suggestions are fetched.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Shortest trimmed query that is worth a suggestion fetch.
pub const DEFAULT_MIN_QUERY_CHARS: usize = 2;

/// Tunables for a [`Controller`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    pub debounce: Duration,
    pub min_query_chars: usize,
    pub history_size: usize,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            min_query_chars: DEFAULT_MIN_QUERY_CHARS,
            history_size: 10,
        }
    }
}

/// Completion notices sent by the controller's background tasks.
#[derive(Debug)]
pub enum ControllerEvent {
    DebounceElapsed {
        timer: u64,
    },
    SuggestionsLoaded {
        generation: u64,
        query: String,
        result: Result<Vec<Suggestion>, ApiError>,
    },
    PredictionLoaded {
        selection: Selection,
        horizon_days: u32,
        result: Result<PredictOutcome, ApiError>,
    },
}

/// Where the controller is in its interaction cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Fetching,
    Rendered,
    Hidden,
    Selected,
    Predicting,
    Result,
    Error,
}

/// The visible suggestion list.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionPanel {
    /// Query the rows were fetched for
    pub query: String,
    /// Rows in the order the service returned them
    pub rows: Vec<Suggestion>,
    /// Keyboard cursor
    pub cursor: usize,
}

impl SuggestionPanel {
    /// Rows paired with the part of their label that matches the query.
    pub fn highlighted(&self) -> impl Iterator<Item = (&Suggestion, Highlight<'_>)> {
        self.rows
            .iter()
            .map(|row| (row, highlight(&row.name, &self.query)))
    }
}

/// Debounced, cancellable autocomplete plus prediction submission.
pub struct Controller<S: PredictionService> {
    service: Arc<S>,
    events: UnboundedSender<ControllerEvent>,
    settings: ControllerSettings,

    timer: Option<JoinHandle<()>>,
    timer_id: u64,
    fetch: Option<CancellationToken>,
    generation: u64,
    predicting: bool,

    input: String,
    selection: Option<Selection>,
    panel: Option<SuggestionPanel>,
    status: PredictionStatus,
    phase: Phase,
    history: VecDeque<PredictionRecord>,
}

impl<S: PredictionService> Controller<S> {
    /// Create a controller and the receiver its background tasks report to.
    pub fn new(
        service: Arc<S>,
        settings: ControllerSettings,
    ) -> (Self, UnboundedReceiver<ControllerEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let controller = Self {
            service,
            events,
            settings,
            timer: None,
            timer_id: 0,
            fetch: None,
            generation: 0,
            predicting: false,
            input: String::new(),
            selection: None,
            panel: None,
            status: PredictionStatus::Empty,
            phase: Phase::Idle,
            history: VecDeque::new(),
        };
        (controller, rx)
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn panel(&self) -> Option<&SuggestionPanel> {
        self.panel.as_ref()
    }

    pub fn status(&self) -> &PredictionStatus {
        &self.status
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn history(&self) -> impl Iterator<Item = &PredictionRecord> {
        self.history.iter()
    }

    pub fn is_predicting(&self) -> bool {
        self.predicting
    }

    /// The user edited the stock field.
    ///
    /// Clears any selection and restarts the debounce timer.
    pub fn input_changed(&mut self, text: impl Into<String>) {
        self.input = text.into();
        if self.selection.take().is_some() {
            debug!("manual edit cleared selection");
        }
        self.phase = Phase::Idle;
        self.arm_timer();
    }

    /// Pick the suggestion at `index` in the visible panel.
    ///
    /// Returns false when there is no such row.
    pub fn pick(&mut self, index: usize) -> bool {
        let Some(row) = self
            .panel
            .as_ref()
            .and_then(|panel| panel.rows.get(index))
            .cloned()
        else {
            return false;
        };

        // A fetch still pending would reopen the panel over the chosen name.
        self.disarm_timer();
        self.cancel_fetch();

        info!(symbol = %row.symbol, "selected stock");
        self.selection = Some(Selection {
            symbol: row.symbol.trim().to_string(),
            name: row.name.clone(),
        });
        self.input = row.name;
        self.panel = None;
        self.phase = Phase::Selected;
        true
    }

    /// Pick the row under the keyboard cursor.
    pub fn pick_cursor(&mut self) -> bool {
        match self.panel.as_ref().map(|p| p.cursor) {
            Some(cursor) => self.pick(cursor),
            None => false,
        }
    }

    /// Move the keyboard cursor up.
    pub fn cursor_up(&mut self) {
        if let Some(panel) = self.panel.as_mut() {
            panel.cursor = panel.cursor.saturating_sub(1);
        }
    }

    /// Move the keyboard cursor down.
    pub fn cursor_down(&mut self) {
        if let Some(panel) = self.panel.as_mut() {
            if panel.cursor < panel.rows.len().saturating_sub(1) {
                panel.cursor += 1;
            }
        }
    }

    /// Hide the panel without touching the selection (outside click, Esc).
    pub fn dismiss(&mut self) {
        if self.panel.take().is_some() && self.phase == Phase::Rendered {
            self.phase = Phase::Hidden;
        }
    }

    /// Validate the form and send one prediction request.
    pub fn submit(&mut self, horizon: &str) -> Result<(), SubmitError> {
        if self.predicting {
            debug!("prediction already in flight, ignoring submit");
            return Err(SubmitError::InFlight);
        }

        let Some(selection) = self.selection.clone() else {
            return Err(self.reject(ValidationError::NoSelection));
        };
        let horizon_days = match parse_horizon(horizon) {
            Ok(days) => days,
            Err(e) => return Err(self.reject(e)),
        };

        self.status = PredictionStatus::Predicting;
        self.phase = Phase::Predicting;
        self.predicting = true;

        let service = Arc::clone(&self.service);
        let events = self.events.clone();
        tokio::spawn(async move {
            let request = PredictionRequest {
                symbol: selection.symbol.clone(),
                horizon_days,
            };
            let result = service.predict(&request).await;
            let _ = events.send(ControllerEvent::PredictionLoaded {
                selection,
                horizon_days,
                result,
            });
        });

        Ok(())
    }

    /// Apply a notice from one of the background tasks.
    pub fn handle_event(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::DebounceElapsed { timer } => {
                if timer != self.timer_id {
                    debug!(timer, "ignoring superseded debounce timer");
                    return;
                }
                self.timer = None;
                self.start_fetch();
            }
            ControllerEvent::SuggestionsLoaded {
                generation,
                query,
                result,
            } => self.finish_fetch(generation, query, result),
            ControllerEvent::PredictionLoaded {
                selection,
                horizon_days,
                result,
            } => self.finish_prediction(selection, horizon_days, result),
        }
    }

    fn reject(&mut self, error: ValidationError) -> SubmitError {
        self.status = PredictionStatus::Invalid(error);
        error.into()
    }

    fn arm_timer(&mut self) {
        self.disarm_timer();
        self.timer_id += 1;

        let timer = self.timer_id;
        let delay = self.settings.debounce;
        let events = self.events.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(ControllerEvent::DebounceElapsed { timer });
        }));
    }

    fn disarm_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
        // Invalidates a tick that fired but has not been handled yet.
        self.timer_id += 1;
    }

    fn cancel_fetch(&mut self) {
        if let Some(token) = self.fetch.take() {
            debug!(generation = self.generation, "cancelling suggestion fetch");
            token.cancel();
        }
    }

    fn start_fetch(&mut self) {
        let query = self.input.trim().to_string();

        if query.chars().count() < self.settings.min_query_chars {
            self.cancel_fetch();
            self.panel = None;
            self.phase = Phase::Hidden;
            return;
        }

        self.cancel_fetch();
        self.generation += 1;
        let token = CancellationToken::new();
        self.fetch = Some(token.clone());
        self.phase = Phase::Fetching;

        let generation = self.generation;
        let service = Arc::clone(&self.service);
        let events = self.events.clone();
        debug!(generation, %query, "starting suggestion fetch");
        tokio::spawn(async move {
            let result = service.suggestions(&query, token).await;
            let _ = events.send(ControllerEvent::SuggestionsLoaded {
                generation,
                query,
                result,
            });
        });
    }

    fn finish_fetch(
        &mut self,
        generation: u64,
        query: String,
        result: Result<Vec<Suggestion>, ApiError>,
    ) {
        let live = generation == self.generation
            && self.fetch.as_ref().is_some_and(|t| !t.is_cancelled());
        if !live {
            debug!(generation, %query, "discarding stale suggestions");
            return;
        }
        self.fetch = None;

        match result {
            Ok(rows) if rows.is_empty() => {
                self.panel = None;
                self.phase = Phase::Hidden;
            }
            Ok(rows) => {
                self.panel = Some(SuggestionPanel {
                    query,
                    rows,
                    cursor: 0,
                });
                self.phase = Phase::Rendered;
            }
            Err(e) if e.is_cancelled() => {
                debug!(generation, "suggestion fetch cancelled");
            }
            Err(e) => {
                warn!(error = %e, %query, "failed to fetch stock suggestions");
                self.panel = None;
                self.phase = Phase::Hidden;
            }
        }
    }

    fn finish_prediction(
        &mut self,
        selection: Selection,
        horizon_days: u32,
        result: Result<PredictOutcome, ApiError>,
    ) {
        self.predicting = false;

        match result {
            Ok(PredictOutcome::Growth(growth)) => {
                info!(symbol = %selection.symbol, growth, "prediction received");
                self.status = PredictionStatus::Growth(growth);
                self.phase = Phase::Result;
                self.record(selection, horizon_days, growth);
            }
            Ok(PredictOutcome::Rejected(message)) => {
                info!(symbol = %selection.symbol, %message, "prediction rejected");
                self.status = PredictionStatus::Rejected(message);
                self.phase = Phase::Error;
            }
            Err(e) => {
                warn!(error = %e, symbol = %selection.symbol, "failed to fetch prediction");
                self.status = PredictionStatus::Failed;
                self.phase = Phase::Error;
            }
        }
    }

    fn record(&mut self, selection: Selection, horizon_days: u32, growth_percent: f64) {
        if self.settings.history_size == 0 {
            return;
        }
        self.history.push_front(PredictionRecord {
            symbol: selection.symbol,
            name: selection.name,
            horizon_days,
            growth_percent,
            at: Local::now(),
        });
        self.history.truncate(self.settings.history_size);
    }
}

impl<S: PredictionService> Drop for Controller<S> {
    fn drop(&mut self) {
        self.disarm_timer();
        self.cancel_fetch();
    }
}
