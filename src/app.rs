//! Application state and input dispatch.
//!
//! Wraps the controller with the bits a terminal form needs: which field has
//! focus, the horizon text, help overlay and quit state.

use crate::api::PredictionService;
use crate::config::Config;
use crate::controller::{Controller, ControllerEvent};
use crate::error::SubmitError;
use crate::ui::{self, FormLayout};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::{Position, Rect};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

/// Which form field receives typed characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Stock,
    Days,
}

impl Focus {
    pub fn toggle(self) -> Self {
        match self {
            Focus::Stock => Focus::Days,
            Focus::Days => Focus::Stock,
        }
    }
}

/// Application state.
pub struct App<S: PredictionService> {
    /// Suggestion/prediction controller
    pub controller: Controller<S>,
    /// Notices from the controller's background tasks
    events: UnboundedReceiver<ControllerEvent>,
    /// Horizon field text
    pub days: String,
    /// Focused field
    pub focus: Focus,
    /// Is the app running
    pub running: bool,
    /// Show help overlay
    pub show_help: bool,
    /// Suggestion rows visible at once
    pub max_suggestions: usize,
    /// Service the app talks to, for the header
    pub service_url: String,
}

impl<S: PredictionService> App<S> {
    /// Create a new application around `service`.
    pub fn new(service: Arc<S>, config: &Config) -> Self {
        let (controller, events) = Controller::new(service, config.controller_settings());

        Self {
            controller,
            events,
            days: config
                .input
                .default_days
                .map(|d| d.to_string())
                .unwrap_or_default(),
            focus: Focus::Stock,
            running: true,
            show_help: false,
            max_suggestions: config.display.max_suggestions.max(1),
            service_url: config.service.base_url.clone(),
        }
    }

    /// Apply every pending controller notice. Returns how many were handled.
    pub fn drain_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.controller.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Quit the application.
    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn should_quit(&self) -> bool {
        !self.running
    }

    /// Handle a key press.
    pub fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if ctrl && key.code == KeyCode::Char('c') {
            self.quit();
            return;
        }

        // Close help overlay on any key
        if self.show_help {
            self.show_help = false;
            return;
        }

        match key.code {
            KeyCode::F(1) => self.show_help = true,
            KeyCode::Esc => {
                if self.controller.panel().is_some() {
                    self.controller.dismiss();
                } else {
                    self.quit();
                }
            }
            KeyCode::Tab | KeyCode::BackTab => self.set_focus(self.focus.toggle()),
            KeyCode::Up if self.focus == Focus::Stock => self.controller.cursor_up(),
            KeyCode::Down if self.focus == Focus::Stock => self.controller.cursor_down(),
            KeyCode::Enter => self.enter(),
            KeyCode::Backspace => self.edit(|text| {
                text.pop();
            }),
            KeyCode::Char('p') if ctrl => self.submit(),
            KeyCode::Char('u') if ctrl => self.edit(String::clear),
            KeyCode::Char(c) if !ctrl => self.edit(|text| text.push(c)),
            _ => {}
        }
    }

    /// Handle a mouse event against the layout of the last drawn frame.
    pub fn handle_mouse(&mut self, mouse: MouseEvent, layout: &FormLayout) {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let at = Position::new(mouse.column, mouse.row);

        if let Some(panel_area) = layout.panel {
            if panel_area.contains(at) {
                if let Some(index) = self.panel_row_at(panel_area, at.y) {
                    self.controller.pick(index);
                    self.focus = Focus::Days;
                }
                return;
            }
        }

        if layout.stock.contains(at) {
            self.focus = Focus::Stock;
            return;
        }

        self.controller.dismiss();
        if layout.days.contains(at) {
            self.focus = Focus::Days;
        }
    }

    /// Map a screen row inside the panel to a suggestion index.
    fn panel_row_at(&self, panel_area: Rect, y: u16) -> Option<usize> {
        let panel = self.controller.panel()?;
        // Skip the top border
        let line = y.checked_sub(panel_area.y + 1)? as usize;
        let (offset, visible) = ui::panel_window(panel_area, panel.cursor, self.max_suggestions);
        if line >= visible {
            return None;
        }
        let index = offset + line;
        (index < panel.rows.len()).then_some(index)
    }

    fn set_focus(&mut self, focus: Focus) {
        if focus != Focus::Stock {
            self.controller.dismiss();
        }
        self.focus = focus;
    }

    fn enter(&mut self) {
        match self.focus {
            Focus::Stock => {
                if self.controller.pick_cursor() || self.controller.selection().is_some() {
                    self.focus = Focus::Days;
                }
            }
            Focus::Days => self.submit(),
        }
    }

    fn edit(&mut self, change: impl FnOnce(&mut String)) {
        match self.focus {
            Focus::Stock => {
                let mut text = self.controller.input().to_string();
                change(&mut text);
                if text != self.controller.input() {
                    self.controller.input_changed(text);
                }
            }
            Focus::Days => change(&mut self.days),
        }
    }

    /// Run the predict action with the current horizon text.
    pub fn submit(&mut self) {
        self.controller.dismiss();
        match self.controller.submit(&self.days) {
            Ok(()) => {}
            Err(SubmitError::InFlight) => debug!("submit ignored, prediction pending"),
            Err(SubmitError::Invalid(e)) => debug!(error = %e, "prediction form rejected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, ValidationError};
    use crate::models::{PredictOutcome, PredictionRequest, PredictionStatus, Suggestion};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    struct StubService {
        rows: Vec<Suggestion>,
        predicted: Mutex<Vec<PredictionRequest>>,
    }

    impl Default for StubService {
        fn default() -> Self {
            Self::with_rows(vec![
                Suggestion::new("AAPL", "Apple Inc"),
                Suggestion::new("MSFT", "Microsoft"),
            ])
        }
    }

    impl StubService {
        fn with_rows(rows: Vec<Suggestion>) -> Self {
            Self {
                rows,
                predicted: Mutex::new(Vec::new()),
            }
        }
    }

    impl PredictionService for StubService {
        async fn suggestions(
            &self,
            _query: &str,
            _cancel: CancellationToken,
        ) -> Result<Vec<Suggestion>, ApiError> {
            Ok(self.rows.clone())
        }

        async fn predict(&self, request: &PredictionRequest) -> Result<PredictOutcome, ApiError> {
            self.predicted.lock().unwrap().push(request.clone());
            Ok(PredictOutcome::Growth(1.5))
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn click(column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn new_app() -> (Arc<StubService>, App<StubService>) {
        let service = Arc::new(StubService::default());
        let app = App::new(Arc::clone(&service), &Config::default());
        (service, app)
    }

    fn type_text(app: &mut App<StubService>, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    async fn settle(app: &mut App<StubService>) {
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            app.drain_events();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_then_enter_picks_and_moves_focus() {
        let (_service, mut app) = new_app();

        type_text(&mut app, "ap");
        assert_eq!(app.controller.input(), "ap");
        settle(&mut app).await;
        assert!(app.controller.panel().is_some());

        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.controller.input(), "Microsoft");
        assert_eq!(app.focus, Focus::Days);
    }

    #[tokio::test(start_paused = true)]
    async fn test_days_field_submits_on_enter() {
        let (service, mut app) = new_app();

        type_text(&mut app, "ap");
        settle(&mut app).await;
        app.handle_key(key(KeyCode::Enter));
        type_text(&mut app, "30");
        app.handle_key(key(KeyCode::Enter));
        settle(&mut app).await;

        assert_eq!(app.controller.status(), &PredictionStatus::Growth(1.5));
        let predicted = service.predicted.lock().unwrap().clone();
        assert_eq!(predicted.len(), 1);
        assert_eq!(predicted[0].horizon_days, 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_without_selection_reports_inline() {
        let (service, mut app) = new_app();

        app.handle_key(key(KeyCode::Tab));
        type_text(&mut app, "30");
        app.handle_key(ctrl('p'));

        assert_eq!(
            app.controller.status(),
            &PredictionStatus::Invalid(ValidationError::NoSelection)
        );
        assert!(service.predicted.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_escape_dismisses_panel_before_quitting() {
        let (_service, mut app) = new_app();

        type_text(&mut app, "ap");
        settle(&mut app).await;
        app.handle_key(key(KeyCode::Esc));
        assert!(app.controller.panel().is_none());
        assert!(!app.should_quit());

        app.handle_key(key(KeyCode::Esc));
        assert!(app.should_quit());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ctrl_u_clears_field_and_q_is_typeable() {
        let (_service, mut app) = new_app();

        type_text(&mut app, "qqq");
        assert!(!app.should_quit());
        app.handle_key(ctrl('u'));
        assert_eq!(app.controller.input(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_help_overlay_swallows_next_key() {
        let (_service, mut app) = new_app();

        app.handle_key(key(KeyCode::F(1)));
        assert!(app.show_help);
        app.handle_key(key(KeyCode::Char('x')));
        assert!(!app.show_help);
        assert_eq!(app.controller.input(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_mouse_pick_and_outside_click() {
        let (_service, mut app) = new_app();
        let area = Rect::new(0, 0, 80, 30);

        type_text(&mut app, "ap");
        settle(&mut app).await;
        let layout = ui::form_layout(area, Some(2), app.max_suggestions);
        let panel = layout.panel.expect("panel area");

        // Outside click hides the panel, selection untouched
        app.handle_mouse(click(70, area.height - 1), &layout);
        assert!(app.controller.panel().is_none());
        assert!(app.controller.selection().is_none());

        type_text(&mut app, "p");
        settle(&mut app).await;
        app.handle_mouse(click(panel.x + 2, panel.y + 2), &layout);
        assert_eq!(app.controller.selection().unwrap().symbol, "MSFT");
        assert_eq!(app.focus, Focus::Days);
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_in_clipped_panel_picks_drawn_row() {
        let rows = (0..30)
            .map(|i| Suggestion::new(format!("SYM{}", i), format!("Stock {}", i)))
            .collect();
        let mut app = App::new(Arc::new(StubService::with_rows(rows)), &Config::default());
        app.max_suggestions = 20;
        let area = Rect::new(0, 0, 80, 20);

        type_text(&mut app, "st");
        settle(&mut app).await;
        for _ in 0..15 {
            app.handle_key(key(KeyCode::Down));
        }

        let layout = ui::form_layout(area, Some(30), app.max_suggestions);
        let panel = layout.panel.expect("panel area");
        let (offset, visible) = ui::panel_window(panel, 15, app.max_suggestions);
        assert!(visible < app.max_suggestions);
        assert_eq!(offset, 3);

        // First line inside the border shows row 3
        app.handle_mouse(click(panel.x + 2, panel.y + 1), &layout);
        assert_eq!(app.controller.selection().unwrap().symbol, "SYM3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_on_panel_border_picks_nothing() {
        let (_service, mut app) = new_app();
        let area = Rect::new(0, 0, 80, 30);

        type_text(&mut app, "ap");
        settle(&mut app).await;
        let layout = ui::form_layout(area, Some(2), app.max_suggestions);
        let panel = layout.panel.expect("panel area");

        app.handle_mouse(click(panel.x + 2, panel.y + panel.height - 1), &layout);
        assert!(app.controller.selection().is_none());
        assert!(app.controller.panel().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_days_prefilled() {
        let mut config = Config::default();
        config.input.default_days = Some(63);
        let app = App::new(Arc::new(StubService::default()), &config);
        assert_eq!(app.days, "63");
    }
}
