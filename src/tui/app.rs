//! Main TUI application state machine.
//!
//! Handles:
//! - Screen navigation
//! - Input event handling
//! - Prediction service integration

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};

use crate::adapters::{JsonArtifactStore, RandomForest};
use crate::application::{PredictionService, ScreeningContext};
use crate::domain::Answer;
use crate::ports::ArtifactStore;
use crate::ScreeningError;

use super::ui::{
    dashboard::{render_dashboard, ModelSummary, SessionSummary},
    questionnaire::{render_questionnaire, QuestionnaireState},
    render_disclaimer,
    result::{render_result, ResultState},
};

/// Current screen/view in the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Home,
    Questionnaire,
    Result,
}

/// Main application state
pub struct App {
    screen: Screen,
    should_quit: bool,

    /// Shared, read-only prediction service
    service: PredictionService<RandomForest>,

    model_summary: ModelSummary,
    session: SessionSummary,
    questionnaire_state: QuestionnaireState,
    result_state: ResultState,
}

impl App {
    /// Create a new application from the artifacts in the configured model
    /// directory.
    ///
    /// # Errors
    /// Returns error if no artifacts exist or they fail verification.
    pub fn new() -> Result<Self> {
        let store = JsonArtifactStore::from_env();
        if !store.exists() {
            return Err(anyhow!(
                "No trained model found in {:?}. Run train_model first or set PULMOSCREEN_MODEL_PATH.",
                store.dir()
            ));
        }

        // Refuse to start on artifacts that do not verify.
        let context = ScreeningContext::load(&store)
            .map_err(|e| anyhow!("Failed to load model from {:?}: {}", store.dir(), e))?;

        Ok(Self::with_context(Arc::new(context)))
    }

    /// Create application with an already loaded context.
    #[must_use]
    pub fn with_context(context: Arc<ScreeningContext<RandomForest>>) -> Self {
        let model_summary = ModelSummary::from_context(&context);
        Self {
            screen: Screen::Home,
            should_quit: false,
            service: PredictionService::new(context),
            model_summary,
            session: SessionSummary::default(),
            questionnaire_state: QuestionnaireState::default(),
            result_state: ResultState::default(),
        }
    }

    /// Run the main application loop.
    ///
    /// # Errors
    /// Returns error if terminal operations fail.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal);

        // Restore terminal
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Min(0), Constraint::Length(3)])
                    .split(f.area());

                match self.screen {
                    Screen::Home => {
                        render_dashboard(f, chunks[0], &self.model_summary, self.session)
                    }
                    Screen::Questionnaire => {
                        render_questionnaire(f, chunks[0], &self.questionnaire_state)
                    }
                    Screen::Result => render_result(f, chunks[0], &self.result_state),
                }

                render_disclaimer(f, chunks[1]);
            })?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key.code, key.modifiers);
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        if key == KeyCode::Char('q') && modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.screen {
            Screen::Home => self.handle_home_key(key),
            Screen::Questionnaire => self.handle_questionnaire_key(key),
            Screen::Result => self.handle_result_key(key),
        }
    }

    fn handle_home_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('n') | KeyCode::Char('N') => self.open_questionnaire(),
            KeyCode::Char('r') | KeyCode::Char('R') => self.screen = Screen::Result,
            KeyCode::Char('q') | KeyCode::Char('Q') => self.should_quit = true,
            _ => {}
        }
    }

    fn handle_questionnaire_key(&mut self, key: KeyCode) {
        let form = &mut self.questionnaire_state;
        match key {
            KeyCode::Esc => self.screen = Screen::Home,
            KeyCode::Up => form.prev_field(),
            KeyCode::Down | KeyCode::Tab => form.next_field(),
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Right => form.answer(Answer::Yes),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Left => form.answer(Answer::No),
            KeyCode::Char(' ') => form.toggle(),
            KeyCode::Char('s') | KeyCode::Char('S') => form.load_sample_data(),
            KeyCode::Char(c) => form.input_char(c),
            KeyCode::Backspace => form.delete_char(),
            KeyCode::Delete => form.clear_field(),
            KeyCode::Enter => self.submit_questionnaire(),
            _ => {}
        }
    }

    fn handle_result_key(&mut self, key: KeyCode) {
        let failed = matches!(self.result_state, ResultState::Error { .. });
        match key {
            KeyCode::Enter if failed => self.screen = Screen::Questionnaire,
            KeyCode::Char('n') | KeyCode::Char('N') => self.open_questionnaire(),
            KeyCode::Esc => self.screen = Screen::Home,
            _ => {}
        }
    }

    fn open_questionnaire(&mut self) {
        self.questionnaire_state = QuestionnaireState::default();
        self.screen = Screen::Questionnaire;
    }

    fn submit_questionnaire(&mut self) {
        let answers = match self.questionnaire_state.to_answers() {
            Ok(answers) => answers,
            Err(message) => {
                self.questionnaire_state.error_message = Some(message);
                return;
            }
        };

        match self.service.predict(&answers) {
            Ok(screening) => {
                self.session.record(screening.verdict);
                self.result_state = ResultState::Complete { screening };
                self.questionnaire_state = QuestionnaireState::default();
                self.screen = Screen::Result;
            }
            // Incomplete or out-of-range answers stay on the form.
            Err(ScreeningError::Validation(e)) => {
                self.questionnaire_state.error_message = Some(e.to_string());
            }
            Err(e) => {
                tracing::error!("Screening failed: {}", e);
                self.result_state = ResultState::Error {
                    message: e.to_string(),
                };
                self.screen = Screen::Result;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ForestParams;
    use crate::domain::FeatureColumnOrder;

    fn test_app() -> App {
        let order = FeatureColumnOrder::questionnaire();
        let rows: Vec<Vec<f64>> = (0..40)
            .map(|i| {
                let flag = (i % 2) as f64;
                let mut row = vec![flag; order.len()];
                row[0] = 30.0 + i as f64;
                row
            })
            .collect();
        let labels: Vec<usize> = (0..40).map(|i| i % 2).collect();
        let params = ForestParams {
            n_estimators: 5,
            ..ForestParams::default()
        };
        let model = RandomForest::fit(params, order.columns(), &rows, &labels).expect("fit");
        App::with_context(Arc::new(ScreeningContext::new(Arc::new(model), order)))
    }

    fn press(app: &mut App, key: KeyCode) {
        app.handle_key(key, KeyModifiers::NONE);
    }

    #[test]
    fn test_starts_on_home() {
        let app = test_app();
        assert_eq!(app.screen, Screen::Home);
        assert_eq!(app.model_summary.trees, 5);
        assert!(app.model_summary.nodes >= 5);
        assert!(app.model_summary.max_depth >= 1);
        assert_eq!(app.model_summary.features, 17);
    }

    #[test]
    fn test_incomplete_form_stays_with_error() {
        let mut app = test_app();
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.screen, Screen::Questionnaire);

        press(&mut app, KeyCode::Char('4'));
        press(&mut app, KeyCode::Char('5'));
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.screen, Screen::Questionnaire);
        assert!(app.questionnaire_state.error_message.is_some());
        assert_eq!(app.session.total(), 0);
    }

    #[test]
    fn test_complete_form_shows_result_and_resets() {
        let mut app = test_app();
        press(&mut app, KeyCode::Char('n'));
        press(&mut app, KeyCode::Char('s'));
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.screen, Screen::Result);
        assert!(matches!(app.result_state, ResultState::Complete { .. }));
        assert!(app.questionnaire_state.age.is_empty());
        assert_eq!(app.questionnaire_state.answered(), 0);
        assert_eq!(app.session.total(), 1);
    }

    #[test]
    fn test_out_of_range_age_rejected_on_form() {
        let mut app = test_app();
        press(&mut app, KeyCode::Char('n'));
        press(&mut app, KeyCode::Char('s'));
        app.questionnaire_state.age = "15".into();
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.screen, Screen::Questionnaire);
        let message = app.questionnaire_state.error_message.clone().unwrap_or_default();
        assert!(message.contains("15"));
    }

    #[test]
    fn test_ctrl_q_quits() {
        let mut app = test_app();
        app.handle_key(KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert!(app.should_quit);
    }
}
