//! Questionnaire input form: age plus one yes/no answer per indicator.
//!
//! Every indicator starts unanswered ("-"); submission is refused until all
//! of them carry an explicit answer.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::domain::{Answer, Indicator, QuestionnaireAnswers, MAX_AGE, MIN_AGE};
use crate::tui::styles::MedicalTheme;

/// Row 0 is the age field; rows 1..=16 are the indicators.
const ROWS: usize = Indicator::ALL.len() + 1;

/// Questionnaire form state
#[derive(Debug, Clone, Default)]
pub struct QuestionnaireState {
    pub age: String,
    pub answers: [Option<Answer>; Indicator::ALL.len()],
    pub selected: usize,
    pub error_message: Option<String>,
}

impl QuestionnaireState {
    pub fn next_field(&mut self) {
        self.selected = (self.selected + 1) % ROWS;
    }

    pub fn prev_field(&mut self) {
        self.selected = self.selected.checked_sub(1).unwrap_or(ROWS - 1);
    }

    /// Indicator under the cursor, if the cursor is not on the age field.
    #[must_use]
    pub fn selected_indicator(&self) -> Option<Indicator> {
        self.selected.checked_sub(1).map(|i| Indicator::ALL[i])
    }

    /// Short name of the field under the cursor.
    #[must_use]
    pub fn current_field_label(&self) -> &'static str {
        self.selected_indicator().map_or("Age", |i| i.label())
    }

    /// Type into the age field; other rows ignore characters.
    pub fn input_char(&mut self, c: char) {
        if self.selected == 0 && c.is_ascii_digit() && self.age.len() < 3 {
            self.age.push(c);
            self.error_message = None;
        }
    }

    pub fn delete_char(&mut self) {
        if self.selected == 0 {
            self.age.pop();
        }
    }

    /// Answer the selected indicator and advance to the next row.
    pub fn answer(&mut self, answer: Answer) {
        if self.selected > 0 {
            self.answers[self.selected - 1] = Some(answer);
            self.error_message = None;
            self.next_field();
        }
    }

    /// Flip the selected answer (unanswered becomes "No").
    pub fn toggle(&mut self) {
        if self.selected > 0 {
            let slot = &mut self.answers[self.selected - 1];
            *slot = Some(match slot {
                Some(Answer::No) => Answer::Yes,
                _ => Answer::No,
            });
            self.error_message = None;
        }
    }

    /// Reset the selected row to its placeholder.
    pub fn clear_field(&mut self) {
        match self.selected {
            0 => self.age.clear(),
            i => self.answers[i - 1] = None,
        }
    }

    #[must_use]
    pub fn answered(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }

    /// Collect the form into an answer set.
    ///
    /// Only the age must parse here; range and completeness are checked by
    /// the prediction service.
    ///
    /// # Errors
    /// Returns a user-facing message if the age is empty or not a number.
    pub fn to_answers(&self) -> Result<QuestionnaireAnswers, String> {
        let age: u32 = self
            .age
            .trim()
            .parse()
            .map_err(|_| format!("Age: enter a whole number between {MIN_AGE} and {MAX_AGE}"))?;

        let mut answers = QuestionnaireAnswers::new(age);
        for (indicator, answer) in Indicator::ALL.iter().zip(&self.answers) {
            if let Some(answer) = answer {
                answers.set(*indicator, *answer);
            }
        }
        Ok(answers)
    }

    /// Fill a sample respondent (55-year-old smoker with breathing issues).
    pub fn load_sample_data(&mut self) {
        self.age = "55".to_string();
        for (indicator, slot) in Indicator::ALL.iter().zip(self.answers.iter_mut()) {
            let yes = matches!(
                indicator,
                Indicator::Gender
                    | Indicator::Smoking
                    | Indicator::BreathingIssue
                    | Indicator::ChestTightness
                    | Indicator::SmokingFamilyHistory
            );
            *slot = Some(Answer::from(yes));
        }
        self.error_message = None;
    }
}

/// Render the questionnaire form
pub fn render_questionnaire(f: &mut Frame, area: Rect, state: &QuestionnaireState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Questions
            Constraint::Length(3), // Footer/error
        ])
        .split(area);

    render_form_header(f, chunks[0], state);
    render_questions(f, chunks[1], state);
    render_form_footer(f, chunks[2], state);
}

fn render_form_header(f: &mut Frame, area: Rect, state: &QuestionnaireState) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", MedicalTheme::text()),
        Span::styled("Lung Health Questionnaire", MedicalTheme::title()),
        Span::styled(
            format!(" │ {}/{} answered │ ", state.answered(), Indicator::ALL.len()),
            MedicalTheme::text_secondary(),
        ),
        Span::styled(state.current_field_label(), MedicalTheme::subtitle()),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn answer_chip(answer: Option<Answer>) -> Span<'static> {
    let text = match answer {
        None => "  -  ",
        Some(Answer::No) => " No  ",
        Some(Answer::Yes) => " Yes ",
    };
    Span::styled(text, MedicalTheme::answer(answer))
}

fn render_questions(f: &mut Frame, area: Rect, state: &QuestionnaireState) {
    let age_value = if state.age.is_empty() {
        Span::styled(format!("years ({MIN_AGE}-{MAX_AGE})"), MedicalTheme::text_muted())
    } else {
        Span::styled(state.age.clone(), MedicalTheme::text())
    };
    let mut age_line = vec![
        Span::styled(format!("{:>2}. ", 0), MedicalTheme::text_muted()),
        Span::styled("Age ", MedicalTheme::text()),
        age_value,
    ];
    if state.selected == 0 {
        age_line.push(Span::styled("▌", MedicalTheme::cursor()));
    }

    let items: Vec<ListItem> = std::iter::once(ListItem::new(Line::from(age_line)))
        .chain(
            Indicator::ALL
                .iter()
                .zip(&state.answers)
                .enumerate()
                .map(|(i, (indicator, answer))| {
                    ListItem::new(Line::from(vec![
                        Span::styled(format!("{:>2}. ", i + 1), MedicalTheme::text_muted()),
                        answer_chip(*answer),
                        Span::raw(" "),
                        Span::styled(indicator.prompt(), MedicalTheme::text()),
                    ]))
                }),
        )
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(MedicalTheme::border_focused()),
        )
        .highlight_style(MedicalTheme::selected())
        .highlight_symbol("› ");

    let mut list_state = ListState::default();
    list_state.select(Some(state.selected));
    f.render_stateful_widget(list, area, &mut list_state);
}

fn render_form_footer(f: &mut Frame, area: Rect, state: &QuestionnaireState) {
    let content = if let Some(err) = &state.error_message {
        Line::from(vec![
            Span::styled("! ", MedicalTheme::danger()),
            Span::styled(err.clone(), MedicalTheme::danger()),
        ])
    } else {
        Line::from(vec![
            Span::styled("[↑↓] ", MedicalTheme::key_hint()),
            Span::styled("Navigate ", MedicalTheme::key_desc()),
            Span::styled("[Y/N] ", MedicalTheme::key_hint()),
            Span::styled("Answer ", MedicalTheme::key_desc()),
            Span::styled("[Space] ", MedicalTheme::key_hint()),
            Span::styled("Toggle ", MedicalTheme::key_desc()),
            Span::styled("[Enter] ", MedicalTheme::key_hint()),
            Span::styled("Submit ", MedicalTheme::key_desc()),
            Span::styled("[S] ", MedicalTheme::key_hint()),
            Span::styled("Sample ", MedicalTheme::key_desc()),
            Span::styled("[Esc] ", MedicalTheme::key_hint()),
            Span::styled("Cancel", MedicalTheme::key_desc()),
        ])
    };

    let footer = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_wraps() {
        let mut state = QuestionnaireState::default();
        state.prev_field();
        assert_eq!(state.selected, 16);
        state.next_field();
        assert_eq!(state.selected, 0);
        assert_eq!(state.selected_indicator(), None);
        assert_eq!(state.current_field_label(), "Age");
        state.next_field();
        assert_eq!(state.selected_indicator(), Some(Indicator::Gender));
        assert_eq!(state.current_field_label(), "Male");
    }

    #[test]
    fn test_age_accepts_digits_only() {
        let mut state = QuestionnaireState::default();
        for c in "4a5-".chars() {
            state.input_char(c);
        }
        assert_eq!(state.age, "45");
        state.delete_char();
        assert_eq!(state.age, "4");
    }

    #[test]
    fn test_answer_advances_and_toggle_cycles() {
        let mut state = QuestionnaireState {
            selected: 1,
            ..QuestionnaireState::default()
        };
        state.answer(Answer::Yes);
        assert_eq!(state.answers[0], Some(Answer::Yes));
        assert_eq!(state.selected, 2);

        state.toggle();
        assert_eq!(state.answers[1], Some(Answer::No));
        state.toggle();
        assert_eq!(state.answers[1], Some(Answer::Yes));
        state.clear_field();
        assert_eq!(state.answers[1], None);
        assert_eq!(state.answered(), 1);
    }

    #[test]
    fn test_partial_form_yields_partial_answers() {
        let mut state = QuestionnaireState {
            age: "60".into(),
            ..QuestionnaireState::default()
        };
        state.answers[1] = Some(Answer::Yes);

        let answers = state.to_answers().expect("age parses");
        assert_eq!(answers.age, 60);
        assert_eq!(answers.answers.len(), 1);
        assert_eq!(answers.answers.get(&Indicator::Smoking), Some(&Answer::Yes));
        assert!(answers.validate().is_err());
    }

    #[test]
    fn test_empty_age_rejected() {
        let state = QuestionnaireState::default();
        assert!(state.to_answers().is_err());
    }

    #[test]
    fn test_sample_data_is_complete() {
        let mut state = QuestionnaireState::default();
        state.load_sample_data();
        let answers = state.to_answers().expect("age parses");
        assert!(answers.validate().is_ok());
        assert_eq!(answers.answers.get(&Indicator::Smoking), Some(&Answer::Yes));
    }
}
