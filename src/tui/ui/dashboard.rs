//! Dashboard view: Home screen with the loaded model summary.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::adapters::RandomForest;
use crate::application::ScreeningContext;
use crate::domain::Verdict;
use crate::ports::Classifier;
use crate::tui::styles::MedicalTheme;

/// What the home screen shows about the loaded model.
#[derive(Debug, Clone, Default)]
pub struct ModelSummary {
    pub trees: usize,
    pub nodes: usize,
    pub max_depth: usize,
    pub features: usize,
    pub schema_hash: String,
    pub hyperparameters: Option<String>,
    pub cv_accuracy: Option<f64>,
    pub test_accuracy: Option<f64>,
}

impl ModelSummary {
    #[must_use]
    pub fn from_context(context: &ScreeningContext<RandomForest>) -> Self {
        let metadata = context.metadata();
        Self {
            trees: context.model().n_trees(),
            nodes: context.model().node_count(),
            max_depth: context.model().max_tree_depth(),
            features: context.model().feature_names().len(),
            schema_hash: context.feature_order().schema_hash(),
            hyperparameters: metadata.map(|m| m.hyperparameters.clone()),
            cv_accuracy: metadata.map(|m| m.cv_accuracy),
            test_accuracy: metadata.map(|m| m.test_accuracy),
        }
    }
}

/// Session counters shown next to the model summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionSummary {
    pub negative: u32,
    pub positive: u32,
}

impl SessionSummary {
    pub fn record(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Negative => self.negative += 1,
            Verdict::Positive => self.positive += 1,
        }
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.negative + self.positive
    }
}

/// Render the home view.
pub fn render_dashboard(f: &mut Frame, area: Rect, model: &ModelSummary, session: SessionSummary) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Main content
        ])
        .split(area);

    render_header(f, chunks[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    render_model_panel(f, columns[0], model);
    render_session_panel(f, columns[1], session);
}

fn render_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", MedicalTheme::text()),
        Span::styled("Pulmoscreen", MedicalTheme::title()),
        Span::styled(" │ ", MedicalTheme::text_muted()),
        Span::styled("Lung Cancer Risk Screening", MedicalTheme::text_secondary()),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn metric_line(label: &str, value: Option<f64>) -> Line<'static> {
    let value = value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}%", v * 100.0));
    Line::from(vec![
        Span::styled(format!("  {label}: "), MedicalTheme::text_secondary()),
        Span::styled(value, MedicalTheme::text()),
    ])
}

fn render_model_panel(f: &mut Frame, area: Rect, model: &ModelSummary) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Min(0)])
        .margin(1)
        .split(area);

    let mut short_hash = model.schema_hash.clone();
    short_hash.truncate(12);

    let lines = vec![
        Line::from(vec![
            Span::styled("  Trees: ", MedicalTheme::text_secondary()),
            Span::styled(model.trees.to_string(), MedicalTheme::text()),
            Span::styled(
                format!(" ({} nodes, depth ≤ {})", model.nodes, model.max_depth),
                MedicalTheme::text_muted(),
            ),
        ]),
        Line::from(vec![
            Span::styled("  Features: ", MedicalTheme::text_secondary()),
            Span::styled(model.features.to_string(), MedicalTheme::text()),
        ]),
        Line::from(vec![
            Span::styled("  Schema: ", MedicalTheme::text_secondary()),
            Span::styled(short_hash, MedicalTheme::text_muted()),
        ]),
        metric_line("CV accuracy", model.cv_accuracy),
        metric_line("Test accuracy", model.test_accuracy),
        Line::from(""),
        Line::from(Span::styled(
            format!(
                "  {}",
                model.hyperparameters.as_deref().unwrap_or("hyperparameters unknown")
            ),
            MedicalTheme::text_muted(),
        )),
    ];

    let block = Block::default()
        .title(Span::styled(" Model ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());
    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        chunks[0],
    );

    let actions = vec![
        Line::from(vec![
            Span::styled("[N] ", MedicalTheme::key_hint()),
            Span::styled("New Screening", MedicalTheme::key_desc()),
        ]),
        Line::from(vec![
            Span::styled("[R] ", MedicalTheme::key_hint()),
            Span::styled("Last Result", MedicalTheme::key_desc()),
        ]),
        Line::from(vec![
            Span::styled("[Q] ", MedicalTheme::key_hint()),
            Span::styled("Quit", MedicalTheme::key_desc()),
        ]),
    ];
    let actions_block = Block::default()
        .title(Span::styled(" Quick Actions ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());
    f.render_widget(Paragraph::new(actions).block(actions_block), chunks[1]);
}

fn render_session_panel(f: &mut Frame, area: Rect, session: SessionSummary) {
    let block = Block::default()
        .title(Span::styled(" This Session ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());

    if session.total() == 0 {
        let empty = Paragraph::new(Line::from(Span::styled(
            "No screenings yet. Press [N] to start.",
            MedicalTheme::text_muted(),
        )))
        .block(block);
        f.render_widget(empty, area);
        return;
    }

    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(3), Constraint::Min(0)])
        .margin(1)
        .split(inner);

    let counts = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("Negative: ", MedicalTheme::text_secondary()),
            Span::styled(
                session.negative.to_string(),
                MedicalTheme::verdict(Verdict::Negative),
            ),
            Span::styled("  Positive: ", MedicalTheme::text_secondary()),
            Span::styled(
                session.positive.to_string(),
                MedicalTheme::verdict(Verdict::Positive),
            ),
        ]),
        Line::from(Span::styled(
            "Individual answers are not kept.",
            MedicalTheme::text_muted(),
        )),
    ]);
    f.render_widget(counts, chunks[0]);

    let share = f64::from(session.positive) / f64::from(session.total());
    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(Span::styled(" Positive share ", MedicalTheme::text_secondary()))
                .borders(Borders::ALL)
                .border_style(MedicalTheme::border()),
        )
        .gauge_style(MedicalTheme::verdict(Verdict::Positive))
        .ratio(share)
        .label(format!("{:.0}%", share * 100.0));
    f.render_widget(gauge, chunks[1]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_summary_counts() {
        let mut session = SessionSummary::default();
        session.record(Verdict::Positive);
        session.record(Verdict::Negative);
        session.record(Verdict::Positive);
        assert_eq!(session.total(), 3);
        assert_eq!(session.positive, 2);
    }
}
