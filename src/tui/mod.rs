//! TUI module: Terminal User Interface using Ratatui.
//!
//! Provides a medical-themed interface for:
//! - Home screen with the loaded model summary
//! - Questionnaire input
//! - Screening result display

mod app;
mod styles;
mod ui;

pub use app::App;
pub use styles::MedicalTheme;
