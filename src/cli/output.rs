//! Shared CLI output helpers for consistent operator-facing text.

use std::fmt::Display;

use owo_colors::OwoColorize;
use rust_decimal::Decimal;

use crate::domain::ConfidenceState;

const RULE_WIDTH: usize = 56;

/// Print the application header with name and version.
pub fn header(version: &str) {
    println!("{} {}", "kingmaker".bold(), version.dimmed());
    println!();
}

/// Print a section header and separator.
pub fn section(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(RULE_WIDTH).dimmed());
}

/// Print a labeled value.
pub fn field(label: &str, value: impl Display) {
    println!("  {:<14} {}", label.dimmed(), value);
}

/// Print a success line.
pub fn success(message: &str) {
    println!("  {} {}", "✓".green(), message);
}

/// Print a warning line.
pub fn warning(message: &str) {
    println!("  {} {}", "⚠".yellow(), message);
}

/// Print an error line.
pub fn error(message: &str) {
    eprintln!("  {} {}", "×".red(), message);
}

/// Print a muted note.
pub fn note(message: &str) {
    println!("  {}", message.dimmed());
}

/// Format a command or path for emphasis.
pub fn highlight(value: impl Display) -> String {
    format!("{}", value.cyan())
}

/// Color a confidence label: green when usable, yellow when stale, red otherwise.
pub fn confidence(state: ConfidenceState) -> String {
    let label = state.to_string();
    match state {
        ConfidenceState::Ok => format!("{}", label.green()),
        ConfidenceState::Stale => format!("{}", label.yellow()),
        ConfidenceState::MissingInput | ConfidenceState::NoValidStates => {
            format!("{}", label.red())
        }
    }
}

/// Render an optional decimal, `-` when absent.
pub fn decimal(value: Option<Decimal>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
