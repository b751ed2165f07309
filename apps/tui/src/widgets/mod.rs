//! Reusable TUI widgets.

use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Bottom status bar. Failures are shown in red.
pub(crate) fn status_bar(msg: &str, is_error: bool) -> Paragraph<'_> {
    let bg = if is_error { Color::Red } else { Color::DarkGray };
    Paragraph::new(format!(" {msg}")).style(Style::default().bg(bg).fg(Color::White))
}
