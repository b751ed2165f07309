//! "Build" screen: trigger a build and show the per-pipeline logs.

use crossterm::event::KeyCode;
use ragdeck_core::{BuildOrchestrator, BuildPhase};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use super::Action;

pub(crate) struct BuildScreen {
    scroll: u16,
}

impl BuildScreen {
    pub(crate) fn new() -> Self {
        Self { scroll: 0 }
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect, build: &BuildOrchestrator) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Status
                Constraint::Min(1),    // Logs
            ])
            .split(area);

        let (status, style) = match (build.phase(), build.notice(), build.last_built()) {
            (BuildPhase::Building, _, _) => {
                ("Building…".to_string(), Style::default().fg(Color::Yellow))
            }
            (_, Some(notice), _) => (notice.to_string(), Style::default().fg(Color::Red)),
            (_, None, Some(at)) => (
                format!("Last build finished at {}", at.format("%H:%M:%S")),
                Style::default().fg(Color::Green),
            ),
            (_, None, None) => ("Press Enter to build all pipelines.".to_string(), Style::default()),
        };
        let status = Paragraph::new(status)
            .style(style)
            .block(Block::default().borders(Borders::ALL).title(" Build "));
        f.render_widget(status, chunks[0]);

        let mut lines = Vec::new();
        for (pipeline, entries) in build.logs() {
            lines.push(
                Line::from(format!("[{pipeline}]"))
                    .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            );
            lines.extend(entries.iter().map(|l| Line::from(format!("  {l}"))));
            lines.push(Line::from(""));
        }
        if lines.is_empty() {
            lines.push(Line::from("No build logs yet.").style(Style::default().fg(Color::DarkGray)));
        }

        let logs = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0))
            .block(Block::default().borders(Borders::ALL).title(" Logs "));
        f.render_widget(logs, chunks[1]);
    }

    pub(crate) fn handle_key(&mut self, code: KeyCode) -> Option<Action> {
        match code {
            KeyCode::Enter | KeyCode::Char('b') => {
                self.scroll = 0;
                Some(Action::TriggerBuild)
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.scroll = self.scroll.saturating_sub(1);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.scroll = self.scroll.saturating_add(1);
                None
            }
            _ => None,
        }
    }
}
