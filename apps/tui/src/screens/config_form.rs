//! "Config" screen: the configuration tree as a form grouped by section.

use crossterm::event::KeyCode;
use ragdeck_core::{ConfigStore, LoadState, SaveStatus};
use ragdeck_shared::{Field, FieldKind, RagConfig, RawValue, Section, Value};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use super::Action;

pub(crate) struct ConfigFormScreen {
    /// Index into `Field::ALL`.
    selected: usize,
    /// Edit buffer while a text field is open.
    buffer: Option<String>,
}

impl ConfigFormScreen {
    pub(crate) fn new() -> Self {
        Self {
            selected: 0,
            buffer: None,
        }
    }

    pub(crate) fn is_editing(&self) -> bool {
        self.buffer.is_some()
    }

    fn field(&self) -> Field {
        Field::ALL[self.selected]
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect, store: &ConfigStore) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Min(1),    // Form
                Constraint::Length(3), // Notice / save status
                Constraint::Length(1), // Hint
            ])
            .split(area);

        match store.config() {
            Some(config) => {
                let form = self.form(config, store.is_dirty());
                let mut state = ListState::default().with_selected(Some(row_of(self.field())));
                f.render_stateful_widget(form, chunks[0], &mut state);
            }
            None => {
                let text = match (store.load_state(), store.notice()) {
                    (LoadState::Loading, _) => "Loading…".to_string(),
                    (_, Some(notice)) => format!("Could not load configuration.\n\n{notice}"),
                    _ => "Configuration not loaded. Press 'r' to load.".to_string(),
                };
                let placeholder = Paragraph::new(text)
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true })
                    .block(Block::default().borders(Borders::ALL).title(" Configuration "));
                f.render_widget(placeholder, chunks[0]);
            }
        }

        let (status, style) = match (store.notice(), store.save_status()) {
            (Some(notice), _) => (notice.to_string(), Style::default().fg(Color::Red)),
            (None, SaveStatus::Saving) => ("Saving…".to_string(), Style::default()),
            (None, SaveStatus::Saved { at }) => (
                format!("Saved at {}", at.format("%H:%M:%S")),
                Style::default().fg(Color::Green),
            ),
            (None, _) => (String::new(), Style::default()),
        };
        let status = Paragraph::new(status)
            .style(style)
            .block(Block::default().borders(Borders::ALL).title(" Status "));
        f.render_widget(status, chunks[1]);

        let hint = if self.is_editing() {
            let field = self.field();
            format!(
                "Editing {field} ({}) · Enter to apply · Esc to cancel",
                kind_hint(field.kind())
            )
        } else {
            "↑/↓ select · Enter edit · Space toggle · s save · r reload".to_string()
        };
        let hint = Paragraph::new(hint)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        f.render_widget(hint, chunks[2]);
    }

    fn form(&self, config: &RagConfig, dirty: bool) -> List<'_> {
        let mut items = Vec::new();
        for section in Section::ALL {
            items.push(
                ListItem::new(section.title())
                    .style(Style::default().add_modifier(Modifier::BOLD)),
            );
            for field in section.fields() {
                let is_selected = field == self.field();
                let value = match (&self.buffer, is_selected) {
                    (Some(buffer), true) => format!("{buffer}▏"),
                    _ => display_value(&config.get(field)),
                };
                let prefix = if is_selected { "▸ " } else { "  " };
                let style = if is_selected && self.is_editing() {
                    Style::default().fg(Color::Yellow)
                } else if is_selected {
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                items.push(
                    ListItem::new(format!("{prefix}{:<20} {value}", field.spec().label))
                        .style(style),
                );
            }
        }

        let title = if dirty {
            " Configuration (unsaved changes) "
        } else {
            " Configuration "
        };
        List::new(items).block(Block::default().borders(Borders::ALL).title(title))
    }

    pub(crate) fn handle_key(
        &mut self,
        code: KeyCode,
        config: Option<&RagConfig>,
    ) -> Option<Action> {
        if let Some(buffer) = self.buffer.as_mut() {
            match code {
                KeyCode::Esc => self.buffer = None,
                KeyCode::Backspace => {
                    buffer.pop();
                }
                KeyCode::Char(c) => buffer.push(c),
                KeyCode::Enter => {
                    let raw = self.buffer.take().unwrap_or_default();
                    return Some(Action::Edit(self.field(), RawValue::Text(raw)));
                }
                _ => {}
            }
            return None;
        }

        match code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < Field::ALL.len() {
                    self.selected += 1;
                }
                None
            }
            KeyCode::Char('s') => Some(Action::SaveConfig),
            KeyCode::Char('r') => Some(Action::ReloadConfig),
            KeyCode::Enter | KeyCode::Char(' ') => {
                let config = config?;
                let field = self.field();
                match config.get(field) {
                    Value::Boolean(current) => {
                        Some(Action::Edit(field, RawValue::Checked(!current)))
                    }
                    _ if code == KeyCode::Enter => {
                        self.buffer = Some(config.get(field).to_string());
                        None
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// List row of `field`, counting one header row per section.
fn row_of(field: Field) -> usize {
    let mut row = 0;
    for section in Section::ALL {
        row += 1;
        for f in section.fields() {
            if f == field {
                return row;
            }
            row += 1;
        }
    }
    row
}

fn display_value(value: &Value) -> String {
    match value {
        Value::OptionalText(None) => "(none)".to_string(),
        Value::Boolean(true) => "[x]".to_string(),
        Value::Boolean(false) => "[ ]".to_string(),
        other => other.to_string(),
    }
}

fn kind_hint(kind: FieldKind) -> String {
    match kind {
        FieldKind::Text => "text".into(),
        FieldKind::OptionalText => "text, blank for none".into(),
        FieldKind::Integer { min } => format!("whole number ≥ {min}"),
        FieldKind::Float { min, max } => format!("number {min}–{max}"),
        FieldKind::Boolean => "checkbox".into(),
    }
}
