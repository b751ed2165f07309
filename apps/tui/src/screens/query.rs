//! Query screen for one pipeline: question input, answer, and logs.

use crossterm::event::KeyCode;
use ragdeck_core::{QueryClient, QueryPhase};
use ragdeck_shared::Pipeline;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use super::Action;

pub(crate) struct QueryScreen {
    pipeline: Pipeline,
    editing: bool,
}

impl QueryScreen {
    pub(crate) fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            editing: false,
        }
    }

    pub(crate) fn pipeline(&self) -> Pipeline {
        self.pipeline
    }

    pub(crate) fn is_editing(&self) -> bool {
        self.editing
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect, panel: Option<&QueryClient>) {
        let Some(panel) = panel else {
            let unmounted = Paragraph::new(format!(
                "The {} panel is unmounted.\n\nPress 'u' to mount a fresh one.",
                self.pipeline.label()
            ))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
            f.render_widget(unmounted, area);
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3),      // Question
                Constraint::Percentage(50), // Answer
                Constraint::Min(3),         // Logs
                Constraint::Length(1),      // Hint
            ])
            .split(area);

        let question_style = if self.editing {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::Cyan)
        };
        let question = if self.editing {
            format!("{}▏", panel.question())
        } else {
            panel.question().to_string()
        };
        let question = Paragraph::new(question).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Question ")
                .border_style(question_style),
        );
        f.render_widget(question, chunks[0]);

        let (answer, answer_style) = match (panel.phase(), panel.notice()) {
            (QueryPhase::Asking, _) if panel.answer().is_empty() => {
                ("Asking…".to_string(), Style::default().fg(Color::Yellow))
            }
            (_, Some(notice)) if panel.answer().is_empty() => {
                (notice.to_string(), Style::default().fg(Color::Red))
            }
            _ => (panel.answer().to_string(), Style::default()),
        };
        let answer_title = match (panel.phase(), panel.notice()) {
            (QueryPhase::Asking, _) => " Answer (asking…) ".to_string(),
            (_, Some(notice)) => format!(" Answer ({}) ", notice.kind),
            _ => " Answer ".to_string(),
        };
        let answer = Paragraph::new(answer)
            .style(answer_style)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title(answer_title));
        f.render_widget(answer, chunks[1]);

        let logs: Vec<Line> = panel.logs().iter().map(|l| Line::from(l.as_str())).collect();
        let logs = Paragraph::new(logs)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title(" Logs "));
        f.render_widget(logs, chunks[2]);

        let hint = if self.editing {
            "Type your question · Enter to ask · Esc to stop editing"
        } else {
            "e edit question · Enter ask · u unmount panel"
        };
        let hint = Paragraph::new(hint)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        f.render_widget(hint, chunks[3]);
    }

    /// `question` is the mounted panel's current question, or `None` when
    /// the panel is unmounted.
    pub(crate) fn handle_key(&mut self, code: KeyCode, question: Option<&str>) -> Option<Action> {
        let Some(question) = question else {
            self.editing = false;
            return (code == KeyCode::Char('u')).then_some(Action::TogglePanel(self.pipeline));
        };

        if self.editing {
            return match code {
                KeyCode::Esc => {
                    self.editing = false;
                    None
                }
                KeyCode::Enter => {
                    self.editing = false;
                    Some(Action::Ask(self.pipeline))
                }
                KeyCode::Backspace => {
                    let mut text = question.to_string();
                    text.pop();
                    Some(Action::SetQuestion(self.pipeline, text))
                }
                KeyCode::Char(c) => {
                    Some(Action::SetQuestion(self.pipeline, format!("{question}{c}")))
                }
                _ => None,
            };
        }

        match code {
            KeyCode::Char('e') | KeyCode::Char('i') => {
                self.editing = true;
                None
            }
            KeyCode::Enter => Some(Action::Ask(self.pipeline)),
            KeyCode::Char('u') => Some(Action::TogglePanel(self.pipeline)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_mirrors_question() {
        let mut screen = QueryScreen::new(Pipeline::Haystack);
        screen.handle_key(KeyCode::Char('e'), Some(""));
        assert!(screen.is_editing());

        let action = screen.handle_key(KeyCode::Char('?'), Some("why"));
        assert_eq!(action, Some(Action::SetQuestion(Pipeline::Haystack, "why?".into())));

        let action = screen.handle_key(KeyCode::Backspace, Some("why?"));
        assert_eq!(action, Some(Action::SetQuestion(Pipeline::Haystack, "why".into())));
    }

    #[test]
    fn enter_asks_this_pipeline() {
        let mut screen = QueryScreen::new(Pipeline::LlamaIndex);
        screen.handle_key(KeyCode::Char('e'), Some(""));
        let action = screen.handle_key(KeyCode::Enter, Some("q"));
        assert_eq!(action, Some(Action::Ask(Pipeline::LlamaIndex)));
        assert!(!screen.is_editing());
    }

    #[test]
    fn unmounted_panel_only_accepts_remount() {
        let mut screen = QueryScreen::new(Pipeline::LangChain);
        assert_eq!(screen.handle_key(KeyCode::Enter, None), None);
        assert_eq!(
            screen.handle_key(KeyCode::Char('u'), None),
            Some(Action::TogglePanel(Pipeline::LangChain))
        );
    }
}
