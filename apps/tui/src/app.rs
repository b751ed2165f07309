//! Core TUI application state and event loop.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ragdeck_client::HttpBackend;
use ragdeck_core::{Disposition, Shell, ShellEvent};
use ragdeck_shared::{AppConfig, Pipeline};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Tabs};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

use crate::screens::{Action, Screen, ScreenId};
use crate::widgets::status_bar;

/// Application state.
pub(crate) struct App {
    /// Currently active screen tab.
    pub active_tab: usize,
    /// Available screens.
    pub screens: Vec<ScreenId>,
    /// Whether the app should quit.
    pub should_quit: bool,
    /// Status message shown in bottom bar.
    pub status: String,
    /// Whether the status message reports a failure.
    pub status_is_error: bool,
    /// Whether help overlay is visible.
    pub show_help: bool,
    /// Per-screen state.
    pub screen_states: Vec<Screen>,
    shell: Shell,
    events: UnboundedReceiver<ShellEvent>,
}

impl App {
    pub(crate) fn new(shell: Shell, events: UnboundedReceiver<ShellEvent>) -> Self {
        let screens: Vec<ScreenId> = [ScreenId::Config, ScreenId::Build]
            .into_iter()
            .chain(Pipeline::ALL.into_iter().map(ScreenId::Query))
            .collect();
        let screen_states = screens.iter().map(|s| Screen::new(*s)).collect();

        Self {
            active_tab: 0,
            screens,
            should_quit: false,
            status: "Ready · press ? for help".to_string(),
            status_is_error: false,
            show_help: false,
            screen_states,
            shell,
            events,
        }
    }

    fn current_screen(&self) -> &Screen {
        &self.screen_states[self.active_tab]
    }

    fn set_status(&mut self, msg: impl Into<String>, is_error: bool) {
        self.status = msg.into();
        self.status_is_error = is_error;
    }

    /// Apply an operator intent to the shell.
    fn apply(&mut self, action: Action) {
        let result = match action {
            Action::Edit(field, raw) => self
                .shell
                .edit_config(field, raw)
                .map(|()| Some(format!("{field} updated"))),
            Action::SaveConfig => self
                .shell
                .save_config()
                .map(|()| Some("Saving configuration…".to_string())),
            Action::ReloadConfig => {
                self.shell.reload_config();
                Ok(Some("Reloading configuration…".to_string()))
            }
            Action::TriggerBuild => {
                self.shell.trigger_build();
                Ok(Some("Build started".to_string()))
            }
            Action::SetQuestion(pipeline, question) => {
                self.shell.set_question(pipeline, question).map(|()| None)
            }
            Action::Ask(pipeline) => self
                .shell
                .ask(pipeline)
                .map(|()| Some(format!("Asking {}…", pipeline.label()))),
            Action::TogglePanel(pipeline) => {
                if self.shell.panel(pipeline).is_some() {
                    self.shell.unmount_panel(pipeline);
                    Ok(Some(format!("{} panel unmounted", pipeline.label())))
                } else {
                    self.shell.mount_panel(pipeline);
                    Ok(Some(format!("{} panel mounted", pipeline.label())))
                }
            }
        };

        match result {
            Ok(Some(msg)) => self.set_status(msg, false),
            Ok(None) => {}
            Err(e) => self.set_status(e.to_string(), true),
        }
    }

    /// Route every completed request to its component.
    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            let (label, pipeline) = match &event {
                ShellEvent::ConfigLoaded(_) => ("Configuration loaded".to_string(), None),
                ShellEvent::ConfigSaved(_) => ("Configuration saved".to_string(), None),
                ShellEvent::BuildFinished(_) => ("Build finished".to_string(), None),
                ShellEvent::Answered(outcome) => {
                    let pipeline = outcome.pipeline();
                    (format!("{} answered", pipeline.label()), Some(pipeline))
                }
            };
            let is_build = matches!(event, ShellEvent::BuildFinished(_));

            if self.shell.dispatch(event) != Disposition::Applied {
                continue;
            }

            let notice = match pipeline {
                Some(pipeline) => self.shell.panel(pipeline).and_then(|p| p.notice()),
                None if is_build => self.shell.build().notice(),
                None => self.shell.config().notice(),
            };
            match notice.map(|n| n.to_string()) {
                Some(notice) => self.set_status(notice, true),
                None => self.set_status(label, false),
            }
        }
    }
}

/// Entry point: sets up terminal, runs event loop, restores terminal.
pub(crate) fn run(settings: &AppConfig) -> Result<()> {
    let backend = HttpBackend::new(settings)?;
    info!(base = %backend.base_url(), "starting TUI");
    let (mut shell, events) = Shell::new(Arc::new(backend));
    shell.mount();
    let mut app = App::new(shell, events);

    // Setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let term_backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(term_backend)?;

    // Run app
    let result = run_app(
        &mut terminal,
        &mut app,
        Duration::from_millis(settings.ui.tick_ms),
    );

    // Late responses must not land once the page is gone.
    app.shell.teardown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    tick: Duration,
) -> Result<()> {
    loop {
        app.drain_events();
        terminal.draw(|f| draw(f, app))?;

        if event::poll(tick)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(app, key.code, key.modifiers);
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    let editing = app.current_screen().is_editing();

    // Global keybindings (always active)
    match code {
        KeyCode::Char('q') | KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('q') if !editing => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('?') if !editing => {
            app.show_help = !app.show_help;
            return;
        }
        KeyCode::Esc if app.show_help => {
            app.show_help = false;
            return;
        }
        // Tab navigation with number keys
        KeyCode::Char(c @ '1'..='5') if !editing => {
            let idx = (c as usize) - ('1' as usize);
            if idx < app.screens.len() {
                app.active_tab = idx;
            }
            return;
        }
        KeyCode::Tab if !editing => {
            app.active_tab = (app.active_tab + 1) % app.screens.len();
            return;
        }
        KeyCode::BackTab if !editing => {
            app.active_tab = if app.active_tab == 0 {
                app.screens.len() - 1
            } else {
                app.active_tab - 1
            };
            return;
        }
        _ => {}
    }

    // If help is showing, consume any key to dismiss
    if app.show_help {
        app.show_help = false;
        return;
    }

    // Delegate to current screen
    let screen = &mut app.screen_states[app.active_tab];
    if let Some(action) = screen.handle_key(code, modifiers, &app.shell) {
        app.apply(action);
    }
}

fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(1),    // Content
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    // Tab bar
    let tab_titles: Vec<Line> = app
        .screens
        .iter()
        .map(|s| Line::from(format!("{s}")))
        .collect();

    let tabs = Tabs::new(tab_titles)
        .block(Block::default().borders(Borders::ALL).title(" ragdeck "))
        .select(app.active_tab)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .divider(" │ ");

    f.render_widget(tabs, chunks[0]);

    // Content area: delegate to screen
    app.current_screen().draw(f, chunks[1], &app.shell);

    // Status bar
    let bar = status_bar(&app.status, app.status_is_error);
    f.render_widget(bar, chunks[2]);

    // Help overlay
    if app.show_help {
        draw_help_overlay(f);
    }
}

fn draw_help_overlay(f: &mut Frame) {
    let area = centered_rect(60, 70, f.area());

    let help_text = vec![
        Line::from("Keybindings").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from(""),
        Line::from("  1-5          Switch to tab"),
        Line::from("  Tab/S-Tab    Next/previous tab"),
        Line::from("  ?            Toggle this help"),
        Line::from("  q / Ctrl-C   Quit"),
        Line::from(""),
        Line::from("Config:").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from("  ↑/↓          Select field"),
        Line::from("  Enter        Edit field / apply edit"),
        Line::from("  Space        Toggle checkbox"),
        Line::from("  s / r        Save / reload"),
        Line::from(""),
        Line::from("Build:").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from("  Enter        Build all pipelines"),
        Line::from(""),
        Line::from("Pipelines:").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from("  e            Edit question"),
        Line::from("  Enter        Ask"),
        Line::from("  u            Unmount / mount panel"),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help · press any key to close ")
                .style(Style::default().bg(Color::DarkGray)),
        )
        .style(Style::default().fg(Color::White).bg(Color::DarkGray));

    // Clear background
    f.render_widget(ratatui::widgets::Clear, area);
    f.render_widget(help, area);
}

/// Create a centered rectangle with percentage width and height.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
