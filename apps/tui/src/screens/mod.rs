//! TUI screen definitions.
//!
//! Each screen corresponds to a tab. Screens keep only view state (selection,
//! edit buffers); everything they display is read from the [`Shell`], and
//! every change they want is returned as an [`Action`] for the app to apply.

mod build;
mod config_form;
mod query;

use std::fmt;

use crossterm::event::{KeyCode, KeyModifiers};
use ragdeck_core::Shell;
use ragdeck_shared::{Field, Pipeline, RawValue};
use ratatui::prelude::*;

/// Screen identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScreenId {
    Config,
    Build,
    Query(Pipeline),
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => write!(f, "Config"),
            Self::Build => write!(f, "Build"),
            Self::Query(pipeline) => write!(f, "{}", pipeline.label()),
        }
    }
}

/// An operator intent produced by a screen.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Action {
    Edit(Field, RawValue),
    SaveConfig,
    ReloadConfig,
    TriggerBuild,
    SetQuestion(Pipeline, String),
    Ask(Pipeline),
    TogglePanel(Pipeline),
}

/// Per-screen state and behaviour.
pub(crate) enum Screen {
    Config(config_form::ConfigFormScreen),
    Build(build::BuildScreen),
    Query(query::QueryScreen),
}

impl Screen {
    pub(crate) fn new(id: ScreenId) -> Self {
        match id {
            ScreenId::Config => Self::Config(config_form::ConfigFormScreen::new()),
            ScreenId::Build => Self::Build(build::BuildScreen::new()),
            ScreenId::Query(pipeline) => Self::Query(query::QueryScreen::new(pipeline)),
        }
    }

    /// Whether the current screen has an active text input field.
    pub(crate) fn is_editing(&self) -> bool {
        match self {
            Self::Config(screen) => screen.is_editing(),
            Self::Build(_) => false,
            Self::Query(screen) => screen.is_editing(),
        }
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect, shell: &Shell) {
        match self {
            Self::Config(screen) => screen.draw(f, area, shell.config()),
            Self::Build(screen) => screen.draw(f, area, shell.build()),
            Self::Query(screen) => screen.draw(f, area, shell.panel(screen.pipeline())),
        }
    }

    pub(crate) fn handle_key(
        &mut self,
        code: KeyCode,
        _modifiers: KeyModifiers,
        shell: &Shell,
    ) -> Option<Action> {
        match self {
            Self::Config(screen) => screen.handle_key(code, shell.config().config()),
            Self::Build(screen) => screen.handle_key(code),
            Self::Query(screen) => {
                let panel = shell.panel(screen.pipeline());
                screen.handle_key(code, panel.map(|p| p.question()))
            }
        }
    }
}
