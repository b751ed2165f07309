//! ragdeck TUI: configuration form, build logs, and one query panel per
//! pipeline, built with `ratatui` + `crossterm`.

mod app;
mod screens;
mod widgets;

use std::fs::OpenOptions;
use std::sync::Mutex;

use color_eyre::eyre::Result;
use ragdeck_shared::{AppConfig, config_dir, load_config};

/// Environment override for the backend base URL.
const BACKEND_URL_ENV: &str = "RAGDECK_BACKEND_URL";

/// Log file name inside the settings directory.
const LOG_FILE: &str = "ragdeck-tui.log";

fn main() -> Result<()> {
    color_eyre::install()?;
    init_logging()?;
    let settings = resolve_settings()?;

    // Requests run on the runtime's workers while this thread drives the UI.
    let runtime = tokio::runtime::Runtime::new()?;
    let _guard = runtime.enter();
    app::run(&settings)
}

fn resolve_settings() -> Result<AppConfig> {
    let mut settings = load_config()?;
    if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
        settings.backend.base_url = url;
    }
    Ok(settings)
}

/// Log to a file; the terminal belongs to the UI.
fn init_logging() -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt};

    let dir = config_dir()?;
    std::fs::create_dir_all(&dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE))?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ragdeck=info"));

    fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}
