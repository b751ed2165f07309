//! CLI command definitions, routing, and tracing setup.

use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use ragdeck_client::HttpBackend;
use ragdeck_core::{BuildOrchestrator, ConfigStore, Disposition, Notice, QueryClient};
use ragdeck_shared::{AppConfig, Field, FieldKind, Pipeline, Section, init_config, load_config};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ragdeck: drive a RAG demo backend from the terminal.
#[derive(Parser)]
#[command(
    name = "ragdeck",
    version,
    about = "Edit a RAG backend's configuration, build its pipelines, and query them.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Backend base URL (overrides the settings file).
    #[arg(long, env = "RAGDECK_BACKEND_URL", global = true)]
    pub backend: Option<String>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Read or edit the backend configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Build every pipeline and print the logs.
    Build,

    /// Ask one pipeline a question.
    Ask {
        /// langchain, llamaindex, or haystack.
        pipeline: Pipeline,

        /// The question text.
        question: String,
    },

    /// List editable configuration fields.
    Fields,

    /// Write the default local settings file.
    Init,

    /// Show the resolved local settings.
    Settings,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Print the whole tree as JSON.
    Show,
    /// Print one field, addressed as `section.key`.
    Get { field: String },
    /// Change one field and save the tree.
    Set { field: String, value: String },
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "ragdeck=warn",
        1 => "ragdeck=info",
        2 => "ragdeck=debug",
        _ => "ragdeck=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Config { action } => {
            let backend = connect(cli.backend.as_deref())?;
            match action {
                ConfigAction::Show => cmd_config_show(&backend).await,
                ConfigAction::Get { field } => cmd_config_get(&backend, &field).await,
                ConfigAction::Set { field, value } => {
                    cmd_config_set(&backend, &field, value).await
                }
            }
        }
        Command::Build => cmd_build(&connect(cli.backend.as_deref())?).await,
        Command::Ask { pipeline, question } => {
            cmd_ask(&connect(cli.backend.as_deref())?, pipeline, question).await
        }
        Command::Fields => cmd_fields(),
        Command::Init => cmd_init(),
        Command::Settings => cmd_settings(cli.backend.as_deref()),
    }
}

/// Resolve local settings, applying the `--backend` override.
fn resolve_settings(backend_override: Option<&str>) -> Result<AppConfig> {
    let mut settings = load_config()?;
    if let Some(url) = backend_override {
        settings.backend.base_url = url.to_string();
    }
    Ok(settings)
}

fn connect(backend_override: Option<&str>) -> Result<HttpBackend> {
    let settings = resolve_settings(backend_override)?;
    Ok(HttpBackend::new(&settings)?)
}

fn parse_field(path: &str) -> Result<Field> {
    Field::from_path(path).ok_or_else(|| {
        eyre!("unknown field '{path}': run `ragdeck fields` to list valid names")
    })
}

fn fail(notice: Option<&Notice>) -> Result<()> {
    match notice {
        Some(notice) => Err(eyre!("{notice}")),
        None => Ok(()),
    }
}

async fn load_store(backend: &HttpBackend) -> Result<ConfigStore> {
    let mut store = ConfigStore::new();
    let spinner = spinner("Loading configuration");
    let outcome = store.load(backend).await;
    spinner.finish_and_clear();

    store.apply_load(outcome);
    fail(store.notice())?;
    Ok(store)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_config_show(backend: &HttpBackend) -> Result<()> {
    let store = load_store(backend).await?;
    let config = store.config().ok_or_else(|| eyre!("configuration not loaded"))?;
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

async fn cmd_config_get(backend: &HttpBackend, path: &str) -> Result<()> {
    let field = parse_field(path)?;
    let store = load_store(backend).await?;
    let value = store
        .value(field)
        .ok_or_else(|| eyre!("configuration not loaded"))?;
    println!("{value}");
    Ok(())
}

async fn cmd_config_set(backend: &HttpBackend, path: &str, raw: String) -> Result<()> {
    let field = parse_field(path)?;
    let mut store = load_store(backend).await?;

    store.update(field, raw)?;
    if !store.is_dirty() {
        println!("{field} unchanged");
        return Ok(());
    }

    info!(%field, "saving configuration");
    let spinner = spinner("Saving configuration");
    let outcome = store.save(backend)?.await;
    spinner.finish_and_clear();

    store.apply_save(outcome);
    fail(store.notice())?;

    if let Some(value) = store.value(field) {
        println!("{field} = {value}");
    }
    Ok(())
}

async fn cmd_build(backend: &HttpBackend) -> Result<()> {
    let mut orchestrator = BuildOrchestrator::new();
    let spinner = spinner("Building pipelines");
    let outcome = orchestrator.trigger(backend).await;
    spinner.finish_and_clear();

    if orchestrator.apply(outcome) != Disposition::Applied {
        return Err(eyre!("build response was discarded"));
    }
    fail(orchestrator.notice())?;

    if orchestrator.logs().is_empty() {
        println!("Build finished with no pipeline logs.");
        return Ok(());
    }
    for (pipeline, lines) in orchestrator.logs() {
        println!("[{pipeline}]");
        for line in lines {
            println!("  {line}");
        }
    }
    Ok(())
}

async fn cmd_ask(backend: &HttpBackend, pipeline: Pipeline, question: String) -> Result<()> {
    let mut panel = QueryClient::new(pipeline);
    panel.set_question(question);

    let pending = panel.ask(backend)?;
    let spinner = spinner(&format!("Asking {}", pipeline.label()));
    let outcome = pending.await;
    spinner.finish_and_clear();

    panel.apply(outcome);
    fail(panel.notice())?;

    println!("{}", panel.answer());
    if !panel.logs().is_empty() {
        println!();
        println!("Logs:");
        for line in panel.logs() {
            println!("  {line}");
        }
    }
    Ok(())
}

fn cmd_fields() -> Result<()> {
    for section in Section::ALL {
        println!("{}", section.title());
        for field in section.fields() {
            let spec = field.spec();
            println!("  {:<34} {:<20} {}", field.path(), spec.label, describe(spec.kind));
        }
    }
    Ok(())
}

fn cmd_init() -> Result<()> {
    let path = init_config()?;
    println!("Settings initialized at: {}", path.display());
    Ok(())
}

fn cmd_settings(backend_override: Option<&str>) -> Result<()> {
    let settings = resolve_settings(backend_override)?;
    println!("{}", toml::to_string_pretty(&settings)?);
    Ok(())
}

fn describe(kind: FieldKind) -> String {
    match kind {
        FieldKind::Text => "text".into(),
        FieldKind::OptionalText => "text, blank clears".into(),
        FieldKind::Integer { min } => format!("integer >= {min}"),
        FieldKind::Float { min, max } => format!("number {min}..={max}"),
        FieldKind::Boolean => "true/false".into(),
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// A steady-ticking spinner for one in-flight request.
fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(
            style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}
