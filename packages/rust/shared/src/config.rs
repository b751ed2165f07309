//! Local client settings for ragdeck.
//!
//! User settings live at `~/.ragdeck/ragdeck.toml`.
//! CLI flags override settings file values, which override defaults.
//!
//! These settings only describe how the client reaches its backend; the RAG
//! configuration tree itself lives on the backend (see [`crate::types::RagConfig`]).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{RagDeckError, Result};

/// Default settings file name.
const CONFIG_FILE_NAME: &str = "ragdeck.toml";

/// Default settings directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".ragdeck";

// ---------------------------------------------------------------------------
// Settings structs (matching ragdeck.toml schema)
// ---------------------------------------------------------------------------

/// Top-level client settings, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend connection.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Terminal UI behaviour.
    #[serde(default)]
    pub ui: UiConfig,
}

/// `[backend]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL the `/config`, `/build` and `/query` paths are joined onto.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds. Builds can be slow; keep this generous.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[ui]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Event poll interval for the TUI in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
        }
    }
}

fn default_tick_ms() -> u64 {
    100
}

// ---------------------------------------------------------------------------
// Settings loading
// ---------------------------------------------------------------------------

/// Get the path to the settings directory (`~/.ragdeck/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| RagDeckError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the settings file (`~/.ragdeck/ragdeck.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the client settings from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "settings file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the client settings from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RagDeckError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| RagDeckError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the settings directory and write a default settings file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| RagDeckError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| RagDeckError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| RagDeckError::io(&path, e))?;
    tracing::info!(?path, "created default settings file");

    Ok(path)
}

/// Parse and check the backend base URL. Only `http` and `https` are accepted.
pub fn validate_base_url(config: &AppConfig) -> Result<Url> {
    let raw = config.backend.base_url.trim();
    let url = Url::parse(raw)
        .map_err(|e| RagDeckError::config(format!("invalid backend URL '{raw}': {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(RagDeckError::config(format!(
            "unsupported backend URL scheme '{other}': expected http or https"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default settings");
        assert!(toml_str.contains("base_url"));
        assert!(toml_str.contains("http://localhost:8000"));
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let toml_str = r#"
[backend]
base_url = "https://rag.internal:9000"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.backend.base_url, "https://rag.internal:9000");
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.ui.tick_ms, 100);
    }

    #[test]
    fn load_from_file() {
        let dir = std::env::temp_dir().join(format!("ragdeck-settings-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[ui]\ntick_ms = 250\n").expect("write settings");

        let config = load_config_from(&path).expect("load");
        assert_eq!(config.ui.tick_ms, 250);
        assert_eq!(config.backend.base_url, "http://localhost:8000");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = std::env::temp_dir().join(format!("ragdeck-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[backend\nbase_url = ").expect("write settings");

        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn base_url_validation() {
        let mut config = AppConfig::default();
        assert_eq!(
            validate_base_url(&config).expect("default is valid").as_str(),
            "http://localhost:8000/"
        );

        config.backend.base_url = "ftp://example.com".into();
        let err = validate_base_url(&config).unwrap_err();
        assert!(err.to_string().contains("unsupported backend URL scheme"));

        config.backend.base_url = "not a url".into();
        assert!(validate_base_url(&config).is_err());
    }
}
