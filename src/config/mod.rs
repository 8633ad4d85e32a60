//! Engine configuration.
//!
//! Priority (highest to lowest): CLI / env flags, `{data_dir}/config.toml`,
//! built-in defaults. Only the backend coordinates and logging knobs live
//! here — everything session-related is runtime state, not configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_BACKEND_URL: &str = "https://api.clarifin.io";
const DEFAULT_SITE_URL: &str = "https://app.clarifin.io";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Data directory for the SQLite store and config file.
    pub data_dir: PathBuf,
    /// Log level filter (trace, debug, info, warn, error).
    pub log: String,
    /// Log output format: "pretty" (default) | "json".
    pub log_format: String,
    /// Base URL of the hosted identity/data service.
    pub backend_url: String,
    /// Publishable project api key for the hosted service.
    pub api_key: String,
    /// Public site URL — the landing target for verification and
    /// password-reset emails.
    pub site_url: String,
}

/// TOML override layer (`{data_dir}/config.toml`). Every field optional.
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    log: Option<String>,
    log_format: Option<String>,
    backend_url: Option<String>,
    api_key: Option<String>,
    site_url: Option<String>,
}

impl AppConfig {
    /// Build config from CLI/env args + optional TOML file.
    pub fn new(
        data_dir: Option<PathBuf>,
        log: Option<String>,
        backend_url: Option<String>,
        api_key: Option<String>,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);
        let toml = load_toml(&data_dir).unwrap_or_default();

        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());

        let log_format = std::env::var("CLARIFIN_LOG_FORMAT")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());

        let backend_url = backend_url
            .or_else(|| std::env::var("CLARIFIN_BACKEND_URL").ok().filter(|s| !s.is_empty()))
            .or(toml.backend_url)
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        let api_key = api_key
            .or_else(|| std::env::var("CLARIFIN_API_KEY").ok().filter(|s| !s.is_empty()))
            .or(toml.api_key)
            .unwrap_or_default();

        let site_url = std::env::var("CLARIFIN_SITE_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.site_url)
            .unwrap_or_else(|| DEFAULT_SITE_URL.to_string());

        Self {
            data_dir,
            log,
            log_format,
            backend_url,
            api_key,
            site_url,
        }
    }
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let raw = std::fs::read_to_string(data_dir.join("config.toml")).ok()?;
    match toml::from_str(&raw) {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("warn: ignoring malformed config.toml: {e}");
            None
        }
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("clarifin");
        }
    }
    #[cfg(target_os = "linux")]
    {
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("clarifin");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("clarifin");
        }
    }
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("clarifin");
        }
    }
    PathBuf::from(".clarifin")
}
