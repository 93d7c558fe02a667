//! Configuration loading and resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments (passed in as [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML bootstrap file
//! 4. Compiled defaults
//!
//! A missing TOML file is not an error: a warning is logged and defaults are
//! used. A missing model API key IS an error, reported at startup.

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "LEADWELL_ROOT_FOLDER";
/// Environment variables holding the model API key, in priority order
pub const API_KEY_ENVS: [&str; 2] = ["OPENAI_API_KEY", "LEADWELL_OPENAI_API_KEY"];

pub const DEFAULT_DATABASE_FILE: &str = "leadwell.db";
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5740;
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Which storage implementation backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// SQLite database file in the root folder
    #[default]
    Sqlite,
    /// Process-local maps, lost on exit
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StorageBackend::Sqlite),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!(
                "unknown storage backend '{}' (expected 'sqlite' or 'memory')",
                other
            )),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Sqlite => write!(f, "sqlite"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// `[reasoning]` table: external language-model service
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReasoningConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Bootstrap configuration loaded from TOML
///
/// Every field is optional; anything absent falls through to the compiled
/// defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    /// Database file name (relative to root folder) or absolute path
    pub database_file: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub storage: Option<StorageBackend>,
    pub seed_reference_data: Option<bool>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub reasoning: ReasoningConfig,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub root_folder: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub storage: Option<StorageBackend>,
    pub log_level: Option<String>,
}

/// Fully resolved model client settings
#[derive(Debug, Clone)]
pub struct ReasoningSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub database_path: PathBuf,
    pub bind_address: String,
    pub port: u16,
    pub storage: StorageBackend,
    pub log_level: String,
    pub seed_reference_data: bool,
    pub reasoning: ReasoningSettings,
}

impl ServiceConfig {
    /// Resolve the bootstrap settings from CLI overrides and a loaded TOML file
    ///
    /// Fails when no model API key can be found.
    pub fn resolve(overrides: &ConfigOverrides, toml: &TomlConfig) -> Result<Self> {
        let root_folder = resolve_root_folder(overrides.root_folder.as_deref(), toml);

        let database_path = match &toml.database_file {
            Some(file) if file.is_absolute() => file.clone(),
            Some(file) => root_folder.join(file),
            None => root_folder.join(DEFAULT_DATABASE_FILE),
        };

        let api_key = resolve_api_key(toml)?;

        Ok(Self {
            database_path,
            root_folder,
            bind_address: overrides
                .bind_address
                .clone()
                .or_else(|| toml.bind_address.clone())
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            port: overrides.port.or(toml.port).unwrap_or(DEFAULT_PORT),
            storage: overrides.storage.or(toml.storage).unwrap_or_default(),
            log_level: overrides
                .log_level
                .clone()
                .unwrap_or_else(|| toml.logging.level.clone()),
            seed_reference_data: toml.seed_reference_data.unwrap_or(true),
            reasoning: ReasoningSettings {
                api_key,
                model: toml
                    .reasoning
                    .model
                    .clone()
                    .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                base_url: toml
                    .reasoning
                    .base_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                timeout: Duration::from_secs(
                    toml.reasoning.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
                ),
            },
        })
    }

    /// `host:port` string for the listener
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Default TOML location: `<config_dir>/leadwell/leadwell.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("leadwell").join("leadwell.toml"))
}

/// Load the TOML bootstrap file
///
/// A missing file yields defaults with a warning; a file that exists but does
/// not parse is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file not found: {} (using defaults)",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    info!("Loaded config file: {}", path.display());
    Ok(config)
}

/// Root folder resolution: CLI → environment → TOML → OS default
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("leadwell"))
        .unwrap_or_else(|| PathBuf::from("./leadwell_data"))
}

/// Create the root folder if it does not exist yet
pub fn ensure_root_folder(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
        info!("Created root folder: {}", path.display());
    }
    Ok(())
}

/// Resolve the model API key from environment → TOML
///
/// No key anywhere is a configuration error; the service must not start with
/// AI features silently degraded.
pub fn resolve_api_key(toml: &TomlConfig) -> Result<String> {
    let mut candidates: Vec<(String, String)> = Vec::new();

    for name in API_KEY_ENVS {
        if let Ok(key) = std::env::var(name) {
            if is_valid_key(&key) {
                candidates.push((format!("environment ({})", name), key));
            }
        }
    }

    if let Some(key) = &toml.reasoning.api_key {
        if is_valid_key(key) {
            candidates.push(("TOML".to_string(), key.clone()));
        }
    }

    if candidates.len() > 1 {
        let sources: Vec<&str> = candidates.iter().map(|(s, _)| s.as_str()).collect();
        warn!(
            "Model API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    match candidates.into_iter().next() {
        Some((source, key)) => {
            info!("Model API key loaded from {}", source);
            Ok(key.trim().to_string())
        }
        None => Err(Error::Config(
            "Model API key not configured. Please configure using one of:\n\
             1. Environment: OPENAI_API_KEY=your-key-here\n\
             2. TOML config: ~/.config/leadwell/leadwell.toml ([reasoning] api_key = \"your-key\")"
                .to_string(),
        )),
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
