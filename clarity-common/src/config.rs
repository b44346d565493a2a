//! Bootstrap configuration loading and config file resolution
//!
//! Each service reads one TOML file at startup. Shared keys (bind address,
//! logging, upstream credentials) live at the top level; module-specific
//! tuning lives in a named table read through [`TomlConfig::section`].
//!
//! A missing file is never fatal: the service logs a warning and starts on
//! compiled defaults.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Directory name under the platform config dir
const CONFIG_DIR_NAME: &str = "clarityforge";

/// System-wide config directory (Linux)
const SYSTEM_CONFIG_DIR: &str = "/etc/clarityforge";

/// Bootstrap configuration loaded from TOML file
///
/// These settings cannot change during runtime.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Bind host (e.g. "127.0.0.1")
    #[serde(default)]
    pub host: Option<String>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Hosted inference API token
    #[serde(default)]
    pub huggingface_api_token: Option<String>,

    /// Hosted inference API base URL override
    #[serde(default)]
    pub huggingface_api_url: Option<String>,

    /// Error monitoring endpoint
    #[serde(default)]
    pub monitoring: Option<EndpointConfig>,

    /// Issue tracker endpoint
    #[serde(default)]
    pub issue_tracker: Option<EndpointConfig>,

    /// Module-specific tables (e.g. `[ai_engine]`)
    #[serde(flatten)]
    pub sections: toml::Table,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
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
    "info".to_string()
}

/// URL + bearer token pair for an outbound side channel
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct EndpointConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl TomlConfig {
    /// Deserialize a module-specific table, falling back to `T::default()`
    /// when the table is absent
    pub fn section<T>(&self, name: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        match self.sections.get(name) {
            None => Ok(T::default()),
            Some(value) => value
                .clone()
                .try_into()
                .map_err(|e| Error::Config(format!("Invalid [{}] section: {}", name, e))),
        }
    }
}

/// Locate the config file
///
/// **Priority:**
/// 1. Command-line argument
/// 2. Environment variable
/// 3. Per-user config dir (`~/.config/clarityforge/<file_name>`), if present
/// 4. System config dir (`/etc/clarityforge/<file_name>`), if present
///
/// Returns `None` when nothing is found; callers then run on defaults.
pub fn resolve_config_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    file_name: &str,
) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(file_name));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = Path::new(SYSTEM_CONFIG_DIR).join(file_name);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the config file if one exists, otherwise compiled defaults
///
/// A missing file is a warning; a file that exists but does not parse is an
/// error.
pub fn load_or_default(path: Option<&Path>) -> Result<TomlConfig> {
    match path {
        Some(path) if path.exists() => {
            let config = load_toml_config(path)?;
            info!("Loaded configuration from {}", path.display());
            Ok(config)
        }
        Some(path) => {
            warn!(
                "Config file {} not found, using compiled defaults",
                path.display()
            );
            Ok(TomlConfig::default())
        }
        None => {
            info!("No config file found, using compiled defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Standard User-Agent for outbound HTTP clients
pub fn get_user_agent() -> String {
    format!(
        "ClarityForge/{} (+https://github.com/clarityforge/clarityforge)",
        env!("CARGO_PKG_VERSION")
    )
}
