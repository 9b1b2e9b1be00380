//! TOML-based configuration for the warehouse tools.
//!
//! Example configuration:
//! ```toml
//! [warehouse]
//! catalog = "${UBMOD_HOME}/config/datawarehouse.json"
//! debug = false
//! verify_syntax = true
//!
//! [logging]
//! level = "info"
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::navigator::NavigatorOptions;

static ENV_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]*)\}|\$(\w+)").unwrap());

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "UBMOD_DW_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("No catalog configured; set [warehouse] catalog")]
    NoCatalog,
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub warehouse: WarehouseSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WarehouseSettings {
    /// Catalog definition file (`.json` or `.toml`); env vars are expanded.
    pub catalog: Option<String>,
    pub debug: bool,
    pub verify_syntax: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    /// Load settings from the default locations.
    ///
    /// Order: `$UBMOD_DW_CONFIG`, `./ubmod-dw.toml`,
    /// `<config dir>/ubmod-dw/config.toml`, then built-in defaults.
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var(CONFIG_ENV) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("ubmod-dw.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("ubmod-dw").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// The catalog file with environment variables expanded.
    pub fn catalog_path(&self) -> Result<PathBuf, SettingsError> {
        let raw = self
            .warehouse
            .catalog
            .as_deref()
            .ok_or(SettingsError::NoCatalog)?;
        Ok(PathBuf::from(expand_env_vars(raw)?))
    }

    pub fn navigator_options(&self) -> NavigatorOptions {
        NavigatorOptions {
            debug: self.warehouse.debug,
            verify_syntax: self.warehouse.verify_syntax,
        }
    }
}

/// Expand `${VAR}` and `$VAR` references. A `$` not followed by a name is
/// kept as is.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut last = 0;

    for caps in ENV_REFERENCE.captures_iter(s) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1).or_else(|| caps.get(2))) else {
            continue;
        };
        let value = env::var(name.as_str())
            .map_err(|_| SettingsError::MissingEnvVar(name.as_str().to_string()))?;
        result.push_str(&s[last..whole.start()]);
        result.push_str(&value);
        last = whole.end();
    }
    result.push_str(&s[last..]);

    Ok(result)
}
