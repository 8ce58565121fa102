use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::insights::InsightConfig;
use crate::logging::LogConfig;
use crate::pmc::PmcConfig;

/// Main application configuration
///
/// Every section is optional in the TOML file; missing sections take their
/// defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General application settings
    pub settings: AppSettings,

    /// Performance Management Chart windows
    pub pmc: PmcConfig,

    /// Insight rule thresholds
    pub insights: InsightConfig,

    /// Logging output
    pub logging: LogConfig,
}

/// General application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// SQLite training log
    pub database_path: PathBuf,

    /// Athlete used when `--athlete` is not given
    pub default_athlete_id: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            database_path: AppConfig::config_dir().join("training.db"),
            default_athlete_id: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to TOML file, creating the parent directory
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }

        let toml_content = toml::to_string_pretty(self)?;
        fs::write(path, toml_content).map_err(write_error)?;

        Ok(())
    }

    /// Directory holding the config file and default database
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".runcoach")
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration, falling back to defaults when the file does not exist
    ///
    /// A file that exists but cannot be parsed is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Look up a value by dotted key, e.g. `pmc.ctl.window_days`
    pub fn get(&self, key: &str) -> Result<String, ConfigError> {
        let root = toml::Value::try_from(self)?;
        let value = key
            .split('.')
            .try_fold(&root, |value, part| value.get(part))
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

        Ok(match value {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Set a value by dotted key
    ///
    /// `raw` is read as a TOML literal when it parses as one and as a plain
    /// string otherwise. The updated tree must still deserialize, so values of
    /// the wrong type are rejected and the config is left untouched.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<(), ConfigError> {
        let mut root = toml::Value::try_from(&*self)?;
        let (parents, leaf) = match key.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, key),
        };

        let mut table = root
            .as_table_mut()
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        for part in parents.into_iter().flat_map(|p| p.split('.')) {
            table = table
                .get_mut(part)
                .and_then(toml::Value::as_table_mut)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }
        if table.get(leaf).is_some_and(toml::Value::is_table) {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }
        table.insert(leaf.to_string(), parse_value(raw));

        let updated: AppConfig = root.try_into().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        })?;

        // Unknown leaves are silently dropped on deserialize
        updated.get(key)?;

        *self = updated;
        Ok(())
    }
}

fn parse_value(raw: &str) -> toml::Value {
    toml::from_str::<toml::Table>(&format!("value = {}", raw))
        .ok()
        .and_then(|mut table| table.remove("value"))
        .unwrap_or_else(|| toml::Value::String(raw.to_string()))
}
