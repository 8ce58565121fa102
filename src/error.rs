//! Unified error hierarchy for runcoach
//!
//! The numeric core is total and never fails; errors come from the edges:
//! reading the training store, loading configuration, and invalid date ranges.

use std::path::PathBuf;
use thiserror::Error;

pub use crate::pmc::PmcError;

/// Top-level error type for all runcoach operations
#[derive(Debug, Error)]
pub enum CoachError {
    /// Training store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Fitness series errors
    #[error("Calculation error: {0}")]
    Pmc(#[from] PmcError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while reading from or writing to the training store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Stored value could not be mapped back to a model
    #[error("Invalid stored value in {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// Record not found
    #[error("Record not found: {table}.{id}")]
    NotFound { table: String, id: String },
}

/// Configuration file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Result type alias for runcoach operations
pub type Result<T> = std::result::Result<T, CoachError>;

impl CoachError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            CoachError::Store(StoreError::Sqlite(rusqlite::Error::SqliteFailure(err, _))) => {
                matches!(
                    err.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                )
            }
            CoachError::Io(_) => true,
            _ => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CoachError::Store(StoreError::NotFound { .. }) => ErrorSeverity::Warning,
            CoachError::Pmc(_) => ErrorSeverity::Warning,
            CoachError::Configuration(ConfigError::UnknownKey(_))
            | CoachError::Configuration(ConfigError::InvalidValue { .. }) => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            CoachError::Store(StoreError::Sqlite(_)) => {
                "Unable to read training data. Please check the database path.".to_string()
            }
            CoachError::Store(StoreError::NotFound { table, id }) => {
                format!("No {} found with id {}", table.trim_end_matches('s'), id)
            }
            CoachError::Configuration(ConfigError::Read { path, .. }) => {
                format!("Could not read configuration file: {}", path.display())
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}
