use std::path::PathBuf;
use thiserror::Error;

use crate::scanner::Category;

/// Core library errors
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Boundary root '{path}' cannot be resolved: {source}")]
    BoundaryUnresolvable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error at path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Backup of '{path}' failed: {reason}")]
    Backup { path: PathBuf, reason: String },

    #[error("Restore to '{path}' failed: {reason}")]
    Restore { path: PathBuf, reason: String },

    #[error("Path is outside the boundary root: {0}")]
    OutsideBoundary(PathBuf),

    #[error("Category '{0}' is kept for review and cannot be bulk deleted")]
    NotBulkEligible(Category),

    #[error("Backup not found: {0}")]
    BackupNotFound(String),
}

impl SweepError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn backup(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Backup {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid protection pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, SweepError>;
