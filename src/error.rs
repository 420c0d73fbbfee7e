//! Error types for bias scoring.

use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a run.
///
/// Missing or malformed *individual* records never surface here; the engines
/// skip them and keep going. Only absent tables, tables of the wrong shape and
/// invalid configuration are fatal.
#[derive(Debug, Error)]
pub enum BiasError {
    #[error("Missing {table} table at {}", path.display())]
    MissingRecord { table: String, path: PathBuf },

    #[error("Malformed {table} table: {reason}")]
    MalformedTable { table: String, reason: String },

    #[error("Invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),
}

impl BiasError {
    pub fn missing(table: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        BiasError::MissingRecord {
            table: table.into(),
            path: path.into(),
        }
    }

    pub fn malformed(table: impl Into<String>, reason: impl Into<String>) -> Self {
        BiasError::MalformedTable {
            table: table.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = BiasError> = std::result::Result<T, E>;
