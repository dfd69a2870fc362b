//! Failures of loading and validating `pilot.yaml`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("no pilot configuration found, looked for {searched:?}")]
    NotFound { searched: Vec<PathBuf> },

    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0} is not a regular file")]
    NotAFile(PathBuf),

    #[error("{path} is {size} bytes, the limit is {limit}")]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    /// The document is not YAML at all.
    #[error("{origin}: malformed YAML: {source}")]
    Syntax {
        origin: String,
        source: serde_yaml::Error,
    },

    /// Valid YAML whose keys or types do not fit [`PilotConfig`](super::PilotConfig).
    #[error("{origin}: unexpected configuration shape: {source}")]
    Schema {
        origin: String,
        source: serde_yaml::Error,
    },

    /// One field holds a value it can never take.
    #[error("{field} = {value}: {expected}")]
    OutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// Fields that are fine on their own but contradict each other.
    #[error("{section}: {reason}")]
    Inconsistent {
        section: &'static str,
        reason: String,
    },
}

impl ConfigurationError {
    pub fn out_of_range(
        field: impl Into<String>,
        value: impl std::fmt::Display,
        expected: impl Into<String>,
    ) -> Self {
        Self::OutOfRange {
            field: field.into(),
            value: value.to_string(),
            expected: expected.into(),
        }
    }

    pub fn inconsistent(section: &'static str, reason: impl Into<String>) -> Self {
        Self::Inconsistent {
            section,
            reason: reason.into(),
        }
    }

    /// Name of the offending field or section, when the error concerns a value.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::OutOfRange { field, .. } => Some(field),
            Self::Inconsistent { section, .. } => Some(section),
            _ => None,
        }
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigurationError>;
