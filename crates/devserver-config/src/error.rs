use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown option: {0}")]
    UnknownOption(String),

    #[error("invalid value for {option}: expected {expected}, got {found}")]
    InvalidValue {
        option: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("missing required option: {0}")]
    Missing(&'static str),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(
        option: &'static str,
        expected: &'static str,
        found: impl ToString,
    ) -> Self {
        Self::InvalidValue {
            option,
            expected,
            found: found.to_string(),
        }
    }
}
