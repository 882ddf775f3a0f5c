//! Error types shared by every shipyard crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building or validating deployment inputs.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("package is {size} bytes, exceeding the {limit} byte limit")]
    ArtifactTooLarge { size: u64, limit: u64 },

    #[error("failed to read artifact {path}: {source}")]
    ArtifactRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while loading `shipyard.toml` or the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}
