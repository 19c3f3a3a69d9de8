//! Error types for facesync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading or saving the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, with the path that was being touched.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the file path.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The file parsed but holds values the sync cannot run with.
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
