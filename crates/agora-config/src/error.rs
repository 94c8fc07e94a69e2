use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading rosters or settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A roster file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A roster file was read but is not valid YAML for its schema.
    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Layered settings could not be built or deserialized.
    #[error("Invalid settings: {0}")]
    Settings(#[from] config::ConfigError),

    /// Settings deserialized but hold values outside their allowed range.
    #[error("{0}")]
    Invalid(String),
}
