//! Error types for key definition sources.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while obtaining key definitions or settings.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The key-list file could not be read.
    #[error("failed to read key list {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The key-list file is not a JSON object.
    #[error("failed to parse key list {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The configuration backend failed to build.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Result type for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;
