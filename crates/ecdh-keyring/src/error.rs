//! Error types for the key registry.

use std::io;
use std::path::PathBuf;

use ecdh_keyring_core::ExchangeError;
use ecdh_keyring_source::SourceError;
use thiserror::Error;

/// Errors reported to registry callers.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The key list could not be obtained. Fatal to the load attempt.
    #[error("failed to load {protocol} key list: {source}")]
    Load {
        protocol: String,
        source: SourceError,
    },

    /// No key with this identifier.
    #[error("key not found: {0:?}")]
    KeyNotFound(String),

    /// A key with this identifier is already registered.
    #[error("key already exists: {0:?}")]
    KeyExists(String),

    /// Building the key-exchange context failed.
    #[error("failed to initialize key {key_id:?}: {source}")]
    Init {
        key_id: String,
        source: ExchangeError,
    },

    /// The key exists but derivation with the peer key failed.
    #[error("key derivation with key {key_id:?} failed: {source}")]
    Derive {
        key_id: String,
        source: ExchangeError,
    },
}

/// Why a single key definition was skipped.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("malformed entry: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("curve is empty")]
    EmptyCurve,

    #[error("private key path is empty")]
    EmptyPrivateKey,

    #[error("failed to read private key file {}: {source}", path.display())]
    ReadPrivateKey {
        path: PathBuf,
        source: io::Error,
    },

    #[error("failed to initialize key exchange from {}: {source}", path.display())]
    Init {
        path: PathBuf,
        source: ExchangeError,
    },

    #[error("curve is configured but private key is not")]
    MissingPrivateKey,

    #[error("private key is configured but curve is not")]
    MissingCurve,
}

/// A skipped key definition, with enough context to find it in the
/// configuration.
#[derive(Debug, Error)]
#[error("{protocol} {}: {error}", key_label(.key_id))]
pub struct EntryFailure {
    pub protocol: String,
    pub key_id: String,
    #[source]
    pub error: EntryError,
}

fn key_label(key_id: &str) -> String {
    if key_id.is_empty() {
        "anonymous key".to_string()
    } else {
        format!("key '{key_id}'")
    }
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
