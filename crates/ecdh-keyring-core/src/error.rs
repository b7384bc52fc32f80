//! Error types for key-exchange contexts.

use thiserror::Error;

use crate::curve::Curve;

/// Errors that can occur while building a key-exchange context or deriving
/// a session key from it.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The curve name is not one of the supported curves.
    #[error("unsupported curve: {0:?}")]
    UnsupportedCurve(String),

    /// The private key could not be decoded for the curve.
    #[error("invalid {curve} private key: {reason}")]
    InvalidPrivateKey { curve: Curve, reason: String },

    /// The peer public key could not be decoded for the curve.
    #[error("invalid {curve} peer public key: {reason}")]
    InvalidPublicKey { curve: Curve, reason: String },

    /// Requested session key length is not 16 or 32.
    #[error("invalid session key length {0}: expected 16 or 32")]
    InvalidKeyLength(usize),

    /// The peer key is a low-order point and the agreement is all zeros.
    #[error("{0} key agreement produced a non-contributory secret")]
    NonContributory(Curve),
}

/// Result type for key-exchange operations.
pub type Result<T> = std::result::Result<T, ExchangeError>;
