//! # ECDH Keyring Core
//!
//! Key-exchange contexts for the ECDH keyring.
//!
//! This crate contains no I/O and no shared state. A [`KeyExchange`] holds one
//! private key on one [`Curve`] and combines it with a peer's public key to
//! produce a per-connection [`DerivedKey`] (symmetric key plus IV).
//!
//! ## Supported Curves
//!
//! - `x25519` (RFC 7748)
//! - `secp256k1`
//! - `secp256r1` (a.k.a. `prime256v1`, NIST P-256)
//!
//! ## Usage
//!
//! ```rust
//! use ecdh_keyring_core::{Curve, KeyExchange};
//!
//! let server = KeyExchange::generate(Curve::X25519);
//! let client = KeyExchange::generate(Curve::X25519);
//!
//! let server_side = server.derive_key(&client.public_key(), 32).unwrap();
//! let client_side = client.derive_key(&server.public_key(), 32).unwrap();
//!
//! assert_eq!(server_side.key(), client_side.key());
//! assert_eq!(server_side.iv(), client_side.iv());
//! ```

pub mod curve;
pub mod error;
pub mod exchange;

pub use curve::Curve;
pub use error::{ExchangeError, Result};
pub use exchange::{DerivedKey, KeyExchange, IV_LEN, PRIVATE_KEY_LEN};
