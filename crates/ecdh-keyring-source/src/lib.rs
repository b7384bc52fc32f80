//! # ECDH Keyring Source
//!
//! Where key definitions come from.
//!
//! ## Overview
//!
//! The registry never touches the filesystem or a configuration backend
//! directly. It asks three collaborators:
//!
//! - [`Settings`] - resolves configuration values by prioritized key names
//! - [`KeysList`] - the parsed key-list file (identifier -> curve + key path)
//! - [`SecretLoader`] - reads private key material from a resolved path
//!
//! ## Key-list Format
//!
//! ```json
//! {
//!     "k1": { "curve": "secp256k1", "privateKey": "k1.pem" },
//!     "k2": { "curve": "x25519", "privateKey": "/etc/keys/k2.key", "enable": false }
//! }
//! ```
//!
//! Relative `privateKey` paths are resolved against the key-list file's own
//! directory.
//!
//! ## Configuration Keys
//!
//! See [`settings::keys`]. Every key exists in a protocol-specific form
//! (`server.<proto>.security.ecdh.*`) that takes precedence over the global
//! form (`server.security.ecdh.*`).

pub mod error;
pub mod keys_list;
pub mod secret;
pub mod settings;

pub use error::{Result, SourceError};
pub use keys_list::{DefinitionResult, KeyDefinition, KeysList};
pub use secret::{FsSecretLoader, MemorySecretLoader, SecretLoader};
pub use settings::{ConfigSettings, MapSettings, Settings};
