//! # ECDH Keyring
//!
//! A reloadable registry of ECDH key-exchange contexts, used by a secure
//! transport to derive per-connection session keys.
//!
//! ## Overview
//!
//! Keys are described in a JSON key list named by configuration. Each key has
//! an identifier, a curve and a private key file. Peers name the key they
//! encrypted to; a peer that names none uses the anonymous key (identifier
//! `""`), which may come from the key list or from dedicated settings.
//!
//! ## Key Concepts
//!
//! - **Generation**: one complete, consistent snapshot of the keys produced by
//!   one load. Readers always see exactly one generation.
//! - **Reload**: builds a new generation off-lock and swaps it in. If the key
//!   list cannot be read, the current generation stays live.
//! - **Isolation**: one bad key definition is logged and skipped; it never
//!   prevents the other keys from loading.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ecdh_keyring::{KeyRegistry, source::{ConfigSettings, FsSecretLoader}};
//!
//! let settings = ConfigSettings::load(Some("server.toml".as_ref())).unwrap();
//! let registry = KeyRegistry::initialize("tcp", settings, FsSecretLoader).unwrap();
//!
//! // On each connection:
//! // let session = registry.derive_key(key_id, &peer_public_key, 32)?;
//!
//! // From an admin hook:
//! registry.settings().refresh().unwrap();
//! let report = registry.reload().unwrap();
//! println!("generation {} with {} keys", report.generation, report.key_ids.len());
//! ```
//!
//! ## Re-exports
//!
//! - `ecdh_keyring::exchange` - curves and key-exchange contexts
//! - `ecdh_keyring::source` - settings, key lists and secret loaders

pub mod anonymous;
pub mod error;
pub mod loader;
pub mod registry;

// Re-export component crates
pub use ecdh_keyring_core as exchange;
pub use ecdh_keyring_source as source;

pub use anonymous::ANONYMOUS_KEY_ID;
pub use error::{EntryError, EntryFailure, RegistryError, Result};
pub use loader::LoadOutcome;
pub use registry::{KeyGeneration, KeyRegistry, LoadReport};

// Re-export commonly used types
pub use ecdh_keyring_core::{Curve, DerivedKey, KeyExchange};
