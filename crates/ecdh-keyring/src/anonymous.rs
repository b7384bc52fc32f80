//! The anonymous key: used when a peer does not name a key.

use std::path::PathBuf;

use ecdh_keyring_core::KeyExchange;
use ecdh_keyring_source::settings::keys;
use ecdh_keyring_source::{SecretLoader, Settings};

use crate::error::EntryError;

/// Identifier the anonymous key is registered under.
pub const ANONYMOUS_KEY_ID: &str = "";

/// Build the anonymous key from the configured curve and private key file.
///
/// Returns `Ok(None)` when neither is configured. A half-configured pair,
/// an unreadable file or a bad key is an error; the caller logs it and
/// carries on without an anonymous key.
pub fn establish(
    protocol: &str,
    settings: &dyn Settings,
    secrets: &dyn SecretLoader,
) -> Result<Option<KeyExchange>, EntryError> {
    let curve = settings.get_string(&keys::anonymous_curve(protocol));
    let file = settings.get_string(&keys::anonymous_private_key(protocol));

    let (curve, path) = match (curve, file) {
        (None, None) => return Ok(None),
        (Some(_), None) => return Err(EntryError::MissingPrivateKey),
        (None, Some(_)) => return Err(EntryError::MissingCurve),
        (Some(curve), Some(file)) => (curve, PathBuf::from(file)),
    };

    let private_key = secrets
        .read(&path)
        .map_err(|source| EntryError::ReadPrivateKey {
            path: path.clone(),
            source,
        })?;

    KeyExchange::new(&curve, &private_key)
        .map(Some)
        .map_err(|source| EntryError::Init { path, source })
}
