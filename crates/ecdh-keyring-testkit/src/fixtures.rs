//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a temporary directory holding
//! key files and a key list, and settings pointing at them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ecdh_keyring::KeyRegistry;
use ecdh_keyring_core::{Curve, KeyExchange};
use ecdh_keyring_source::settings::keys;
use ecdh_keyring_source::{FsSecretLoader, MapSettings, SecretLoader, Settings};
use tempfile::TempDir;

/// Registry type built by [`KeyringFixture::registry`].
pub type FixtureRegistry = KeyRegistry<Arc<MapSettings>, FsSecretLoader>;

/// A temporary key directory with settings for one protocol.
pub struct KeyringFixture {
    dir: TempDir,
    protocol: String,
    settings: Arc<MapSettings>,
}

impl KeyringFixture {
    /// Create a fixture for protocol `tcp`.
    pub fn new() -> Self {
        Self::with_protocol("tcp")
    }

    /// Create a fixture for a specific protocol.
    pub fn with_protocol(protocol: &str) -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create temp dir"),
            protocol: protocol.to_string(),
            settings: Arc::new(MapSettings::new()),
        }
    }

    /// The protocol settings are written for.
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// The temporary directory.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Settings shared with every registry this fixture builds.
    pub fn settings(&self) -> &Arc<MapSettings> {
        &self.settings
    }

    /// Absolute path of `name` inside the fixture directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write a file, creating parent directories.
    pub fn write_file(&self, name: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create key directory");
        }
        std::fs::write(&path, content).expect("failed to write fixture file");
        path
    }

    /// Remove a file written earlier.
    pub fn remove_file(&self, name: &str) {
        std::fs::remove_file(self.path(name)).expect("failed to remove fixture file");
    }

    /// Generate a key and write its raw private scalar to `name`.
    pub fn write_key(&self, name: &str, curve: Curve) -> KeyExchange {
        let exchange = KeyExchange::generate(curve);
        self.write_file(name, &exchange.private_key_bytes()[..]);
        exchange
    }

    /// Generate a key and write its private scalar to `name` as hex text.
    pub fn write_hex_key(&self, name: &str, curve: Curve) -> KeyExchange {
        let exchange = KeyExchange::generate(curve);
        self.write_file(name, format!("{}\n", hex::encode(&exchange.private_key_bytes()[..])));
        exchange
    }

    /// Write a key list and point the protocol's settings at it.
    pub fn write_keys_list(&self, name: &str, list: &serde_json::Value) -> PathBuf {
        let content = serde_json::to_vec_pretty(list).expect("key list is valid JSON");
        let path = self.write_file(name, content);
        self.configure_keys_list(&path);
        path
    }

    /// Point the protocol's key-list setting at `path`.
    pub fn configure_keys_list(&self, path: impl AsRef<Path>) {
        self.settings.set(
            keys::keys_list_file(&self.protocol)[0].clone(),
            path.as_ref().display().to_string(),
        );
    }

    /// Configure the protocol's anonymous key.
    pub fn configure_anonymous(&self, curve: &str, private_key: impl AsRef<Path>) {
        self.settings
            .set(keys::anonymous_curve(&self.protocol)[0].clone(), curve);
        self.settings.set(
            keys::anonymous_private_key(&self.protocol)[0].clone(),
            private_key.as_ref().display().to_string(),
        );
    }

    /// Initialize a registry over the fixture's settings and the filesystem.
    pub fn registry(&self) -> ecdh_keyring::Result<FixtureRegistry> {
        KeyRegistry::initialize(self.protocol.clone(), Arc::clone(&self.settings), FsSecretLoader)
    }
}

impl Default for KeyringFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether `registry` derives, under `key_id`, the same session key a client
/// would derive against `server`'s public key.
pub fn agrees<S: Settings, L: SecretLoader>(
    registry: &KeyRegistry<S, L>,
    key_id: &str,
    server: &KeyExchange,
) -> bool {
    let client = KeyExchange::generate(server.curve());
    let Ok(expected) = client.derive_key(&server.public_key(), 32) else {
        return false;
    };
    match registry.derive_key(key_id, &client.public_key(), 32) {
        Ok(derived) => derived.key() == expected.key() && derived.iv() == expected.iv(),
        Err(_) => false,
    }
}

/// Send registry logs to the test output. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fixture_key_files() {
        let fixture = KeyringFixture::new();
        let raw = fixture.write_key("keys/raw.key", Curve::X25519);
        let hex = fixture.write_hex_key("keys/hex.key", Curve::Secp256k1);

        let raw_content = std::fs::read(fixture.path("keys/raw.key")).unwrap();
        assert_eq!(raw_content.len(), 32);
        assert_eq!(
            KeyExchange::new("x25519", &raw_content).unwrap().public_key(),
            raw.public_key()
        );

        let hex_content = std::fs::read(fixture.path("keys/hex.key")).unwrap();
        assert_eq!(
            KeyExchange::new("secp256k1", &hex_content).unwrap().public_key(),
            hex.public_key()
        );
    }

    #[test]
    fn test_fixture_configures_settings() {
        let fixture = KeyringFixture::with_protocol("udp");
        let path = fixture.write_keys_list("keys.json", &json!({}));
        fixture.configure_anonymous("x25519", "/anon.key");

        assert_eq!(
            fixture.settings().get_string(&keys::keys_list_file("udp")),
            Some(path.display().to_string())
        );
        assert_eq!(
            fixture.settings().get_string(&keys::anonymous_curve("udp")),
            Some("x25519".to_string())
        );
        assert_eq!(fixture.settings().get_string(&keys::keys_list_file("tcp")), None);
    }

    #[test]
    fn test_fixture_registry() {
        let fixture = KeyringFixture::new();
        let anon = fixture.write_key("anon.key", Curve::Secp256r1);
        fixture.configure_anonymous("prime256v1", fixture.path("anon.key"));

        let registry = fixture.registry().unwrap();
        assert_eq!(registry.key_ids(), vec![String::new()]);
        assert!(agrees(&registry, "", &anon));
        assert!(!agrees(&registry, "missing", &anon));
    }
}
