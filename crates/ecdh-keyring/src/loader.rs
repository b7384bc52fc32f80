//! Batch loading: protocol name -> candidate key mapping.
//!
//! The loader never touches a live registry. It builds a private mapping
//! that the registry later installs in one step.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use ecdh_keyring_core::KeyExchange;
use ecdh_keyring_source::settings::keys;
use ecdh_keyring_source::{KeyDefinition, KeysList, SecretLoader, Settings};
use tracing::{debug, error};

use crate::anonymous::{self, ANONYMOUS_KEY_ID};
use crate::error::{EntryError, EntryFailure, RegistryError, Result};

/// What one load pass produced.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    /// Successfully built contexts, by identifier.
    pub exchanges: HashMap<String, Arc<KeyExchange>>,
    /// Definitions that were skipped, in the order they were seen.
    pub failures: Vec<EntryFailure>,
    /// The key-list file, if one is configured.
    pub keys_list: Option<PathBuf>,
}

impl LoadOutcome {
    fn record(&mut self, protocol: &str, key_id: &str, error: EntryError) {
        let failure = EntryFailure {
            protocol: protocol.to_string(),
            key_id: key_id.to_string(),
            error,
        };
        error!(protocol, key_id, "Skipping key: {failure}");
        self.failures.push(failure);
    }
}

/// Load every key configured for `protocol`.
///
/// Fails only when a key list is configured but cannot be read or parsed.
/// Problems with individual definitions, and with the anonymous key, are
/// recorded in [`LoadOutcome::failures`] and the entry is skipped.
pub fn load(
    protocol: &str,
    settings: &dyn Settings,
    secrets: &dyn SecretLoader,
) -> Result<LoadOutcome> {
    let mut outcome = match settings.get_string(&keys::keys_list_file(protocol)) {
        Some(path) => {
            let list = KeysList::load(&path, secrets).map_err(|source| {
                error!(protocol, %source, "Reading key list failed");
                RegistryError::Load {
                    protocol: protocol.to_string(),
                    source,
                }
            })?;
            load_list(protocol, &list, secrets)
        }
        None => LoadOutcome::default(),
    };

    if !outcome.exchanges.contains_key(ANONYMOUS_KEY_ID) {
        match anonymous::establish(protocol, settings, secrets) {
            Ok(Some(exchange)) => {
                debug!(protocol, curve = %exchange.curve(), "Anonymous key established");
                outcome
                    .exchanges
                    .insert(ANONYMOUS_KEY_ID.to_string(), Arc::new(exchange));
            }
            Ok(None) => {}
            Err(error) => outcome.record(protocol, ANONYMOUS_KEY_ID, error),
        }
    }

    Ok(outcome)
}

fn load_list(protocol: &str, list: &KeysList, secrets: &dyn SecretLoader) -> LoadOutcome {
    let initial = LoadOutcome {
        keys_list: Some(list.path().to_path_buf()),
        ..LoadOutcome::default()
    };

    list.definitions().fold(initial, |mut outcome, (key_id, definition)| {
        let built = definition
            .map_err(EntryError::Malformed)
            .and_then(|definition| build(list, &definition, secrets));

        match built {
            Ok(Some(exchange)) => {
                let replaced = outcome
                    .exchanges
                    .insert(key_id.to_string(), Arc::new(exchange))
                    .is_some();
                if replaced {
                    debug!(protocol, key_id, "Key defined twice, keeping the later one");
                }
            }
            Ok(None) => debug!(protocol, key_id, "Key disabled"),
            Err(error) => outcome.record(protocol, key_id, error),
        }
        outcome
    })
}

/// Build one definition. `Ok(None)` means the entry is disabled.
fn build(
    list: &KeysList,
    definition: &KeyDefinition,
    secrets: &dyn SecretLoader,
) -> std::result::Result<Option<KeyExchange>, EntryError> {
    if !definition.enabled {
        return Ok(None);
    }
    if definition.curve.is_empty() {
        return Err(EntryError::EmptyCurve);
    }
    if definition.private_key.is_empty() {
        return Err(EntryError::EmptyPrivateKey);
    }

    let path = list.resolve(&definition.private_key);
    let private_key = secrets
        .read(&path)
        .map_err(|source| EntryError::ReadPrivateKey {
            path: path.clone(),
            source,
        })?;

    KeyExchange::new(&definition.curve, &private_key)
        .map(Some)
        .map_err(|source| EntryError::Init { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecdh_keyring_core::Curve;
    use ecdh_keyring_source::{MapSettings, MemorySecretLoader};

    fn settings_with_list(path: &str) -> MapSettings {
        MapSettings::new().with("server.tcp.security.ecdh.keys_list_file", path)
    }

    fn add_key(loader: &MemorySecretLoader, path: &str, curve: Curve) -> KeyExchange {
        let exchange = KeyExchange::generate(curve);
        loader.insert(path, exchange.private_key_bytes().to_vec());
        exchange
    }

    #[test]
    fn test_no_key_list_is_empty_success() {
        let outcome = load("tcp", &MapSettings::new(), &MemorySecretLoader::new()).unwrap();
        assert!(outcome.exchanges.is_empty());
        assert!(outcome.failures.is_empty());
        assert!(outcome.keys_list.is_none());
    }

    #[test]
    fn test_unreadable_key_list_fails() {
        let result = load(
            "tcp",
            &settings_with_list("/keys/list.json"),
            &MemorySecretLoader::new(),
        );
        assert!(matches!(result, Err(RegistryError::Load { protocol, .. }) if protocol == "tcp"));
    }

    #[test]
    fn test_malformed_key_list_fails() {
        let loader = MemorySecretLoader::new();
        loader.insert("/keys/list.json", b"not json".to_vec());
        let result = load("tcp", &settings_with_list("/keys/list.json"), &loader);
        assert!(matches!(result, Err(RegistryError::Load { .. })));
    }

    #[test]
    fn test_per_entry_failures_are_isolated() {
        let loader = MemorySecretLoader::new();
        let k1 = add_key(&loader, "/keys/k1.key", Curve::Secp256k1);
        add_key(&loader, "/keys/off.key", Curve::X25519);
        loader.insert("/keys/bad.key", b"garbage".to_vec());
        loader.insert(
            "/keys/list.json",
            br#"{
                "k1": {"curve": "secp256k1", "privateKey": "k1.key"},
                "k2": {"curve": "", "privateKey": "k2.key"},
                "k3": {"curve": "x25519", "privateKey": ""},
                "k4": {"curve": "x25519", "privateKey": "missing.key"},
                "k5": {"curve": "x25519", "privateKey": "bad.key"},
                "k6": {"curve": "x448", "privateKey": "k1.key"},
                "k7": "not an object",
                "off": {"curve": "x25519", "privateKey": "off.key", "enable": false}
            }"#
            .to_vec(),
        );

        let outcome = load("tcp", &settings_with_list("/keys/list.json"), &loader).unwrap();

        assert_eq!(outcome.exchanges.len(), 1);
        assert_eq!(outcome.exchanges["k1"].public_key(), k1.public_key());

        let failed: Vec<&str> = outcome.failures.iter().map(|f| f.key_id.as_str()).collect();
        assert_eq!(failed, vec!["k2", "k3", "k4", "k5", "k6", "k7"]);
        assert!(matches!(outcome.failures[0].error, EntryError::EmptyCurve));
        assert!(matches!(outcome.failures[1].error, EntryError::EmptyPrivateKey));
        assert!(matches!(outcome.failures[2].error, EntryError::ReadPrivateKey { .. }));
        assert!(matches!(outcome.failures[3].error, EntryError::Init { .. }));
        assert!(matches!(outcome.failures[4].error, EntryError::Init { .. }));
        assert!(matches!(outcome.failures[5].error, EntryError::Malformed(_)));
        assert!(outcome.failures.iter().all(|f| f.protocol == "tcp"));
    }

    #[test]
    fn test_disabled_entry_with_bad_fields_is_skipped_silently() {
        let loader = MemorySecretLoader::new();
        loader.insert(
            "/keys/list.json",
            br#"{
                "off": {"enable": false, "curve": 7, "privateKey": null},
                "off-too": {"enable": false, "privateKey": ["a", "b"]}
            }"#
            .to_vec(),
        );

        let outcome = load("tcp", &settings_with_list("/keys/list.json"), &loader).unwrap();
        assert!(outcome.exchanges.is_empty());
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn test_listed_anonymous_key_wins_over_settings() {
        let loader = MemorySecretLoader::new();
        let listed = add_key(&loader, "/keys/anon.key", Curve::X25519);
        add_key(&loader, "/etc/configured-anon.key", Curve::X25519);
        loader.insert(
            "/keys/list.json",
            br#"{"": {"curve": "x25519", "privateKey": "anon.key"}}"#.to_vec(),
        );
        let settings = settings_with_list("/keys/list.json")
            .with("server.security.ecdh.curve", "x25519")
            .with("server.security.ecdh.private_key", "/etc/configured-anon.key");

        let outcome = load("tcp", &settings, &loader).unwrap();
        assert_eq!(outcome.exchanges.len(), 1);
        assert_eq!(outcome.exchanges[ANONYMOUS_KEY_ID].public_key(), listed.public_key());
    }

    #[test]
    fn test_anonymous_failure_does_not_abort_load() {
        let loader = MemorySecretLoader::new();
        add_key(&loader, "/keys/k1.key", Curve::X25519);
        loader.insert(
            "/keys/list.json",
            br#"{"k1": {"curve": "x25519", "privateKey": "/keys/k1.key"}}"#.to_vec(),
        );
        let settings =
            settings_with_list("/keys/list.json").with("server.security.ecdh.curve", "x25519");

        let outcome = load("tcp", &settings, &loader).unwrap();
        assert_eq!(outcome.exchanges.len(), 1);
        assert!(outcome.exchanges.contains_key("k1"));
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].key_id, ANONYMOUS_KEY_ID);
        assert!(matches!(outcome.failures[0].error, EntryError::MissingPrivateKey));
    }
}
