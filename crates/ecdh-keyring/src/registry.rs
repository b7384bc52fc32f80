//! The key registry: a reloadable set of key-exchange contexts.
//!
//! The live mapping is one immutable [`KeyGeneration`] behind a reader/writer
//! lock. Loads build a complete candidate off-lock; the lock is held
//! exclusively only to swap the pointer or to merge a single added key.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use ecdh_keyring_core::{DerivedKey, KeyExchange};
use ecdh_keyring_source::{SecretLoader, Settings};
use parking_lot::RwLock;
use tracing::{error, info, trace, warn};

use crate::anonymous::ANONYMOUS_KEY_ID;
use crate::error::{EntryFailure, RegistryError, Result};
use crate::loader::{self, LoadOutcome};

/// One consistent snapshot of the registry, produced by one load.
#[derive(Clone)]
pub struct KeyGeneration {
    number: u64,
    protocol: String,
    exchanges: HashMap<String, Arc<KeyExchange>>,
}

impl KeyGeneration {
    /// Generation number. The initial load is 1 and every successful reload
    /// adds one. Keys added with [`KeyRegistry::add_key`] keep the number.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Protocol whose configuration this generation was loaded from.
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Number of keys, including the anonymous key.
    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    /// Whether the generation holds no keys.
    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// Whether a key with this identifier exists.
    pub fn contains(&self, key_id: &str) -> bool {
        self.exchanges.contains_key(key_id)
    }

    /// Get the context for a key identifier.
    pub fn get(&self, key_id: &str) -> Option<&Arc<KeyExchange>> {
        self.exchanges.get(key_id)
    }

    /// All key identifiers, sorted. The anonymous key sorts first as `""`.
    pub fn key_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.exchanges.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl fmt::Debug for KeyGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyGeneration")
            .field("number", &self.number)
            .field("protocol", &self.protocol)
            .field("key_ids", &self.key_ids())
            .finish()
    }
}

/// Summary of a successful load.
#[derive(Debug)]
pub struct LoadReport {
    /// Protocol whose configuration was loaded.
    pub protocol: String,
    /// Generation number the load was installed as.
    pub generation: u64,
    /// Identifiers now registered, sorted.
    pub key_ids: Vec<String>,
    /// Definitions that were skipped.
    pub failures: Vec<EntryFailure>,
    /// The key-list file, if one is configured.
    pub keys_list: Option<PathBuf>,
}

impl LoadReport {
    /// Whether an anonymous key is registered.
    pub fn has_anonymous(&self) -> bool {
        self.key_ids.iter().any(|id| id == ANONYMOUS_KEY_ID)
    }

    /// Whether every enabled definition loaded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Registry of ECDH key-exchange contexts for one protocol.
///
/// Shared between connection handlers (which call
/// [`KeyRegistry::derive_key`]) and administrative code (which calls
/// [`KeyRegistry::reload`] or [`KeyRegistry::add_key`]).
pub struct KeyRegistry<S: Settings, L: SecretLoader> {
    settings: S,
    secrets: L,
    live: RwLock<Arc<KeyGeneration>>,
}

impl<S: Settings, L: SecretLoader> KeyRegistry<S, L> {
    /// Load all keys for `protocol` and build the registry.
    ///
    /// Fails when a key list is configured but cannot be read or parsed.
    /// Individual bad keys are logged and skipped.
    pub fn initialize(protocol: impl Into<String>, settings: S, secrets: L) -> Result<Self> {
        Self::initialize_with_report(protocol, settings, secrets).map(|(registry, _)| registry)
    }

    /// [`KeyRegistry::initialize`], also returning the load summary.
    pub fn initialize_with_report(
        protocol: impl Into<String>,
        settings: S,
        secrets: L,
    ) -> Result<(Self, LoadReport)> {
        let protocol = protocol.into();
        let outcome = loader::load(&protocol, &settings, &secrets).map_err(|e| {
            error!(protocol = %protocol, "Creating key registry failed");
            e
        })?;

        let generation = Arc::new(KeyGeneration {
            number: 1,
            protocol,
            exchanges: outcome.exchanges,
        });
        let report = report(&generation, outcome.failures, outcome.keys_list);
        log_report(&report, "Key registry initialized");

        let registry = Self {
            settings,
            secrets,
            live: RwLock::new(generation),
        };
        Ok((registry, report))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reload
    // ─────────────────────────────────────────────────────────────────────────

    /// Reload every key for the protocol of the current generation.
    ///
    /// On failure the live keys are left exactly as they were.
    pub fn reload(&self) -> Result<LoadReport> {
        let protocol = self.protocol();
        self.reload_protocol(&protocol)
    }

    /// Reload using the configuration of `protocol`.
    ///
    /// On success `protocol` becomes the registry's protocol, so later
    /// calls to [`KeyRegistry::reload`] keep using it.
    pub fn reload_protocol(&self, protocol: &str) -> Result<LoadReport> {
        let LoadOutcome {
            exchanges,
            failures,
            keys_list,
        } = loader::load(protocol, &self.settings, &self.secrets).map_err(|e| {
            error!(protocol, "Reloading keys failed, keeping the current keys");
            e
        })?;

        let installed = {
            let mut live = self.live.write();
            let next = Arc::new(KeyGeneration {
                number: live.number + 1,
                protocol: protocol.to_string(),
                exchanges,
            });
            *live = Arc::clone(&next);
            next
        };

        let report = report(&installed, failures, keys_list);
        log_report(&report, "Keys reloaded");
        Ok(report)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Derivation
    // ─────────────────────────────────────────────────────────────────────────

    /// Derive a session key and IV with key `key_id` (`""` for the
    /// anonymous key) and the peer's public key.
    ///
    /// `key_len` must be 16 or 32.
    pub fn derive_key(
        &self,
        key_id: &str,
        peer_public_key: &[u8],
        key_len: usize,
    ) -> Result<DerivedKey> {
        let generation = self.snapshot();
        let exchange = generation.get(key_id).ok_or_else(|| {
            warn!(protocol = %generation.protocol, key_id, "Cannot find encryption key");
            RegistryError::KeyNotFound(key_id.to_string())
        })?;

        let derived = exchange
            .derive_key(peer_public_key, key_len)
            .map_err(|source| RegistryError::Derive {
                key_id: key_id.to_string(),
                source,
            })?;
        trace!(protocol = %generation.protocol, key_id, key_len, "Session key derived");
        Ok(derived)
    }

    /// Get the context registered under `key_id`.
    ///
    /// The returned handle stays valid after a reload replaces the key.
    pub fn exchange(&self, key_id: &str) -> Option<Arc<KeyExchange>> {
        self.live.read().get(key_id).cloned()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Explicit insertion
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a single key without a reload.
    ///
    /// Prefer configuring keys in the key list; this exists for callers that
    /// hold key material directly. An existing identifier is never
    /// overwritten. The key lasts until the next reload.
    pub fn add_key(&self, curve: &str, private_key: &[u8], key_id: &str) -> Result<()> {
        let mut live = self.live.write();

        if live.contains(key_id) {
            error!(protocol = %live.protocol, key_id, "Adding key failed: key already exists");
            return Err(RegistryError::KeyExists(key_id.to_string()));
        }

        let exchange = KeyExchange::new(curve, private_key).map_err(|source| {
            error!(protocol = %live.protocol, key_id, %source, "Adding key failed: init error");
            RegistryError::Init {
                key_id: key_id.to_string(),
                source,
            }
        })?;

        let generation = Arc::make_mut(&mut live);
        generation
            .exchanges
            .insert(key_id.to_string(), Arc::new(exchange));
        info!(protocol = %generation.protocol, key_id, curve, "Key added");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Introspection
    // ─────────────────────────────────────────────────────────────────────────

    /// The protocol of the current generation: the one given to
    /// [`KeyRegistry::initialize`] or to the last successful
    /// [`KeyRegistry::reload_protocol`].
    pub fn protocol(&self) -> String {
        self.live.read().protocol.clone()
    }

    /// The settings keys are loaded from.
    pub fn settings(&self) -> &S {
        &self.settings
    }

    /// The loader key files are read with.
    pub fn secrets(&self) -> &L {
        &self.secrets
    }

    /// The current generation. Holding it does not block reloads.
    pub fn snapshot(&self) -> Arc<KeyGeneration> {
        Arc::clone(&self.live.read())
    }

    /// The current generation number.
    pub fn generation(&self) -> u64 {
        self.live.read().number
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.live.read().len()
    }

    /// Whether no keys are registered.
    pub fn is_empty(&self) -> bool {
        self.live.read().is_empty()
    }

    /// Whether a key with this identifier is registered.
    pub fn contains(&self, key_id: &str) -> bool {
        self.live.read().contains(key_id)
    }

    /// All registered key identifiers, sorted.
    pub fn key_ids(&self) -> Vec<String> {
        self.live.read().key_ids()
    }
}

impl<S: Settings, L: SecretLoader> fmt::Debug for KeyRegistry<S, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRegistry")
            .field("live", &*self.live.read())
            .finish()
    }
}

fn report(
    generation: &KeyGeneration,
    failures: Vec<EntryFailure>,
    keys_list: Option<PathBuf>,
) -> LoadReport {
    LoadReport {
        protocol: generation.protocol.clone(),
        generation: generation.number,
        key_ids: generation.key_ids(),
        failures,
        keys_list,
    }
}

fn log_report(report: &LoadReport, message: &str) {
    info!(
        protocol = %report.protocol,
        generation = report.generation,
        keys = report.key_ids.len(),
        skipped = report.failures.len(),
        anonymous = report.has_anonymous(),
        "{message}"
    );
}
