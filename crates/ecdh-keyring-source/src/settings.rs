//! Configuration lookup by prioritized key names.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Result;

/// Default environment variable prefix for [`ConfigSettings`].
pub const ENV_PREFIX: &str = "ECDH_KEYRING";

/// Resolves configuration values.
pub trait Settings: Send + Sync {
    /// Look up a single key.
    fn lookup(&self, key: &str) -> Option<String>;

    /// Return the first non-empty value among `keys`, in order.
    fn get_string(&self, keys: &[String]) -> Option<String> {
        keys.iter()
            .filter_map(|key| self.lookup(key))
            .find(|value| !value.is_empty())
    }
}

impl<S: Settings + ?Sized> Settings for Arc<S> {
    fn lookup(&self, key: &str) -> Option<String> {
        (**self).lookup(key)
    }
}

/// Configuration key names, protocol-specific first.
pub mod keys {
    fn prioritized(protocol: &str, leaf: &str) -> Vec<String> {
        vec![
            format!("server.{protocol}.security.ecdh.{leaf}"),
            format!("server.security.ecdh.{leaf}"),
        ]
    }

    /// Path of the key-list file.
    pub fn keys_list_file(protocol: &str) -> Vec<String> {
        prioritized(protocol, "keys_list_file")
    }

    /// Curve of the anonymous key.
    pub fn anonymous_curve(protocol: &str) -> Vec<String> {
        prioritized(protocol, "curve")
    }

    /// Private key file of the anonymous key.
    pub fn anonymous_private_key(protocol: &str) -> Vec<String> {
        prioritized(protocol, "private_key")
    }
}

/// In-memory settings, mutable through a shared reference.
#[derive(Debug, Default)]
pub struct MapSettings {
    values: RwLock<HashMap<String, String>>,
}

impl MapSettings {
    /// Create empty settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`MapSettings::set`].
    pub fn with(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(key.into(), value.into());
    }

    /// Remove a value.
    pub fn remove(&self, key: &str) {
        self.values.write().remove(key);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapSettings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let values = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: RwLock::new(values),
        }
    }
}

impl Settings for MapSettings {
    fn lookup(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }
}

/// Settings backed by the `config` crate.
///
/// An optional file (format inferred from its extension) is layered under
/// environment variables. With the default prefix,
/// `ECDH_KEYRING_SERVER__SECURITY__ECDH__CURVE` sets
/// `server.security.ecdh.curve`.
pub struct ConfigSettings {
    file: Option<PathBuf>,
    env_prefix: String,
    config: RwLock<config::Config>,
}

impl ConfigSettings {
    /// Load from an optional file plus the environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::with_env_prefix(file, ENV_PREFIX)
    }

    /// Load with a custom environment variable prefix.
    pub fn with_env_prefix(file: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let file = file.map(Path::to_path_buf);
        let config = build(file.as_deref(), env_prefix)?;
        Ok(Self {
            file,
            env_prefix: env_prefix.to_string(),
            config: RwLock::new(config),
        })
    }

    /// Re-read the file and environment.
    ///
    /// On failure the previous values stay in effect.
    pub fn refresh(&self) -> Result<()> {
        let config = build(self.file.as_deref(), &self.env_prefix)?;
        *self.config.write() = config;
        Ok(())
    }

    /// The configuration file, if any.
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }
}

impl Settings for ConfigSettings {
    fn lookup(&self, key: &str) -> Option<String> {
        self.config.read().get_string(key).ok()
    }
}

fn build(file: Option<&Path>, env_prefix: &str) -> Result<config::Config> {
    let mut builder = config::Config::builder();
    if let Some(path) = file {
        builder = builder.add_source(config::File::from(path.to_path_buf()));
    }
    builder = builder.add_source(
        config::Environment::with_prefix(env_prefix)
            .prefix_separator("_")
            .separator("__"),
    );
    Ok(builder.build()?)
}
