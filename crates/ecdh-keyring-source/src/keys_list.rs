//! The key-list file: identifier -> key definition.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, SourceError};
use crate::secret::SecretLoader;

/// One entry of a key list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDefinition {
    /// Key identifier. The empty string names the anonymous key.
    pub id: String,
    /// Disabled entries are skipped by the loader.
    pub enabled: bool,
    /// Curve name, see `ecdh_keyring_core::Curve`.
    pub curve: String,
    /// Private key path as written in the file (not yet resolved).
    pub private_key: String,
}

#[derive(Deserialize)]
struct KeyEntry {
    #[serde(default = "enabled_by_default")]
    enable: bool,
    #[serde(default)]
    curve: String,
    #[serde(default, rename = "privateKey")]
    private_key: String,
}

fn enabled_by_default() -> bool {
    true
}

/// A decoded key-list entry, or why it could not be decoded.
pub type DefinitionResult = std::result::Result<KeyDefinition, serde_json::Error>;

fn decode(id: &str, value: &Value) -> DefinitionResult {
    if value.get("enable").and_then(Value::as_bool) == Some(false) {
        return Ok(KeyDefinition {
            id: id.to_string(),
            enabled: false,
            curve: String::new(),
            private_key: String::new(),
        });
    }

    let entry = KeyEntry::deserialize(value)?;
    Ok(KeyDefinition {
        id: id.to_string(),
        enabled: entry.enable,
        curve: entry.curve,
        private_key: entry.private_key,
    })
}

/// A parsed key-list file.
///
/// The top level must be a JSON object. Entries are decoded lazily by
/// [`KeysList::definitions`] so that one malformed entry does not make the
/// whole file unusable.
#[derive(Debug, Clone)]
pub struct KeysList {
    path: PathBuf,
    base_dir: PathBuf,
    entries: BTreeMap<String, Value>,
}

impl KeysList {
    /// Read and parse the key list at `path`.
    pub fn load(path: impl AsRef<Path>, loader: &dyn SecretLoader) -> Result<Self> {
        let path = path.as_ref();
        let content = loader.read(path).map_err(|source| SourceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    /// Parse key-list content that was read from `path`.
    ///
    /// A repeated identifier keeps the last occurrence.
    pub fn parse(path: impl Into<PathBuf>, content: &[u8]) -> Result<Self> {
        let path = path.into();
        let entries: BTreeMap<String, Value> =
            serde_json::from_slice(content).map_err(|source| SourceError::Parse {
                path: path.clone(),
                source,
            })?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        Ok(Self {
            path,
            base_dir,
            entries,
        })
    }

    /// Where the list was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory relative private key paths are resolved against.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Number of entries, enabled or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decode every entry, in ascending identifier order.
    ///
    /// An entry with `"enable": false` is reported as disabled without
    /// looking at its other fields.
    pub fn definitions(&self) -> impl Iterator<Item = (&str, DefinitionResult)> + '_ {
        self.entries
            .iter()
            .map(|(id, value)| (id.as_str(), decode(id, value)))
    }

    /// Resolve a private key location.
    ///
    /// Locations starting with `/` or `\`, or absolute on this platform, are
    /// used as-is; anything else is joined to [`KeysList::base_dir`].
    pub fn resolve(&self, location: &str) -> PathBuf {
        if location.starts_with('/')
            || location.starts_with('\\')
            || Path::new(location).is_absolute()
        {
            PathBuf::from(location)
        } else {
            self.base_dir.join(location)
        }
    }
}
