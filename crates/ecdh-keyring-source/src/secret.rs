//! Reading private key material.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use zeroize::Zeroizing;

/// Reads raw file content for a resolved path.
///
/// Used for both the key-list file and the private key files it names.
pub trait SecretLoader: Send + Sync {
    /// Read the whole content of `path`.
    fn read(&self, path: &Path) -> io::Result<Zeroizing<Vec<u8>>>;
}

impl<L: SecretLoader + ?Sized> SecretLoader for Arc<L> {
    fn read(&self, path: &Path) -> io::Result<Zeroizing<Vec<u8>>> {
        (**self).read(path)
    }
}

/// Reads from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSecretLoader;

impl SecretLoader for FsSecretLoader {
    fn read(&self, path: &Path) -> io::Result<Zeroizing<Vec<u8>>> {
        std::fs::read(path).map(Zeroizing::new)
    }
}

/// In-memory file table.
///
/// This is primarily for testing. Paths are matched exactly as given, with
/// no normalization.
#[derive(Default)]
pub struct MemorySecretLoader {
    files: RwLock<HashMap<PathBuf, Vec<u8>>>,
}

impl MemorySecretLoader {
    /// Create an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file.
    pub fn insert(&self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        self.files.write().insert(path.into(), content.into());
    }

    /// Remove a file, making later reads fail with `NotFound`.
    pub fn remove(&self, path: impl AsRef<Path>) {
        self.files.write().remove(path.as_ref());
    }
}

impl SecretLoader for MemorySecretLoader {
    fn read(&self, path: &Path) -> io::Result<Zeroizing<Vec<u8>>> {
        self.files
            .read()
            .get(path)
            .map(|content| Zeroizing::new(content.clone()))
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display()))
            })
    }
}
