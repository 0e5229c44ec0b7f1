use crate::engine::Storage;
use crate::error::StorageError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A validated directory name for one namespace, usually an account id.
///
/// Allowed characters are ASCII alphanumerics, `_` and `-`. Case is preserved so names
/// listed back by [`Storage::namespaces`] match what was written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespaceName(Arc<str>);

impl NamespaceName {
    pub(crate) fn is_valid(name: &str) -> bool {
        !name.is_empty()
            && name.len() <= 128
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for NamespaceName {
    type Error = StorageError;

    fn try_from(value: &str) -> Result<Self, StorageError> {
        if Self::is_valid(value) {
            Ok(Self(value.into()))
        } else {
            Err(StorageError::InvalidNamespace {
                message: value.to_owned().into(),
                context: Some("Expected 1-128 chars of [A-Za-z0-9_-]".into()),
            })
        }
    }
}

impl TryFrom<String> for NamespaceName {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, StorageError> {
        Self::try_from(value.as_str())
    }
}

impl TryFrom<&String> for NamespaceName {
    type Error = StorageError;

    fn try_from(value: &String) -> Result<Self, StorageError> {
        Self::try_from(value.as_str())
    }
}

impl fmt::Display for NamespaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A view of [`Storage`] rooted at `<root>/<namespace>/`.
///
/// Cloning is cheap; the view shares the engine handle and its compression setting.
#[derive(Debug, Clone)]
pub struct NamespacedStorage {
    storage: Storage,
    name: NamespaceName,
}

impl NamespacedStorage {
    pub(crate) const fn new(storage: Storage, name: NamespaceName) -> Self {
        Self { storage, name }
    }

    #[must_use]
    pub const fn name(&self) -> &NamespaceName {
        &self.name
    }

    /// # Errors
    /// Returns [`StorageError::PathTraversalAttempt`] if the path escapes the namespace.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
        self.storage.resolve_internal(Some(self.name.as_str()), path)
    }

    /// Reads a file; `Ok(None)` when it does not exist.
    ///
    /// # Errors
    /// See [`Storage::read`].
    pub async fn read(&self, path: impl AsRef<Path>) -> Result<Option<Vec<u8>>, StorageError> {
        self.storage.read_internal(Some(self.name.as_str()), path).await
    }

    /// Writes a file atomically. See [`Storage::write`].
    ///
    /// # Errors
    /// See [`Storage::write`].
    pub async fn write(&self, path: impl AsRef<Path>, data: &[u8]) -> Result<(), StorageError> {
        self.storage.write_internal(Some(self.name.as_str()), path, data).await
    }

    /// Removes a file. Returns whether anything was removed.
    ///
    /// # Errors
    /// See [`Storage::delete`].
    pub async fn delete(&self, path: impl AsRef<Path>) -> Result<bool, StorageError> {
        self.storage.delete_internal(Some(self.name.as_str()), path).await
    }

    /// # Errors
    /// Returns an error only if path resolution fails.
    pub fn exists(&self, path: impl AsRef<Path>) -> Result<bool, StorageError> {
        Ok(self.resolve(path)?.is_file())
    }

    /// Lists the regular files directly inside the namespace, sorted, skipping temp files.
    ///
    /// # Errors
    /// Returns [`StorageError::Io`] if the directory cannot be read.
    pub async fn entries(&self) -> Result<Vec<String>, StorageError> {
        self.storage.list_internal(Some(self.name.as_str()), false).await
    }
}
