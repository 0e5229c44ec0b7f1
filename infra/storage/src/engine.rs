//! The [`Storage`] handle: sandboxed, atomic and optionally compressed file I/O.

use crate::builder::StorageBuilder;
use crate::error::{StorageError, StorageErrorExt};
use crate::maintenance::{self, PurgeReport, TMP_MARKER};
use crate::namespace::{NamespaceName, NamespacedStorage};
use crate::security;
use std::io::ErrorKind;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum Compression {
    #[default]
    None,
    Lz4,
}

impl Compression {
    fn compress(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::None => data.to_vec(),
            Self::Lz4 => lz4_flex::compress_prepend_size(data),
        }
    }

    fn decompress(self, data: Vec<u8>) -> Result<Vec<u8>, StorageError> {
        match self {
            Self::None => Ok(data),
            Self::Lz4 => {
                lz4_flex::decompress_size_prepended(&data).context("Lz4 decompression failed")
            },
        }
    }
}

impl From<bool> for Compression {
    fn from(enabled: bool) -> Self {
        if enabled { Self::Lz4 } else { Self::None }
    }
}

#[derive(Debug)]
pub struct StorageInner {
    /// Canonical physical root; every resolved path must stay below it.
    pub(crate) root: PathBuf,
    pub(crate) compression: Compression,
    pub(crate) tmp_counter: AtomicU64,
}

/// A cloneable handle to a sandboxed directory.
///
/// Writes go through a temp file, `fsync` and rename, so a crash never leaves a
/// half-written record behind. Reads of missing files yield `Ok(None)` and deletes
/// of missing files succeed, which keeps callers free of not-found special cases.
///
/// # Example
///
/// ```rust
/// use sbox_storage::{Compression, Storage, StorageError};
///
/// #[tokio::main]
/// async fn main() -> Result<(), StorageError> {
///     # let tmp = tempfile::tempdir().unwrap();
///     let storage = Storage::builder()
///         .root(tmp.path().join("data"))
///         .compression(Compression::Lz4)
///         .connect()
///         .await?;
///
///     let account = storage.namespace("acct-1")?;
///     account.write("folders.json", b"{}").await?;
///
///     assert_eq!(account.read("folders.json").await?, Some(b"{}".to_vec()));
///     assert_eq!(storage.namespaces().await?, vec!["acct-1".to_owned()]);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Storage {
    pub(crate) inner: Arc<StorageInner>,
}

impl Deref for Storage {
    type Target = StorageInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Storage {
    #[must_use = "The store is not opened until you call .connect()"]
    pub fn builder() -> StorageBuilder {
        StorageBuilder::new()
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Returns a view scoped to `<root>/<name>/`.
    ///
    /// # Errors
    /// Returns [`StorageError::InvalidNamespace`] for empty names or names outside
    /// `[A-Za-z0-9_-]`.
    pub fn namespace<N>(&self, name: N) -> Result<NamespacedStorage, StorageError>
    where
        N: TryInto<NamespaceName, Error = StorageError>,
    {
        Ok(NamespacedStorage::new(self.clone(), name.try_into()?))
    }

    /// Lists namespace directories directly under the root, sorted.
    ///
    /// # Errors
    /// Returns [`StorageError::Io`] if the root cannot be read.
    pub async fn namespaces(&self) -> Result<Vec<String>, StorageError> {
        self.list_internal(None, true).await
    }

    /// Removes a namespace directory and everything in it. Returns whether it existed.
    ///
    /// # Errors
    /// Returns [`StorageError::InvalidNamespace`] for an invalid name and
    /// [`StorageError::Io`] if removal fails.
    pub async fn remove_namespace<N>(&self, name: N) -> Result<bool, StorageError>
    where
        N: TryInto<NamespaceName, Error = StorageError>,
    {
        let name = name.try_into()?;
        let dir = self.root.join(name.as_str());
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!(namespace = %name, "Namespace removed");
                Ok(true)
            },
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StorageError::Io {
                source: err,
                context: Some(format!("Failed to remove namespace {name}").into()),
            }),
        }
    }

    /// Resolves a relative path inside the sandbox.
    ///
    /// # Errors
    /// Returns [`StorageError::PathTraversalAttempt`] if the path is absolute or escapes
    /// the root, [`StorageError::Io`] if an ancestor cannot be inspected.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
        self.resolve_internal(None, path)
    }

    pub(crate) fn resolve_internal(
        &self,
        namespace: Option<&str>,
        path: impl AsRef<Path>,
    ) -> Result<PathBuf, StorageError> {
        security::resolve_scoped(&self.root, namespace, path)
    }

    /// Reads a whole file, decompressing if the store is compressed.
    ///
    /// # Errors
    /// Returns [`StorageError::Io`] on read failures other than not-found and
    /// [`StorageError::Decompress`] if the data is corrupted.
    pub async fn read(&self, path: impl AsRef<Path>) -> Result<Option<Vec<u8>>, StorageError> {
        self.read_internal(None, path).await
    }

    pub(crate) async fn read_internal(
        &self,
        namespace: Option<&str>,
        path: impl AsRef<Path>,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        let resolved = self.resolve_internal(namespace, path)?;

        match fs::read(&resolved).await {
            Ok(data) => self.compression.decompress(data).map(Some),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Io {
                source: err,
                context: Some(format!("Read failed: {}", resolved.display()).into()),
            }),
        }
    }

    /// Writes a file atomically, creating parent directories.
    ///
    /// # Errors
    /// Returns [`StorageError::PathTraversalAttempt`] if the path escapes the sandbox
    /// and [`StorageError::Io`] on any filesystem failure.
    pub async fn write(&self, path: impl AsRef<Path>, data: &[u8]) -> Result<(), StorageError> {
        self.write_internal(None, path, data).await
    }

    pub(crate) async fn write_internal(
        &self,
        namespace: Option<&str>,
        path: impl AsRef<Path>,
        data: &[u8],
    ) -> Result<(), StorageError> {
        let resolved = self.resolve_internal(namespace, path)?;

        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)
                .await
                .context(format!("Failed to create directory for {}", resolved.display()))?;
        }

        let temp = self.tmp_path(&resolved);
        let payload = self.compression.compress(data);

        {
            let mut file = fs::OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&temp)
                .await
                .context(format!("Temp creation failed: {}", temp.display()))?;
            file.write_all(&payload).await.context("Write failed")?;
            file.sync_all().await.context("Hardware sync failed")?;
        }

        if let Err(err) = fs::rename(&temp, &resolved).await {
            let _ = fs::remove_file(&temp).await;
            return Err(StorageError::Io {
                source: err,
                context: Some(
                    format!("Atomic swap failed: {} -> {}", temp.display(), resolved.display())
                        .into(),
                ),
            });
        }

        if let Some(parent) = resolved.parent() {
            sync_dir(parent).await;
        }

        debug!(path = %resolved.display(), bytes = data.len(), "File saved atomically");
        Ok(())
    }

    /// Deletes a file. Returns whether a file was removed; missing files are not an error.
    ///
    /// # Errors
    /// Returns [`StorageError::Io`] if removal fails for another reason.
    pub async fn delete(&self, path: impl AsRef<Path>) -> Result<bool, StorageError> {
        self.delete_internal(None, path).await
    }

    pub(crate) async fn delete_internal(
        &self,
        namespace: Option<&str>,
        path: impl AsRef<Path>,
    ) -> Result<bool, StorageError> {
        let resolved = self.resolve_internal(namespace, path)?;
        match fs::remove_file(&resolved).await {
            Ok(()) => {
                debug!(path = %resolved.display(), "File deleted");
                Ok(true)
            },
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StorageError::Io {
                source: err,
                context: Some(format!("Failed to delete: {}", resolved.display()).into()),
            }),
        }
    }

    /// # Errors
    /// Returns an error only if path resolution fails.
    pub fn exists(&self, path: impl AsRef<Path>) -> Result<bool, StorageError> {
        Ok(self.resolve_internal(None, path)?.is_file())
    }

    pub(crate) async fn list_internal(
        &self,
        namespace: Option<&str>,
        dirs: bool,
    ) -> Result<Vec<String>, StorageError> {
        let dir = namespace.map_or_else(|| self.root.clone(), |ns| self.root.join(ns));

        let mut reader = match fs::read_dir(&dir).await {
            Ok(reader) => reader,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(StorageError::Io {
                    source: err,
                    context: Some(format!("Failed to list {}", dir.display()).into()),
                });
            },
        };

        let mut names = Vec::new();
        while let Some(entry) = reader.next_entry().await.context("Directory listing failed")? {
            let file_type = entry.file_type().await.context("File type lookup failed")?;
            let Ok(name) = entry.file_name().into_string() else { continue };

            let wanted = if dirs {
                file_type.is_dir() && NamespaceName::is_valid(&name)
            } else {
                file_type.is_file() && !maintenance::is_tmp_name(&name)
            };
            if wanted {
                names.push(name);
            }
        }
        names.sort_unstable();
        Ok(names)
    }

    /// Removes temp files left behind by interrupted writes.
    pub async fn purge_tmp(&self) -> PurgeReport {
        maintenance::purge_tmp(&self.root).await
    }

    fn tmp_path(&self, target: &Path) -> PathBuf {
        let counter = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let file_name = target.file_name().and_then(|s| s.to_str()).unwrap_or("storage");
        target.with_file_name(format!("{file_name}{TMP_MARKER}{}.{counter}", std::process::id()))
    }
}

async fn sync_dir(path: &Path) {
    match fs::File::open(path).await {
        Ok(dir) => {
            if let Err(err) = dir.sync_all().await {
                warn!(path = %path.display(), error = %err, "Directory sync failed");
            }
        },
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Directory open failed");
        },
    }
}
