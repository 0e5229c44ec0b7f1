//! Sandboxed file storage for persisted account state.
//!
//! - **Sandboxing**: relative paths only, `..` cannot climb above the root, and symlinked
//!   ancestors are checked after canonicalization.
//! - **Atomic writes**: unique temp file, `fsync`, rename. Orphaned temp files are swept
//!   when the store is opened.
//! - **Namespaces**: one directory per account, listable and removable as a unit.
//! - **Compression**: optional LZ4, transparent to callers.

mod builder;
mod engine;
mod error;
mod maintenance;
mod namespace;
mod security;

pub use builder::{NoRoot, StorageBuilder, WithRoot};
pub use engine::{Compression, Storage};
pub use error::{StorageError, StorageErrorExt};
pub use maintenance::PurgeReport;
pub use namespace::{NamespaceName, NamespacedStorage};
