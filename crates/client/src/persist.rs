//! Snapshot persistence boundary.
//!
//! Each resource store persists its collection after every state
//! transition so a reload restores the last known snapshot. Persistence
//! is an explicit, injectable object (no ambient globals): stores receive
//! a shared [`SnapshotStore`] handle and go through the
//! `serde_json::Value` serialization boundary.
//!
//! Blobs keep the versioned `{ "state": {...}, "version": n }` layout
//! that older clients wrote, so snapshots from previous versions still
//! hydrate (the token search in [`crate::session`] is tolerant of the
//! older shapes too).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use crate::config::StoreConfig;
use crate::error::StorageError;

/// Current version written into persisted blobs.
const BLOB_VERSION: u64 = 0;

/// Well-known snapshot blob names.
pub mod keys {
    /// Auth session snapshot (`{ state: { user } }`).
    pub const AUTH: &str = "auth-storage";

    /// Cart snapshot (`{ state: { items } }`).
    pub const CART: &str = "cart-storage";

    /// Product catalog snapshot (`{ state: { products } }`).
    pub const PRODUCTS: &str = "products-storage";
}

/// Named-blob persistence for resource snapshots.
///
/// Object-safe so stores can share one `Arc<dyn SnapshotStore>` handle.
/// Implementations must be safe to call from any thread.
pub trait SnapshotStore: Send + Sync {
    /// Load a named blob, or `None` if it has never been saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the blob exists but cannot be read.
    fn load(&self, name: &str) -> Result<Option<Value>, StorageError>;

    /// Save a named blob, replacing any previous contents.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the blob cannot be written.
    fn save(&self, name: &str, blob: &Value) -> Result<(), StorageError>;

    /// Remove a named blob. Removing an absent blob is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the removal fails for another reason.
    fn remove(&self, name: &str) -> Result<(), StorageError>;
}

/// Build the snapshot store a configuration asks for: file-backed when a
/// data directory is configured, in-memory otherwise.
///
/// # Errors
///
/// Returns `StorageError::Io` if the data directory cannot be created.
pub fn open(config: &StoreConfig) -> Result<Arc<dyn SnapshotStore>, StorageError> {
    match &config.data_dir {
        Some(dir) => Ok(Arc::new(FileSnapshotStore::new(dir.clone())?)),
        None => Ok(Arc::new(MemorySnapshotStore::new())),
    }
}

/// Wrap a store's state in the versioned blob layout.
#[must_use]
pub fn versioned(state: Value) -> Value {
    json!({ "state": state, "version": BLOB_VERSION })
}

/// Extract the `state` object from a persisted blob.
///
/// Older snapshots were written without the version wrapper; those are
/// returned as-is so hydration still works.
#[must_use]
pub fn unwrap_state(blob: &Value) -> &Value {
    blob.get("state").unwrap_or(blob)
}

// =============================================================================
// MemorySnapshotStore
// =============================================================================

/// In-memory snapshot store.
///
/// The default when no data directory is configured, and the backend for
/// tests. Contents are lost on process exit.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    blobs: Mutex<HashMap<String, Value>>,
}

impl MemorySnapshotStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self, name: &str) -> Result<Option<Value>, StorageError> {
        let blobs = self.blobs.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(blobs.get(name).cloned())
    }

    fn save(&self, name: &str, blob: &Value) -> Result<(), StorageError> {
        let mut blobs = self.blobs.lock().map_err(|_| StorageError::LockPoisoned)?;
        blobs.insert(name.to_owned(), blob.clone());
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), StorageError> {
        let mut blobs = self.blobs.lock().map_err(|_| StorageError::LockPoisoned)?;
        blobs.remove(name);
        Ok(())
    }
}

// =============================================================================
// FileSnapshotStore
// =============================================================================

/// Snapshot store writing one JSON file per named blob.
#[derive(Debug)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    /// Create a file-backed store rooted at `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StorageError> {
        // Blob names come from `keys`, but guard against path traversal
        // anyway since the trait is public.
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(StorageError::InvalidName(name.to_owned()));
        }
        Ok(self.dir.join(format!("{name}.json")))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self, name: &str) -> Result<Option<Value>, StorageError> {
        let path = self.path_for(name)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, name: &str, blob: &Value) -> Result<(), StorageError> {
        let path = self.path_for(name)?;
        let bytes = serde_json::to_vec_pretty(blob)?;
        std::fs::write(&path, bytes)?;
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), StorageError> {
        let path = self.path_for(name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
