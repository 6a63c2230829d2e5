//! # Durable Storage
//!
//! The persistence medium behind the [`StateStore`](crate::StateStore).
//!
//! ## Backends
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      DurableStorage (trait)                             │
//! │                                                                         │
//! │  get_item(name)  set_item(name, text)  remove_item(name)  item_names()  │
//! │       │                                                                 │
//! │       ├──► FileStorage    <dir>/showroomCart.json                       │
//! │       │                   one file per entry, atomic rename on write    │
//! │       │                   names percent-encoded (ñ ──► %C3%B1)          │
//! │       │                                                                 │
//! │       └──► MemoryStorage  BTreeMap<String, String>                      │
//! │                           optional byte quota (tests, ephemeral runs)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Entries are opaque text. The store decides what goes in them (JSON).
//! The trait is synchronous: store reads and writes never suspend.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// File extension used by [`FileStorage`].
const ENTRY_EXTENSION: &str = "json";

/// Longest encoded entry name, leaving room for the extensions within the
/// usual 255-byte file name limit.
const MAX_ENCODED_NAME_LEN: usize = 200;

// =============================================================================
// Trait
// =============================================================================

/// A named-entry text store.
pub trait DurableStorage: Send + Sync {
    /// Reads an entry. `Ok(None)` if it was never written.
    fn get_item(&self, name: &str) -> StorageResult<Option<String>>;

    /// Creates or replaces an entry.
    fn set_item(&self, name: &str, value: &str) -> StorageResult<()>;

    /// Deletes an entry. Deleting a missing entry is not an error.
    fn remove_item(&self, name: &str) -> StorageResult<()>;

    /// Names of all stored entries, sorted.
    fn item_names(&self) -> StorageResult<Vec<String>>;
}

// =============================================================================
// MemoryStorage
// =============================================================================

/// In-process storage. Contents vanish with the process.
///
/// ## Quota
/// With a quota set, a write that would push the total size of all entries
/// (names plus values, in bytes) above it fails with `QuotaExceeded`, the
/// way a browser's per-origin storage does.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    /// Creates unbounded storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates storage that rejects writes beyond `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        MemoryStorage {
            entries: Mutex::new(BTreeMap::new()),
            quota: Some(quota_bytes),
        }
    }

    /// Total bytes currently used.
    pub fn used_bytes(&self) -> usize {
        self.lock()
            .iter()
            .map(|(name, value)| name.len() + value.len())
            .sum()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DurableStorage for MemoryStorage {
    fn get_item(&self, name: &str) -> StorageResult<Option<String>> {
        Ok(self.lock().get(name).cloned())
    }

    fn set_item(&self, name: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.lock();

        if let Some(quota) = self.quota {
            let others: usize = entries
                .iter()
                .filter(|(existing, _)| existing.as_str() != name)
                .map(|(existing, text)| existing.len() + text.len())
                .sum();
            let needed = others + name.len() + value.len();

            if needed > quota {
                return Err(StorageError::QuotaExceeded {
                    name: name.to_string(),
                    needed,
                    quota,
                });
            }
        }

        entries.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, name: &str) -> StorageResult<()> {
        self.lock().remove(name);
        Ok(())
    }

    fn item_names(&self) -> StorageResult<Vec<String>> {
        Ok(self.lock().keys().cloned().collect())
    }
}

// =============================================================================
// FileStorage
// =============================================================================

/// One JSON file per entry inside a directory.
///
/// ## Layout
/// ```text
/// ~/.local/share/showroom/storage/
/// ├── showroomCart.json
/// ├── showroomUsers.json
/// └── showroomCurrentUser.json
/// ```
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Opens (and creates if needed) a storage directory.
    ///
    /// ## Errors
    /// `Io` if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(dir.display().to_string(), e))?;

        info!(dir = %dir.display(), "File storage opened");
        Ok(FileStorage { dir })
    }

    /// The storage directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Entry names are percent-encoded so any text maps to a single file
    /// inside `dir`.
    fn entry_path(&self, name: &str) -> StorageResult<PathBuf> {
        let encoded = urlencoding::encode(name);

        if name.is_empty() || encoded.len() > MAX_ENCODED_NAME_LEN {
            return Err(StorageError::InvalidName(name.to_string()));
        }

        Ok(self.dir.join(format!("{encoded}.{ENTRY_EXTENSION}")))
    }
}

impl DurableStorage for FileStorage {
    fn get_item(&self, name: &str) -> StorageResult<Option<String>> {
        let path = self.entry_path(name)?;

        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) if e.kind() == ErrorKind::InvalidData => Err(StorageError::corrupt(name, e)),
            Err(e) => Err(StorageError::io(name, e)),
        }
    }

    fn set_item(&self, name: &str, value: &str) -> StorageResult<()> {
        let path = self.entry_path(name)?;
        let staging = path.with_extension(format!("{ENTRY_EXTENSION}.tmp"));

        fs::write(&staging, value).map_err(|e| StorageError::io(name, e))?;
        fs::rename(&staging, &path).map_err(|e| StorageError::io(name, e))?;

        debug!(name, bytes = value.len(), "Entry written");
        Ok(())
    }

    fn remove_item(&self, name: &str) -> StorageResult<()> {
        let path = self.entry_path(name)?;

        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(name, e)),
        }
    }

    fn item_names(&self) -> StorageResult<Vec<String>> {
        let entries =
            fs::read_dir(&self.dir).map_err(|e| StorageError::io(self.dir.display().to_string(), e))?;

        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some(ENTRY_EXTENSION))
            .filter_map(|path| {
                let stem = path.file_stem()?.to_str()?;
                urlencoding::decode(stem).ok().map(|name| name.into_owned())
            })
            .collect();

        names.sort();
        Ok(names)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
