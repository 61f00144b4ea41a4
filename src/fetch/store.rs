//! Persistent asset cache backends.
//!
//! The fetcher is agnostic to the backing store: in-memory for a single
//! run, or an on-disk directory (hex filenames keyed by locator hash) that
//! lets later builds skip the network entirely.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;

use super::{AssetRef, LocatorHash};

/// Key-value seam backing the asset cache
pub trait AssetStore: Send + Sync {
    /// Look up a previously persisted payload by locator hash.
    fn get(&self, hash: &LocatorHash) -> Option<AssetRef>;

    /// Persist a payload, returning a reference to it.
    fn put(&self, hash: &LocatorHash, body: &[u8]) -> io::Result<AssetRef>;
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-memory store; lives for one process at most
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<LocatorHash, Arc<[u8]>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload bytes for a stored entry (primarily for tests and embedding).
    pub fn payload(&self, hash: &LocatorHash) -> Option<Arc<[u8]>> {
        self.entries.get(hash).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AssetStore for MemoryStore {
    fn get(&self, hash: &LocatorHash) -> Option<AssetRef> {
        self.entries
            .get(hash)
            .map(|_| AssetRef::new(format!("mem:{hash}")))
    }

    fn put(&self, hash: &LocatorHash, body: &[u8]) -> io::Result<AssetRef> {
        self.entries.insert(hash.clone(), Arc::from(body));
        Ok(AssetRef::new(format!("mem:{hash}")))
    }
}

// =============================================================================
// DiskStore
// =============================================================================

/// On-disk store: one `<hash>.bin` file per locator under a cache directory
#[derive(Debug)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    /// Open (creating if needed) a cache directory.
    pub fn open(dir: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn entry_path(&self, hash: &LocatorHash) -> PathBuf {
        self.dir.join(format!("{hash}.bin"))
    }
}

impl AssetStore for DiskStore {
    fn get(&self, hash: &LocatorHash) -> Option<AssetRef> {
        let path = self.entry_path(hash);
        path.is_file()
            .then(|| AssetRef::new(path.display().to_string()))
    }

    fn put(&self, hash: &LocatorHash, body: &[u8]) -> io::Result<AssetRef> {
        let path = self.entry_path(hash);
        // Write to a sibling temp file and rename into place, so an
        // interrupted write never leaves a truncated `.bin` entry behind
        let tmp = self.dir.join(format!("{hash}.tmp"));
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, &path)?;
        Ok(AssetRef::new(path.display().to_string()))
    }
}

// =============================================================================
// Tests
// =============================================================================
