//! The signature cache abstraction and its implementations.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use sigil_common::ContentHash;

use crate::entry::EntryStore;
use crate::error::CacheError;
use crate::manifest::StoreManifest;

/// A shared key-value store from cache key to ABI signature hash.
///
/// Implementations must be safe for concurrent use from many snapshot
/// workers. Concurrent `put`s of the same key are last-writer-wins; since a
/// key fully determines its value, every writer stores the same value.
pub trait SignatureCache: Send + Sync {
    /// Looks up a previously stored signature hash.
    fn get(&self, key: &ContentHash) -> Option<ContentHash>;

    /// Stores a signature hash. Failures are swallowed; a later `get` simply
    /// misses.
    fn put(&self, key: ContentHash, value: ContentHash);
}

/// Entry count and disk usage of a persistent store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    /// Number of stored entries.
    pub entries: usize,
    /// Total bytes on disk used by entries.
    pub bytes: u64,
}

/// Process-local cache backed by a hash map.
#[derive(Debug, Default)]
pub struct InMemorySignatureCache {
    entries: RwLock<HashMap<ContentHash, ContentHash>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl InMemorySignatureCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |map| map.len())
    }

    /// `true` when nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful lookups.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of failed lookups.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

impl SignatureCache for InMemorySignatureCache {
    fn get(&self, key: &ContentHash) -> Option<ContentHash> {
        let found = self
            .entries
            .read()
            .ok()
            .and_then(|map| map.get(key).copied());
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    fn put(&self, key: ContentHash, value: ContentHash) {
        if let Ok(mut map) = self.entries.write() {
            map.insert(key, value);
        }
    }
}

/// A cache that never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSignatureCache;

impl SignatureCache for NoopSignatureCache {
    fn get(&self, _key: &ContentHash) -> Option<ContentHash> {
        None
    }

    fn put(&self, _key: ContentHash, _value: ContentHash) {}
}

/// Durable cache stored in a directory, shared between runs.
///
/// Opening a directory whose manifest is missing or incompatible discards
/// any existing entries and starts fresh.
pub struct PersistentSignatureCache {
    cache_dir: PathBuf,
    store: EntryStore,
}

impl PersistentSignatureCache {
    /// Opens (or creates) the store at `cache_dir` for the given tool version.
    pub fn open(cache_dir: &Path, tool_version: &str) -> Result<Self, CacheError> {
        let store = EntryStore::new(cache_dir);
        let compatible = StoreManifest::load(cache_dir).is_some_and(|m| m.is_compatible(tool_version));
        if !compatible {
            let removed = store.clear()?;
            if removed > 0 {
                tracing::info!(
                    dir = %cache_dir.display(),
                    removed,
                    "discarded signature cache written by an incompatible version"
                );
            }
            StoreManifest::new(tool_version).save(cache_dir)?;
        }
        tracing::debug!(dir = %cache_dir.display(), "opened signature cache");
        Ok(Self {
            cache_dir: cache_dir.to_path_buf(),
            store,
        })
    }

    /// Root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Counts stored entries and their size on disk.
    pub fn stats(&self) -> Result<CacheStats, CacheError> {
        let usage = self.store.usage()?;
        Ok(CacheStats {
            entries: usage.entries,
            bytes: usage.bytes,
        })
    }

    /// Deletes every entry, keeping the manifest. Returns the number removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        self.store.clear()
    }
}

impl SignatureCache for PersistentSignatureCache {
    fn get(&self, key: &ContentHash) -> Option<ContentHash> {
        self.store.read(key)
    }

    fn put(&self, key: ContentHash, value: ContentHash) {
        if let Err(err) = self.store.write(&key, &value) {
            tracing::warn!(%key, error = %err, "failed to store signature");
        }
    }
}
