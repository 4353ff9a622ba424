//! Content-addressed storage of individual signature entries.
//!
//! Each entry lives at `<cache_dir>/signatures/<xx>/<key>.sig`, where `xx` is
//! the first two hex digits of the key. A file holds a length-prefixed
//! binary header (magic bytes, format version, the key it was written for,
//! and a checksum of the payload) followed by the 16-byte value hash.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use sigil_common::ContentHash;

use crate::error::CacheError;

/// Magic bytes identifying a sigil signature entry.
const ENTRY_MAGIC: [u8; 4] = *b"SGIL";

/// Current entry format version. Increment on breaking changes to the
/// header or payload layout.
pub const ENTRY_FORMAT_VERSION: u32 = 1;

/// Subdirectory holding the entry shards.
pub const SIGNATURES_SUBDIR: &str = "signatures";

const ENTRY_EXT: &str = "sig";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Header prepended to every stored entry for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryHeader {
    /// Magic bytes: must be `b"SGIL"`.
    pub magic: [u8; 4],

    /// Entry format version.
    pub format_version: u32,

    /// Key the entry was written under.
    pub key: ContentHash,

    /// Content hash of the payload.
    pub checksum: ContentHash,
}

/// Totals reported by [`EntryStore::usage`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    /// Number of entry files.
    pub entries: usize,
    /// Sum of entry file sizes.
    pub bytes: u64,
}

/// Sharded directory of signature entries.
pub struct EntryStore {
    root: PathBuf,
}

impl EntryStore {
    /// Creates a store rooted at `<cache_dir>/signatures`. Nothing is created
    /// on disk until the first write.
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            root: cache_dir.join(SIGNATURES_SUBDIR),
        }
    }

    /// Directory holding the shards.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file path for the entry with the given key.
    pub fn entry_path(&self, key: &ContentHash) -> PathBuf {
        let hex = key.to_string();
        self.root.join(&hex[..2]).join(format!("{hex}.{ENTRY_EXT}"))
    }

    /// Writes an entry, replacing any previous value for `key`.
    ///
    /// The file is written under a temporary name in the shard directory and
    /// renamed into place, so concurrent readers see either the old or the
    /// new complete entry.
    pub fn write(&self, key: &ContentHash, value: &ContentHash) -> Result<(), CacheError> {
        let path = self.entry_path(key);
        let shard = path.parent().unwrap_or(&self.root).to_path_buf();
        std::fs::create_dir_all(&shard).map_err(|e| CacheError::io(&shard, e))?;

        let payload = value.as_bytes();
        let header = EntryHeader {
            magic: ENTRY_MAGIC,
            format_version: ENTRY_FORMAT_VERSION,
            key: *key,
            checksum: ContentHash::from_bytes(payload),
        };
        let output = encode_entry(&header, payload)?;

        let temp = shard.join(format!(
            ".{key}.{}.{}.tmp",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::write(&temp, &output).map_err(|e| CacheError::io(&temp, e))?;
        if let Err(e) = std::fs::rename(&temp, &path) {
            let _ = std::fs::remove_file(&temp);
            return Err(CacheError::io(path, e));
        }
        Ok(())
    }

    /// Reads the entry for `key`, validating its header.
    ///
    /// Returns `None` if the file doesn't exist, the header is invalid, the
    /// format version or key doesn't match, or the checksum doesn't verify.
    pub fn read(&self, key: &ContentHash) -> Option<ContentHash> {
        let raw = std::fs::read(self.entry_path(key)).ok()?;

        if raw.len() < 4 {
            return None;
        }
        let header_len = u32::from_le_bytes(raw[..4].try_into().ok()?) as usize;
        let payload_start = 4usize.checked_add(header_len)?;
        if raw.len() < payload_start {
            return None;
        }

        let header: EntryHeader =
            bincode::serde::decode_from_slice(&raw[4..payload_start], bincode::config::standard())
                .ok()?
                .0;

        if header.magic != ENTRY_MAGIC
            || header.format_version != ENTRY_FORMAT_VERSION
            || header.key != *key
        {
            return None;
        }

        let payload = &raw[payload_start..];
        if ContentHash::from_bytes(payload) != header.checksum {
            return None;
        }
        let value: [u8; ContentHash::LEN] = payload.try_into().ok()?;
        Some(ContentHash::from_raw(value))
    }

    /// Counts entry files and their total size.
    pub fn usage(&self) -> Result<Usage, CacheError> {
        let mut usage = Usage::default();
        for path in self.entry_files()? {
            let meta = std::fs::metadata(&path).map_err(|e| CacheError::io(&path, e))?;
            usage.entries += 1;
            usage.bytes += meta.len();
        }
        Ok(usage)
    }

    /// Deletes every entry and returns how many were removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let files = self.entry_files()?;
        let removed = files.len();
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root).map_err(|e| CacheError::io(&self.root, e))?;
        }
        Ok(removed)
    }

    fn entry_files(&self) -> Result<Vec<PathBuf>, CacheError> {
        let mut files = Vec::new();
        if !self.root.exists() {
            return Ok(files);
        }
        for shard in read_dir(&self.root)? {
            if !shard.is_dir() {
                continue;
            }
            for path in read_dir(&shard)? {
                if path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXT) {
                    files.push(path);
                }
            }
        }
        Ok(files)
    }
}

fn read_dir(dir: &Path) -> Result<Vec<PathBuf>, CacheError> {
    std::fs::read_dir(dir)
        .map_err(|e| CacheError::io(dir, e))?
        .map(|entry| entry.map(|e| e.path()).map_err(|e| CacheError::io(dir, e)))
        .collect()
}

fn encode_entry(header: &EntryHeader, payload: &[u8]) -> Result<Vec<u8>, CacheError> {
    let header_bytes = bincode::serde::encode_to_vec(header, bincode::config::standard())
        .map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;

    // 4-byte header length (little-endian) + header + payload
    let header_len = header_bytes.len() as u32;
    let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
    output.extend_from_slice(&header_len.to_le_bytes());
    output.extend_from_slice(&header_bytes);
    output.extend_from_slice(payload);
    Ok(output)
}
