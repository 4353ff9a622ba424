//! Store manifest recording which format and tool wrote a cache directory.
//!
//! The manifest is stored as `manifest.json` in the cache directory. A store
//! whose manifest is missing, unreadable, or written by a different format or
//! tool version is discarded and started fresh.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::entry::ENTRY_FORMAT_VERSION;
use crate::error::CacheError;

/// Name of the manifest file within the cache directory.
const MANIFEST_FILE: &str = "manifest.json";

/// Identity of the writer of a signature store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreManifest {
    /// Entry format version.
    pub format_version: u32,

    /// Version of the tool that created the store.
    pub tool_version: String,
}

impl StoreManifest {
    /// Creates a manifest for the current entry format.
    pub fn new(tool_version: &str) -> Self {
        Self {
            format_version: ENTRY_FORMAT_VERSION,
            tool_version: tool_version.to_string(),
        }
    }

    /// Loads the manifest from the cache directory, returning `None` if
    /// the file doesn't exist or can't be parsed.
    pub fn load(cache_dir: &Path) -> Option<Self> {
        let path = cache_dir.join(MANIFEST_FILE);
        let content = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Saves the manifest, creating the cache directory if needed.
    pub fn save(&self, cache_dir: &Path) -> Result<(), CacheError> {
        std::fs::create_dir_all(cache_dir).map_err(|e| CacheError::io(cache_dir, e))?;
        let path = cache_dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(self).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|e| CacheError::io(path, e))
    }

    /// Returns `true` if entries written under this manifest are readable by
    /// the given tool version.
    pub fn is_compatible(&self, tool_version: &str) -> bool {
        self.format_version == ENTRY_FORMAT_VERSION && self.tool_version == tool_version
    }
}
