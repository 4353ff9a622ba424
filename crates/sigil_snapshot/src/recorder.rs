//! Accumulating per-leaf fingerprints into one aggregate fingerprint.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sigil_common::{ContentHash, ContentHasher, Ident, Interner};

use crate::error::RecorderError;
use crate::resource::LeafResource;

/// How the identity of a recorded resource is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NormalizationStrategy {
    /// Path relative to the classpath entry root.
    Relative,
    /// File name only.
    NameOnly,
}

impl NormalizationStrategy {
    /// Normalized identity of `leaf`.
    pub fn normalize<'a>(&self, leaf: &'a LeafResource) -> &'a str {
        match self {
            NormalizationStrategy::Relative => &leaf.relative_path,
            NormalizationStrategy::NameOnly => leaf.name(),
        }
    }
}

/// Whether the order of recorded results matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareStrategy {
    /// Results are reduced in recording order.
    Ordered,
    /// Results are reduced in a canonical sorted order.
    Unordered,
}

/// One `(identity, fingerprint)` pair of an aggregate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordedEntry {
    /// Normalized identity.
    pub path: String,
    /// Fingerprint of the resource.
    pub hash: ContentHash,
}

/// The reduced fingerprint of a whole classpath entry.
///
/// Equal aggregates mean dependents need no recompilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateFingerprint {
    /// Combined hash of all entries.
    pub hash: ContentHash,
    /// Entries in reduction order.
    pub entries: Vec<RecordedEntry>,
}

impl AggregateFingerprint {
    /// Number of recorded resources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Receives per-resource fingerprints and reduces them once at the end.
///
/// A recorder is single-use and owned by one snapshot computation.
pub trait ResultRecorder {
    /// Records the fingerprint of a leaf.
    fn record(&mut self, leaf: &LeafResource, hash: ContentHash) -> Result<(), RecorderError>;

    /// Reduces everything recorded so far. Any further call fails.
    fn finish(&mut self) -> Result<AggregateFingerprint, RecorderError>;
}

/// Recorder that interns normalized identities in a shared [`Interner`].
pub struct DefaultResultRecorder {
    normalization: NormalizationStrategy,
    compare: CompareStrategy,
    interner: Arc<Interner>,
    entries: Vec<(Ident, ContentHash)>,
    finished: bool,
}

impl DefaultResultRecorder {
    /// Creates an empty recorder.
    pub fn new(
        normalization: NormalizationStrategy,
        compare: CompareStrategy,
        interner: Arc<Interner>,
    ) -> Self {
        Self {
            normalization,
            compare,
            interner,
            entries: Vec::new(),
            finished: false,
        }
    }

    /// Normalization in effect.
    pub fn normalization(&self) -> NormalizationStrategy {
        self.normalization
    }

    /// Comparison in effect.
    pub fn compare(&self) -> CompareStrategy {
        self.compare
    }

    /// Number of results recorded so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResultRecorder for DefaultResultRecorder {
    fn record(&mut self, leaf: &LeafResource, hash: ContentHash) -> Result<(), RecorderError> {
        if self.finished {
            return Err(RecorderError::AlreadyFinalized);
        }
        let ident = self.interner.get_or_intern(self.normalization.normalize(leaf));
        self.entries.push((ident, hash));
        Ok(())
    }

    fn finish(&mut self) -> Result<AggregateFingerprint, RecorderError> {
        if self.finished {
            return Err(RecorderError::AlreadyFinalized);
        }
        self.finished = true;

        let mut entries: Vec<RecordedEntry> = std::mem::take(&mut self.entries)
            .into_iter()
            .map(|(ident, hash)| RecordedEntry {
                path: self.interner.resolve(ident).to_string(),
                hash,
            })
            .collect();
        if self.compare == CompareStrategy::Unordered {
            entries.sort();
        }

        let mut hasher = ContentHasher::new();
        hasher.update_u64(entries.len() as u64);
        for entry in &entries {
            hasher.update_str(&entry.path).update_hash(&entry.hash);
        }

        Ok(AggregateFingerprint {
            hash: hasher.finish(),
            entries,
        })
    }
}
