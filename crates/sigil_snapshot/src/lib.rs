//! ABI-aware snapshotting of compile classpath entries.
//!
//! A classpath entry is presented as a [`Resource`] tree. The
//! [`ClasspathEntrySnapshotter`] visits every `.class` leaf, resolves its
//! fingerprint from the [`SignatureCache`](sigil_cache::SignatureCache) or by
//! extracting the class's binary interface, and hands the result to a
//! [`ResultRecorder`], which reduces all per-leaf fingerprints into one
//! order-independent [`AggregateFingerprint`] for the entry.

#![warn(missing_docs)]

pub mod error;
pub mod recorder;
pub mod resource;
pub mod snapshotter;
pub mod walk;

pub use error::{RecorderError, SnapshotError};
pub use recorder::{
    AggregateFingerprint, CompareStrategy, DefaultResultRecorder, NormalizationStrategy,
    RecordedEntry, ResultRecorder,
};
pub use resource::{ContentSnapshot, FileKind, LeafResource, LeafSource, Resource, ResourceTree};
pub use snapshotter::{
    ClasspathEntrySnapshotter, Signature, SnapshotterConfig, CLASS_FILE_SUFFIX,
};
pub use walk::{enumerate_directory, for_each_file};
