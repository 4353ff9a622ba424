//! Error types for snapshotting.

use std::path::PathBuf;

/// Errors raised by a [`ResultRecorder`](crate::ResultRecorder).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecorderError {
    /// The recorder was used after `finish`.
    #[error("result recorder has already been finalized")]
    AlreadyFinalized,
}

/// Errors that abort the snapshot of a classpath entry.
///
/// Malformed class files are not errors: they fall back to hashing the raw
/// content and produce a warning instead.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// A tree was presented where only a leaf resource is valid.
    #[error("trees cannot be snapshotted as classpath resources: {path}")]
    UnsupportedShape {
        /// Relative path of the offending tree.
        path: String,
    },

    /// The bytes of a resource could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A file name under a classpath directory is not valid UTF-8 and
    /// cannot be given a relative path.
    #[error("file name is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// The offending path.
        path: PathBuf,
    },

    /// The recorder rejected a result.
    #[error(transparent)]
    Recorder(#[from] RecorderError),
}
