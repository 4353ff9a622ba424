//! Memoization of class-signature hashes.
//!
//! A signature cache maps a cache key (derived from the snapshotter
//! configuration and a class file's content hash) to the hash of that class's
//! extracted binary interface. Implementations range from a process-local map
//! to a durable directory-backed store shared between runs.
//!
//! All reads are fail-safe: a missing, corrupt, or incompatible entry is a
//! cache miss, never an error visible to callers.

#![warn(missing_docs)]

pub mod cache;
pub mod entry;
pub mod error;
pub mod manifest;

pub use cache::{
    CacheStats, InMemorySignatureCache, NoopSignatureCache, PersistentSignatureCache,
    SignatureCache,
};
pub use error::CacheError;
