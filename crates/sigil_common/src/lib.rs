//! Shared foundational types used across the sigil change-detection crates.
//!
//! This crate provides the fixed-width content hash every fingerprint is built
//! from, a streaming hasher for composite keys, a thread-safe path interner, and
//! the common internal-error result type.

#![warn(missing_docs)]

pub mod hash;
pub mod ident;
pub mod result;

pub use hash::{ContentHash, ContentHasher, ParseHashError};
pub use ident::{Ident, Interner};
pub use result::{InternalError, SigilResult};
