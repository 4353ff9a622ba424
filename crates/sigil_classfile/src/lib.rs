//! Class file parsing and binary-interface (ABI) extraction.
//!
//! [`ClassFile::parse`] reads the JVM class-file format into an owned model,
//! skipping method bodies and debug metadata without interpreting them.
//! [`ApiClassExtractor`] decides whether a parsed class contributes to a
//! public API and, if so, produces a canonical byte encoding of only its
//! externally observable surface. [`ClassWriter`] emits class-file bytes from
//! the same model.
//!
//! Every structural problem in the input surfaces as a [`ClassFileError`];
//! the parser never returns a partially decoded class.

#![warn(missing_docs)]

pub mod abi;
pub mod access;
pub mod annotation;
pub mod constant_pool;
pub mod descriptor;
pub mod error;
pub mod model;
pub mod parser;
pub mod reader;
pub mod writer;

pub use abi::{ApiClass, ApiClassExtractor, ApiField, ApiInnerClass, ApiMethod, EXTRACTOR_VERSION};
pub use access::AccessFlags;
pub use annotation::{Annotation, ElementValue};
pub use constant_pool::{Constant, ConstantPool, ConstantValue, JavaString};
pub use error::ClassFileError;
pub use model::{Attributes, ClassFile, InnerClass, Member, RawAttribute};
pub use writer::ClassWriter;
