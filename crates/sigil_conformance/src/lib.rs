//! Conformance test helpers for sigil classpath snapshotting.
//!
//! Provides a fluent [`ClassBuilder`] that emits real class-file bytes, a
//! temporary on-disk [`Classpath`] directory, and a [`Harness`] bundling a
//! snapshotter with an observable in-memory cache and diagnostic sink.

#![warn(missing_docs)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sigil_cache::InMemorySignatureCache;
use sigil_classfile::{
    AccessFlags, Annotation, ClassFile, ClassWriter, ConstantValue, Member, RawAttribute,
};
use sigil_diagnostics::{Diagnostic, DiagnosticSink};
use sigil_snapshot::{AggregateFingerprint, ClasspathEntrySnapshotter, SnapshotterConfig};
use tempfile::TempDir;

/// Builds class files for fixtures.
#[derive(Debug, Clone)]
pub struct ClassBuilder {
    class: ClassFile,
}

impl ClassBuilder {
    /// A public class with the given binary name.
    pub fn new(name: &str) -> Self {
        Self {
            class: ClassFile::new(name),
        }
    }

    /// A public interface with the given binary name.
    pub fn interface(name: &str) -> Self {
        let mut builder = Self::new(name);
        builder.class.access = AccessFlags::PUBLIC | AccessFlags::INTERFACE | AccessFlags::ABSTRACT;
        builder
    }

    /// Replaces the class access flags.
    pub fn access(mut self, access: AccessFlags) -> Self {
        self.class.access = access;
        self
    }

    /// Adds a directly implemented interface.
    pub fn implements(mut self, interface: &str) -> Self {
        self.class.interfaces.push(interface.to_string());
        self
    }

    /// Adds a field.
    pub fn field(mut self, access: AccessFlags, name: &str, descriptor: &str) -> Self {
        self.class.fields.push(Member::new(access, name, descriptor));
        self
    }

    /// Adds a field with a compile-time constant.
    pub fn constant_field(
        mut self,
        access: AccessFlags,
        name: &str,
        descriptor: &str,
        value: ConstantValue,
    ) -> Self {
        let mut field = Member::new(access, name, descriptor);
        field.attributes.constant_value = Some(value);
        self.class.fields.push(field);
        self
    }

    /// Adds a method without a body.
    pub fn method(mut self, access: AccessFlags, name: &str, descriptor: &str) -> Self {
        self.class.methods.push(Member::new(access, name, descriptor));
        self
    }

    /// Adds a method whose `Code` attribute carries `body` verbatim.
    pub fn method_with_body(
        mut self,
        access: AccessFlags,
        name: &str,
        descriptor: &str,
        body: &[u8],
    ) -> Self {
        let mut method = Member::new(access, name, descriptor);
        method.attributes.other.push(RawAttribute::new("Code", body));
        self.class.methods.push(method);
        self
    }

    /// Adds a runtime-visible marker annotation to the class.
    pub fn annotated(mut self, type_descriptor: &str) -> Self {
        self.class
            .attributes
            .visible_annotations
            .push(Annotation::marker(type_descriptor));
        self
    }

    /// Sets the generic signature of the class.
    pub fn signature(mut self, signature: &str) -> Self {
        self.class.attributes.signature = Some(signature.to_string());
        self
    }

    /// Appends a class attribute with verbatim contents. Constant pool
    /// slot 1 always holds the class name.
    pub fn raw_attribute(mut self, name: &str, data: Vec<u8>) -> Self {
        self.class.attributes.other.push(RawAttribute::new(name, data));
        self
    }

    /// Records a `SourceFile` attribute.
    pub fn source_file(mut self, name: &str) -> Self {
        self.class
            .attributes
            .other
            .push(RawAttribute::new("SourceFile", name.as_bytes()));
        self
    }

    /// Sets the class file major version.
    pub fn major_version(mut self, version: u16) -> Self {
        self.class.major_version = version;
        self
    }

    /// The model built so far.
    pub fn model(&self) -> &ClassFile {
        &self.class
    }

    /// Encodes the class file.
    ///
    /// Panics if the model exceeds class-file limits.
    pub fn build(&self) -> Vec<u8> {
        ClassWriter::new().write(&self.class).unwrap()
    }
}

/// A classpath directory in a temporary location.
pub struct Classpath {
    dir: TempDir,
}

impl Classpath {
    /// Creates an empty classpath directory.
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// Root of the classpath.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Writes `bytes` to `relative`, creating parent directories.
    pub fn write(&self, relative: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, bytes).unwrap();
        path
    }

    /// Writes a class at the path matching its binary name.
    pub fn write_class(&self, class: &ClassBuilder) -> PathBuf {
        let relative = format!("{}.class", class.model().name);
        self.write(&relative, &class.build())
    }

    /// Deletes a file.
    pub fn remove(&self, relative: &str) {
        std::fs::remove_file(self.dir.path().join(relative)).unwrap();
    }
}

impl Default for Classpath {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshotter wired to an in-memory cache and a diagnostic sink.
pub struct Harness {
    /// The cache shared with the snapshotter.
    pub cache: Arc<InMemorySignatureCache>,
    /// Sink receiving warnings.
    pub sink: Arc<DiagnosticSink>,
    /// The snapshotter under test.
    pub snapshotter: ClasspathEntrySnapshotter,
}

impl Harness {
    /// Default configuration: every package is API-bearing.
    pub fn new() -> Self {
        Self::with_config(SnapshotterConfig::default())
    }

    /// A harness with a fresh cache and the given configuration.
    pub fn with_config(config: SnapshotterConfig) -> Self {
        Self::sharing_cache(Arc::new(InMemorySignatureCache::new()), config)
    }

    /// A harness reusing `cache`, as a second build would.
    pub fn sharing_cache(cache: Arc<InMemorySignatureCache>, config: SnapshotterConfig) -> Self {
        let sink = Arc::new(DiagnosticSink::new());
        let snapshotter = ClasspathEntrySnapshotter::new(cache.clone(), config, Arc::clone(&sink));
        Self {
            cache,
            sink,
            snapshotter,
        }
    }

    /// Snapshots a classpath directory.
    pub fn snapshot(&self, classpath: &Classpath) -> AggregateFingerprint {
        self.snapshotter.snapshot_directory(classpath.root()).unwrap()
    }

    /// Warnings emitted so far.
    pub fn warnings(&self) -> Vec<Diagnostic> {
        self.sink
            .diagnostics()
            .into_iter()
            .filter(|d| !d.severity.is_error())
            .collect()
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Access shorthand.
pub const PUBLIC: AccessFlags = AccessFlags::PUBLIC;
/// Access shorthand.
pub const PRIVATE: AccessFlags = AccessFlags::PRIVATE;
