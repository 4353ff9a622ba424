//! The classpath entry snapshotter.
//!
//! For each `.class` leaf the snapshotter resolves one of three outcomes:
//!
//! - a signature hash of the class's extracted binary interface,
//! - nothing, when the class cannot contribute to an API,
//! - the raw content hash, when the class file is malformed.
//!
//! File-backed leaves are memoized in the signature cache under a key that
//! combines the snapshotter's configuration fingerprint with the leaf's
//! content hash, so a change to extraction semantics orphans every earlier
//! entry instead of reusing it. A value is only stored when the bytes it was
//! computed from hash to the leaf's snapshot.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use sigil_cache::SignatureCache;
use sigil_classfile::{ApiClassExtractor, ClassFile, ClassFileError, EXTRACTOR_VERSION};
use sigil_common::{ContentHash, ContentHasher, Interner};
use sigil_config::SigilConfig;
use sigil_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};

use crate::error::SnapshotError;
use crate::recorder::{
    AggregateFingerprint, CompareStrategy, DefaultResultRecorder, NormalizationStrategy,
    ResultRecorder,
};
use crate::resource::{FileKind, LeafResource, Resource};
use crate::walk::for_each_file;

/// Only leaves whose name ends with this suffix are fingerprinted.
pub const CLASS_FILE_SUFFIX: &str = ".class";

const IGNORED_MARKER: &[u8] = b"Ignored ABI";

/// Resolved fingerprint of one class leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    /// The leaf contributes this hash.
    Present(ContentHash),
    /// The leaf contributes nothing.
    Ignored,
}

impl Signature {
    /// Reserved cache value standing for [`Signature::Ignored`].
    pub fn ignored_sentinel() -> ContentHash {
        ContentHash::from_bytes(IGNORED_MARKER)
    }

    fn from_cache_value(value: ContentHash) -> Self {
        if value == Self::ignored_sentinel() {
            Signature::Ignored
        } else {
            Signature::Present(value)
        }
    }

    fn to_cache_value(self) -> ContentHash {
        match self {
            Signature::Present(hash) => hash,
            Signature::Ignored => Self::ignored_sentinel(),
        }
    }
}

/// Settings that affect extraction and therefore the cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotterConfig {
    /// API-bearing packages in `/`-separated form; empty means all.
    pub exported_packages: BTreeSet<String>,
}

impl SnapshotterConfig {
    /// Creates a configuration exporting the given packages.
    pub fn with_exported_packages<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            exported_packages: packages
                .into_iter()
                .map(|p| p.as_ref().replace('.', "/"))
                .collect(),
        }
    }

    fn fingerprint(&self) -> ContentHash {
        let mut hasher = ContentHasher::new();
        hasher
            .update_str("sigil/classpath-entry-abi")
            .update_u64(u64::from(EXTRACTOR_VERSION))
            .update_u64(self.exported_packages.len() as u64);
        for package in &self.exported_packages {
            hasher.update_str(package);
        }
        hasher.finish()
    }
}

impl From<&SigilConfig> for SnapshotterConfig {
    fn from(config: &SigilConfig) -> Self {
        Self::with_exported_packages(&config.extraction.exported_packages)
    }
}

/// Fingerprints compile classpath entries by the ABI of their classes.
///
/// One instance can be shared by many threads; each call creates its own
/// recorder.
pub struct ClasspathEntrySnapshotter {
    cache: Arc<dyn SignatureCache>,
    extractor: ApiClassExtractor,
    config_fingerprint: ContentHash,
    interner: Arc<Interner>,
    sink: Arc<DiagnosticSink>,
}

impl ClasspathEntrySnapshotter {
    /// Creates a snapshotter. The configuration fingerprint is computed once here.
    pub fn new(
        cache: Arc<dyn SignatureCache>,
        config: SnapshotterConfig,
        sink: Arc<DiagnosticSink>,
    ) -> Self {
        let config_fingerprint = config.fingerprint();
        Self {
            cache,
            extractor: ApiClassExtractor::new(&config.exported_packages),
            config_fingerprint,
            interner: Arc::new(Interner::new()),
            sink,
        }
    }

    /// Replaces the path interner shared by recorders.
    pub fn with_interner(mut self, interner: Arc<Interner>) -> Self {
        self.interner = interner;
        self
    }

    /// Hash of the configuration, folded into every cache key.
    pub fn config_fingerprint(&self) -> ContentHash {
        self.config_fingerprint
    }

    /// Cache key of a leaf under this snapshotter's configuration.
    pub fn cache_key(&self, leaf: &LeafResource) -> ContentHash {
        ContentHasher::new()
            .update_hash(&self.config_fingerprint)
            .update_hash(&leaf.snapshot.content_hash)
            .finish()
    }

    /// A fresh recorder: relative paths, order-independent.
    pub fn create_recorder(&self) -> DefaultResultRecorder {
        DefaultResultRecorder::new(
            NormalizationStrategy::Relative,
            CompareStrategy::Unordered,
            Arc::clone(&self.interner),
        )
    }

    /// Snapshots a single resource into `recorder`.
    ///
    /// Trees cannot be classpath resources and are rejected; non-class
    /// leaves are skipped.
    pub fn snapshot_resource(
        &self,
        resource: &Resource,
        recorder: &mut dyn ResultRecorder,
    ) -> Result<(), SnapshotError> {
        match resource {
            Resource::Leaf(leaf) => self.snapshot_leaf(leaf, recorder),
            Resource::Tree(tree) => Err(SnapshotError::UnsupportedShape {
                path: tree.relative_path.clone(),
            }),
        }
    }

    /// Snapshots a whole classpath entry: every leaf of a tree, or the one leaf.
    pub fn snapshot_entry(&self, entry: &Resource) -> Result<AggregateFingerprint, SnapshotError> {
        let mut recorder = self.create_recorder();
        match entry {
            Resource::Tree(tree) => {
                for leaf in tree.leaves() {
                    self.snapshot_leaf(leaf, &mut recorder)?;
                }
            }
            Resource::Leaf(leaf) => self.snapshot_leaf(leaf, &mut recorder)?,
        }
        let aggregate = recorder.finish()?;
        tracing::debug!(
            entry = entry.relative_path(),
            classes = aggregate.len(),
            hash = %aggregate.hash,
            "snapshotted classpath entry"
        );
        Ok(aggregate)
    }

    /// Snapshots a classpath directory.
    ///
    /// Equivalent to [`snapshot_entry`](Self::snapshot_entry) on the tree
    /// from [`enumerate_directory`](crate::enumerate_directory), but class
    /// files are read one at a time and other files are not read at all.
    pub fn snapshot_directory(&self, root: &Path) -> Result<AggregateFingerprint, SnapshotError> {
        let mut recorder = self.create_recorder();
        for_each_file(root, |relative_path, path| {
            if !relative_path.ends_with(CLASS_FILE_SUFFIX) {
                return Ok(());
            }
            let leaf = LeafResource::from_file(relative_path, path)?;
            self.snapshot_leaf(&leaf, &mut recorder)
        })?;
        let aggregate = recorder.finish()?;
        tracing::debug!(
            entry = %root.display(),
            classes = aggregate.len(),
            hash = %aggregate.hash,
            "snapshotted classpath directory"
        );
        Ok(aggregate)
    }

    fn snapshot_leaf(
        &self,
        leaf: &LeafResource,
        recorder: &mut dyn ResultRecorder,
    ) -> Result<(), SnapshotError> {
        if !leaf.name().ends_with(CLASS_FILE_SUFFIX) {
            return Ok(());
        }
        if let Signature::Present(hash) = self.resolve(leaf)? {
            recorder.record(leaf, hash)?;
        }
        Ok(())
    }

    fn resolve(&self, leaf: &LeafResource) -> Result<Signature, SnapshotError> {
        // Only existing files have content worth keying on.
        let key = (leaf.has_stable_identity() && leaf.snapshot.kind == FileKind::RegularFile)
            .then(|| self.cache_key(leaf));

        if let Some(key) = &key {
            if let Some(value) = self.cache.get(key) {
                tracing::trace!(resource = %leaf.relative_path, "signature cache hit");
                return Ok(Signature::from_cache_value(value));
            }
            tracing::trace!(resource = %leaf.relative_path, "signature cache miss");
        }

        let bytes = leaf.read_content()?;
        let signature = self.compute(leaf, &bytes);
        if let Some(key) = key {
            if ContentHash::from_bytes(&bytes) == leaf.snapshot.content_hash {
                self.cache.put(key, signature.to_cache_value());
            } else {
                tracing::debug!(
                    resource = %leaf.relative_path,
                    "content changed since it was snapshotted, not caching"
                );
            }
        }
        Ok(signature)
    }

    fn compute(&self, leaf: &LeafResource, bytes: &[u8]) -> Signature {
        match self.extract_signature(bytes) {
            Ok(signature) => signature,
            Err(err) => {
                tracing::warn!(
                    resource = %leaf.relative_path,
                    error = %err,
                    "malformed class file, falling back to content hash"
                );
                self.sink.emit(malformed_class(leaf, &err));
                Signature::Present(ContentHash::from_bytes(bytes))
            }
        }
    }

    fn extract_signature(&self, bytes: &[u8]) -> Result<Signature, ClassFileError> {
        let class = ClassFile::parse(bytes)?;
        if !self.extractor.is_eligible(&class) {
            return Ok(Signature::Ignored);
        }
        Ok(match self.extractor.extract(&class)? {
            Some(abi) => Signature::Present(ContentHash::from_bytes(&abi)),
            None => Signature::Ignored,
        })
    }
}

fn malformed_class(leaf: &LeafResource, err: &ClassFileError) -> Diagnostic {
    Diagnostic::warning(
        DiagnosticCode::MALFORMED_CLASS,
        format!(
            "malformed class file `{}` found on compile classpath; referencing it from source will fail to compile",
            leaf.name()
        ),
    )
    .with_resource(leaf.relative_path.clone())
    .with_note(format!("parse error: {err}"))
    .with_note("malformed classes on the compile classpath will become a hard error in a future version")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecordedEntry;
    use crate::resource::{ContentSnapshot, LeafSource, ResourceTree};
    use sigil_cache::InMemorySignatureCache;
    use sigil_classfile::{AccessFlags, ClassWriter, Member, RawAttribute};

    fn class_bytes(name: &str, customize: impl FnOnce(&mut ClassFile)) -> Vec<u8> {
        let mut class = ClassFile::new(name);
        class.methods.push(Member::new(AccessFlags::PUBLIC, "run", "()V"));
        customize(&mut class);
        ClassWriter::new().write(&class).unwrap()
    }

    struct Fixture {
        cache: Arc<InMemorySignatureCache>,
        sink: Arc<DiagnosticSink>,
        snapshotter: ClasspathEntrySnapshotter,
    }

    fn fixture(config: SnapshotterConfig) -> Fixture {
        let cache = Arc::new(InMemorySignatureCache::new());
        let sink = Arc::new(DiagnosticSink::new());
        let snapshotter = ClasspathEntrySnapshotter::new(cache.clone(), config, sink.clone());
        Fixture {
            cache,
            sink,
            snapshotter,
        }
    }

    fn file_leaf(dir: &Path, relative: &str, bytes: &[u8]) -> LeafResource {
        let path = dir.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, bytes).unwrap();
        LeafResource::from_file(relative, path).unwrap()
    }

    fn record_one(snapshotter: &ClasspathEntrySnapshotter, leaf: LeafResource) -> Vec<RecordedEntry> {
        let mut recorder = snapshotter.create_recorder();
        snapshotter
            .snapshot_resource(&Resource::Leaf(leaf), &mut recorder)
            .unwrap();
        recorder.finish().unwrap().entries
    }

    #[test]
    fn non_class_leaves_are_skipped() {
        let f = fixture(SnapshotterConfig::default());
        let entries = record_one(&f.snapshotter, LeafResource::from_bytes("resource.txt", b"text".to_vec()));
        assert!(entries.is_empty());
        assert_eq!(f.cache.hits() + f.cache.misses(), 0);
        assert!(f.cache.is_empty());
    }

    #[test]
    fn trees_are_rejected_as_resources() {
        let f = fixture(SnapshotterConfig::default());
        let mut recorder = f.snapshotter.create_recorder();
        let err = f
            .snapshotter
            .snapshot_resource(&Resource::Tree(ResourceTree::new("lib")), &mut recorder)
            .unwrap_err();
        assert!(matches!(err, SnapshotError::UnsupportedShape { path } if path == "lib"));
    }

    #[test]
    fn file_backed_leaf_is_memoized() {
        let dir = tempfile::tempdir().unwrap();
        let f = fixture(SnapshotterConfig::default());
        let leaf = file_leaf(dir.path(), "a/A.class", &class_bytes("a/A", |_| {}));

        let first = record_one(&f.snapshotter, leaf.clone());
        assert_eq!(first.len(), 1);
        assert_eq!(f.cache.len(), 1);
        assert_eq!(
            f.cache.get(&f.snapshotter.cache_key(&leaf)),
            Some(first[0].hash)
        );

        let second = record_one(&f.snapshotter, leaf);
        assert_eq!(first, second);
    }

    #[test]
    fn cache_hit_skips_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let f = fixture(SnapshotterConfig::default());
        let leaf = file_leaf(dir.path(), "A.class", b"not even a class file");
        let planted = ContentHash::from_bytes(b"planted");
        f.cache.put(f.snapshotter.cache_key(&leaf), planted);

        let entries = record_one(&f.snapshotter, leaf);
        assert_eq!(entries[0].hash, planted);
        assert_eq!(f.sink.warning_count(), 0);
    }

    #[test]
    fn cached_sentinel_records_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let f = fixture(SnapshotterConfig::default());
        let leaf = file_leaf(dir.path(), "A.class", &class_bytes("A", |_| {}));
        f.cache
            .put(f.snapshotter.cache_key(&leaf), Signature::ignored_sentinel());
        assert!(record_one(&f.snapshotter, leaf).is_empty());
    }

    #[test]
    fn transient_leaf_is_computed_but_never_cached() {
        let f = fixture(SnapshotterConfig::default());
        let leaf = LeafResource::from_bytes("A.class", class_bytes("A", |_| {}));
        let entries = record_one(&f.snapshotter, leaf);
        assert_eq!(entries.len(), 1);
        assert!(f.cache.is_empty());
        assert_eq!(f.cache.hits() + f.cache.misses(), 0);
    }

    #[test]
    fn synthetic_class_caches_ignored_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let f = fixture(SnapshotterConfig::default());
        let bytes = class_bytes("A", |c| c.access = c.access | AccessFlags::SYNTHETIC);
        let leaf = file_leaf(dir.path(), "A.class", &bytes);

        assert!(record_one(&f.snapshotter, leaf.clone()).is_empty());
        assert_eq!(
            f.cache.get(&f.snapshotter.cache_key(&leaf)),
            Some(Signature::ignored_sentinel())
        );
    }

    #[test]
    fn malformed_class_falls_back_to_content_hash() {
        let dir = tempfile::tempdir().unwrap();
        let f = fixture(SnapshotterConfig::default());
        let mut bytes = class_bytes("A", |_| {});
        bytes.truncate(bytes.len() - 3);
        let leaf = file_leaf(dir.path(), "pkg/A.class", &bytes);

        let entries = record_one(&f.snapshotter, leaf.clone());
        assert_eq!(entries[0].hash, ContentHash::from_bytes(&bytes));
        assert_eq!(f.cache.get(&f.snapshotter.cache_key(&leaf)), Some(entries[0].hash));

        let warnings = f.sink.diagnostics();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, DiagnosticCode::MALFORMED_CLASS);
        assert_eq!(warnings[0].resource.as_deref(), Some("pkg/A.class"));
        assert!(warnings[0].message.contains("A.class"));

        // Served from the cache the second time: no new warning.
        record_one(&f.snapshotter, leaf);
        assert_eq!(f.sink.warning_count(), 1);
    }

    #[test]
    fn body_changes_do_not_alter_fingerprint() {
        let f = fixture(SnapshotterConfig::default());
        let plain = class_bytes("A", |_| {});
        let changed = class_bytes("A", |c| {
            c.methods[0]
                .attributes
                .other
                .push(RawAttribute::new("Code", vec![0, 1, 0, 1, 0, 0, 0, 1, 0xB1, 0, 0, 0, 0]));
            c.methods.push(Member::new(AccessFlags::PRIVATE, "helper", "()V"));
        });
        assert_ne!(plain, changed);

        let a = record_one(&f.snapshotter, LeafResource::from_bytes("A.class", plain));
        let b = record_one(&f.snapshotter, LeafResource::from_bytes("A.class", changed));
        assert_eq!(a, b);
    }

    #[test]
    fn public_signature_change_alters_fingerprint() {
        let f = fixture(SnapshotterConfig::default());
        let a = record_one(
            &f.snapshotter,
            LeafResource::from_bytes("A.class", class_bytes("A", |_| {})),
        );
        let b = record_one(
            &f.snapshotter,
            LeafResource::from_bytes("A.class", class_bytes("A", |c| c.methods[0].descriptor = "(I)V".into())),
        );
        assert_ne!(a, b);
    }

    #[test]
    fn config_change_changes_cache_keys() {
        let default = fixture(SnapshotterConfig::default());
        let exported = fixture(SnapshotterConfig::with_exported_packages(["com.example"]));
        assert_ne!(
            default.snapshotter.config_fingerprint(),
            exported.snapshotter.config_fingerprint()
        );

        let leaf = LeafResource::from_file("A.class", "/nonexistent/A.class").unwrap();
        assert_ne!(
            default.snapshotter.cache_key(&leaf),
            exported.snapshotter.cache_key(&leaf)
        );
    }

    #[test]
    fn equal_configs_share_fingerprint() {
        let a = SnapshotterConfig::with_exported_packages(["com.example", "org.acme"]);
        let b = SnapshotterConfig::with_exported_packages(["org/acme", "com/example"]);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn entry_snapshot_walks_tree() {
        let dir = tempfile::tempdir().unwrap();
        let f = fixture(SnapshotterConfig::default());
        let tree = ResourceTree::new("")
            .with_child(file_leaf(dir.path(), "a/A.class", &class_bytes("a/A", |_| {})))
            .with_child(file_leaf(dir.path(), "b/B.class", &class_bytes("b/B", |_| {})))
            .with_child(file_leaf(dir.path(), "notes.txt", b"hi"));

        let aggregate = f.snapshotter.snapshot_entry(&Resource::Tree(tree)).unwrap();
        let paths: Vec<&str> = aggregate.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a/A.class", "b/B.class"]);
    }

    #[test]
    fn single_leaf_entry() {
        let f = fixture(SnapshotterConfig::default());
        let leaf = LeafResource::from_bytes("A.class", class_bytes("A", |_| {}));
        let aggregate = f.snapshotter.snapshot_entry(&Resource::Leaf(leaf)).unwrap();
        assert_eq!(aggregate.len(), 1);
    }

    #[test]
    fn unreadable_class_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let f = fixture(SnapshotterConfig::default());
        let leaf = LeafResource::from_file("Gone.class", dir.path().join("Gone.class")).unwrap();
        let err = f.snapshotter.snapshot_entry(&Resource::Leaf(leaf)).unwrap_err();
        assert!(matches!(err, SnapshotError::Io { .. }));
    }

    #[test]
    fn missing_leaf_never_consults_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let f = fixture(SnapshotterConfig::default());
        let leaf = LeafResource::from_file("H.class", dir.path().join("H.class")).unwrap();
        f.cache
            .put(f.snapshotter.cache_key(&leaf), ContentHash::from_bytes(b"stale"));

        let err = f.snapshotter.snapshot_entry(&Resource::Leaf(leaf)).unwrap_err();
        assert!(matches!(err, SnapshotError::Io { .. }));
        assert_eq!(f.cache.hits() + f.cache.misses(), 0);
    }

    #[test]
    fn missing_leaf_that_reappears_is_not_memoized() {
        let dir = tempfile::tempdir().unwrap();
        let f = fixture(SnapshotterConfig::default());
        let path = dir.path().join("A.class");
        let leaf = LeafResource::from_file("A.class", &path).unwrap();
        std::fs::write(&path, class_bytes("A", |_| {})).unwrap();

        assert_eq!(record_one(&f.snapshotter, leaf).len(), 1);
        assert!(f.cache.is_empty());
    }

    #[test]
    fn content_changed_after_snapshot_is_not_memoized() {
        let dir = tempfile::tempdir().unwrap();
        let f = fixture(SnapshotterConfig::default());
        let alpha = class_bytes("A", |_| {});
        let beta = class_bytes("A", |c| c.methods[0].descriptor = "(I)V".into());
        let path = dir.path().join("A.class");
        std::fs::write(&path, &beta).unwrap();

        let stale = LeafResource::new(
            "A.class",
            LeafSource::File(path.clone()),
            ContentSnapshot::regular_file(ContentHash::from_bytes(&alpha)),
        );
        let recorded = record_one(&f.snapshotter, stale);
        let expected_beta = record_one(&f.snapshotter, LeafResource::from_bytes("A.class", beta));
        assert_eq!(recorded, expected_beta);
        assert!(f.cache.is_empty());

        std::fs::write(&path, &alpha).unwrap();
        let fresh = LeafResource::from_file("A.class", &path).unwrap();
        let expected_alpha = record_one(&f.snapshotter, LeafResource::from_bytes("A.class", alpha));
        assert_eq!(record_one(&f.snapshotter, fresh), expected_alpha);
    }

    #[test]
    fn directory_snapshot_matches_entry_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let f = fixture(SnapshotterConfig::default());
        file_leaf(dir.path(), "a/A.class", &class_bytes("a/A", |_| {}));
        file_leaf(dir.path(), "B.class", &class_bytes("B", |_| {}));
        file_leaf(dir.path(), "notes.txt", b"hi");

        let streamed = f.snapshotter.snapshot_directory(dir.path()).unwrap();
        let tree = crate::walk::enumerate_directory(dir.path()).unwrap();
        let walked = f.snapshotter.snapshot_entry(&Resource::Tree(tree)).unwrap();
        assert_eq!(streamed, walked);
        assert_eq!(streamed.len(), 2);
    }

    #[test]
    fn from_sigil_config() {
        let config = sigil_config::load_config_from_str(
            "[extraction]\nexported_packages = [\"com.example\"]\n",
        )
        .unwrap();
        let snapshotter_config = SnapshotterConfig::from(&config);
        assert!(snapshotter_config.exported_packages.contains("com/example"));
    }
}
