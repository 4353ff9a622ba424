//! Memoization of class signatures across snapshots and configurations.

use std::sync::Arc;

use sigil_cache::{InMemorySignatureCache, PersistentSignatureCache, SignatureCache};
use sigil_classfile::AccessFlags;
use sigil_conformance::{ClassBuilder, Classpath, Harness, PUBLIC};
use sigil_diagnostics::DiagnosticSink;
use sigil_snapshot::{
    ClasspathEntrySnapshotter, ContentSnapshot, LeafResource, LeafSource, Resource, Signature,
    SnapshotterConfig,
};

fn api_class() -> ClassBuilder {
    ClassBuilder::new("com/example/Api").method(PUBLIC, "call", "()V")
}

#[test]
fn second_lookup_hits_and_reproduces_fingerprint() {
    let classpath = Classpath::new();
    classpath.write_class(&api_class());
    let harness = Harness::new();

    let first = harness.snapshot(&classpath);
    assert_eq!((harness.cache.hits(), harness.cache.misses()), (0, 1));
    assert_eq!(harness.cache.len(), 1);

    let second = harness.snapshot(&classpath);
    assert_eq!((harness.cache.hits(), harness.cache.misses()), (1, 1));
    assert_eq!(first, second);
}

#[test]
fn hit_does_not_reextract() {
    let classpath = Classpath::new();
    let path = classpath.write_class(&api_class());
    let harness = Harness::new();
    let leaf = LeafResource::from_file("com/example/Api.class", &path).unwrap();

    let planted = sigil_common::ContentHash::from_bytes(b"planted signature");
    harness.cache.put(harness.snapshotter.cache_key(&leaf), planted);

    let aggregate = harness.snapshot(&classpath);
    assert_eq!(aggregate.entries[0].hash, planted);
}

#[test]
fn configuration_change_orphans_cached_entries() {
    let classpath = Classpath::new();
    classpath.write_class(&api_class());
    let cache = Arc::new(InMemorySignatureCache::new());

    let before = Harness::sharing_cache(Arc::clone(&cache), SnapshotterConfig::default());
    before.snapshot(&classpath);
    assert_eq!(cache.misses(), 1);

    let after = Harness::sharing_cache(
        Arc::clone(&cache),
        SnapshotterConfig::with_exported_packages(["com.example"]),
    );
    assert_ne!(
        before.snapshotter.config_fingerprint(),
        after.snapshotter.config_fingerprint()
    );
    after.snapshot(&classpath);
    assert_eq!(cache.hits(), 0);
    assert_eq!(cache.misses(), 2);
    assert_eq!(cache.len(), 2);
}

#[test]
fn non_api_class_caches_ignored_sentinel() {
    let classpath = Classpath::new();
    let synthetic = ClassBuilder::new("com/example/Bridge")
        .access(PUBLIC | AccessFlags::SYNTHETIC)
        .method(PUBLIC, "call", "()V");
    let path = classpath.write_class(&synthetic);
    let harness = Harness::new();

    let aggregate = harness.snapshot(&classpath);
    assert!(aggregate.is_empty());

    let leaf = LeafResource::from_file("com/example/Bridge.class", &path).unwrap();
    assert_eq!(
        harness.cache.get(&harness.snapshotter.cache_key(&leaf)),
        Some(Signature::ignored_sentinel())
    );
}

#[test]
fn empty_marker_interface_is_ignored() {
    let classpath = Classpath::new();
    classpath.write_class(&ClassBuilder::interface("com/example/Marker"));
    classpath.write_class(&api_class());
    let aggregate = Harness::new().snapshot(&classpath);
    let paths: Vec<&str> = aggregate.entries.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["com/example/Api.class"]);
}

#[test]
fn making_a_marker_generic_changes_the_fingerprint() {
    let plain = Classpath::new();
    plain.write_class(&ClassBuilder::interface("com/example/Marker"));
    let generic = Classpath::new();
    generic.write_class(
        &ClassBuilder::interface("com/example/Marker")
            .signature("<T:Ljava/lang/Object;>Ljava/lang/Object;"),
    );

    let before = Harness::new().snapshot(&plain);
    let after = Harness::new().snapshot(&generic);
    assert!(before.is_empty());
    assert_eq!(after.len(), 1);
    assert_ne!(before.hash, after.hash);
}

#[test]
fn transient_resources_are_never_memoized() {
    let harness = Harness::new();
    let leaf = LeafResource::from_bytes("com/example/Api.class", api_class().build());
    let aggregate = harness.snapshotter.snapshot_entry(&Resource::Leaf(leaf)).unwrap();
    assert_eq!(aggregate.len(), 1);
    assert!(harness.cache.is_empty());
}

#[test]
fn persistent_cache_survives_reopen() {
    let classpath = Classpath::new();
    classpath.write_class(&api_class());
    let cache_dir = tempfile::tempdir().unwrap();

    let snapshot_with_fresh_cache = || {
        let cache = PersistentSignatureCache::open(cache_dir.path(), "1.0.0").unwrap();
        let snapshotter = ClasspathEntrySnapshotter::new(
            Arc::new(cache),
            SnapshotterConfig::default(),
            Arc::new(DiagnosticSink::new()),
        );
        snapshotter.snapshot_directory(classpath.root()).unwrap()
    };

    let first = snapshot_with_fresh_cache();
    let stats = PersistentSignatureCache::open(cache_dir.path(), "1.0.0")
        .unwrap()
        .stats()
        .unwrap();
    assert_eq!(stats.entries, 1);

    let second = snapshot_with_fresh_cache();
    assert_eq!(first, second);
}

#[test]
fn concurrent_snapshots_share_one_cache() {
    let classpath = Classpath::new();
    for i in 0..8 {
        classpath.write_class(
            &ClassBuilder::new(&format!("com/example/C{i}")).method(PUBLIC, "call", "()V"),
        );
    }
    let harness = Harness::new();
    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| harness.snapshot(&classpath)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(results.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(harness.cache.len(), 8);
}

#[test]
fn rewrite_after_enumeration_does_not_poison_cache() {
    let classpath = Classpath::new();
    let alpha = api_class();
    let beta = api_class().method(PUBLIC, "extra", "()V");
    let path = classpath.write_class(&alpha);
    let harness = Harness::new();

    // Enumerated while the file held alpha, read after it became beta.
    let enumerated = LeafResource::new(
        "com/example/Api.class",
        LeafSource::File(path.clone()),
        ContentSnapshot::regular_file(sigil_common::ContentHash::from_bytes(&alpha.build())),
    );
    classpath.write_class(&beta);
    let aggregate = harness
        .snapshotter
        .snapshot_entry(&Resource::Leaf(enumerated))
        .unwrap();
    assert_eq!(aggregate, harness.snapshot(&classpath));
    assert_eq!(harness.cache.len(), 1);

    // A later build with alpha content must see alpha's fingerprint.
    classpath.write_class(&alpha);
    let expected = Harness::new().snapshot(&classpath);
    assert_eq!(harness.snapshot(&classpath), expected);
}

#[test]
fn rewrite_after_from_file_uses_enumerated_bytes() {
    let classpath = Classpath::new();
    let alpha = api_class();
    let path = classpath.write_class(&alpha);
    let leaf = LeafResource::from_file("com/example/Api.class", &path).unwrap();
    let expected = Harness::new().snapshot(&classpath);

    classpath.write_class(&api_class().method(PUBLIC, "extra", "()V"));
    let harness = Harness::new();
    let aggregate = harness.snapshotter.snapshot_entry(&Resource::Leaf(leaf)).unwrap();
    assert_eq!(aggregate, expected);
}
