//! Resources presented for snapshotting and their content snapshots.

use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use sigil_common::ContentHash;

use crate::error::SnapshotError;

/// What kind of filesystem object a resource currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// A readable regular file.
    RegularFile,
    /// A directory.
    Directory,
    /// Nothing exists at the path.
    Missing,
}

/// Fingerprint of what a single resource currently looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentSnapshot {
    /// Kind of the resource.
    pub kind: FileKind,
    /// Hash of the raw content. Fixed placeholder values for non-files.
    pub content_hash: ContentHash,
}

impl ContentSnapshot {
    /// Snapshot of a regular file with the given content hash.
    pub fn regular_file(content_hash: ContentHash) -> Self {
        Self {
            kind: FileKind::RegularFile,
            content_hash,
        }
    }

    /// Snapshot of a directory.
    pub fn directory() -> Self {
        Self {
            kind: FileKind::Directory,
            content_hash: ContentHash::from_bytes(b"DIR"),
        }
    }

    /// Snapshot of a path where nothing exists.
    pub fn missing() -> Self {
        Self {
            kind: FileKind::Missing,
            content_hash: ContentHash::from_bytes(b"MISSING"),
        }
    }
}

/// Where a leaf's bytes come from.
#[derive(Debug, Clone)]
pub enum LeafSource {
    /// A file on disk. Only these have a stable identity and are cached.
    File(PathBuf),
    /// Bytes held in memory, e.g. an archive entry already inflated.
    Bytes(Arc<[u8]>),
}

/// A readable resource with content.
#[derive(Debug, Clone)]
pub struct LeafResource {
    /// Path relative to the root of the classpath entry, `/`-separated.
    pub relative_path: String,
    /// Origin of the content.
    pub source: LeafSource,
    /// Content snapshot taken when the resource was enumerated.
    pub snapshot: ContentSnapshot,
    /// Bytes the snapshot was computed from, when they were read.
    content: Option<Arc<[u8]>>,
}

impl LeafResource {
    /// Creates a leaf with an explicit snapshot.
    ///
    /// Content is read from the source on demand and may no longer match
    /// `snapshot` by then.
    pub fn new(relative_path: impl Into<String>, source: LeafSource, snapshot: ContentSnapshot) -> Self {
        Self {
            relative_path: relative_path.into(),
            source,
            snapshot,
            content: None,
        }
    }

    /// Creates a file-backed leaf, hashing its current content.
    ///
    /// The bytes are kept, so [`read_content`](Self::read_content) returns
    /// exactly what was hashed. A path that does not exist yields a
    /// [`FileKind::Missing`] snapshot; any other read failure is an error.
    pub fn from_file(relative_path: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self, SnapshotError> {
        let path = path.into();
        match std::fs::read(&path) {
            Ok(bytes) => {
                let snapshot = ContentSnapshot::regular_file(ContentHash::from_bytes(&bytes));
                let mut leaf = Self::new(relative_path, LeafSource::File(path), snapshot);
                leaf.content = Some(Arc::from(bytes));
                Ok(leaf)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::new(
                relative_path,
                LeafSource::File(path),
                ContentSnapshot::missing(),
            )),
            Err(source) => Err(SnapshotError::Io { path, source }),
        }
    }

    /// Creates an in-memory leaf.
    pub fn from_bytes(relative_path: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        let snapshot = ContentSnapshot::regular_file(ContentHash::from_bytes(&bytes));
        Self::new(relative_path, LeafSource::Bytes(bytes), snapshot)
    }

    /// Last path segment.
    pub fn name(&self) -> &str {
        self.relative_path
            .rsplit_once('/')
            .map_or(self.relative_path.as_str(), |(_, name)| name)
    }

    /// `true` when the resource is backed by the filesystem.
    pub fn has_stable_identity(&self) -> bool {
        matches!(self.source, LeafSource::File(_))
    }

    /// Reads the full content. The file handle is released before
    /// returning, on success and on failure.
    pub fn read_content(&self) -> Result<Arc<[u8]>, SnapshotError> {
        if let Some(content) = &self.content {
            return Ok(Arc::clone(content));
        }
        match &self.source {
            LeafSource::Bytes(bytes) => Ok(Arc::clone(bytes)),
            LeafSource::File(path) => {
                let io_err = |source| SnapshotError::Io {
                    path: path.clone(),
                    source,
                };
                let mut file = std::fs::File::open(path).map_err(io_err)?;
                let mut buf = Vec::new();
                file.read_to_end(&mut buf).map_err(io_err)?;
                Ok(Arc::from(buf))
            }
        }
    }
}

/// A composite of child resources, e.g. a classpath directory.
#[derive(Debug, Clone, Default)]
pub struct ResourceTree {
    /// Path relative to the root of the classpath entry; empty for the root.
    pub relative_path: String,
    /// Direct children.
    pub children: Vec<Resource>,
}

impl ResourceTree {
    /// Creates an empty tree.
    pub fn new(relative_path: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            children: Vec::new(),
        }
    }

    /// Adds a child.
    pub fn with_child(mut self, child: impl Into<Resource>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Depth-first iterator over every leaf beneath this tree.
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves {
            stack: vec![self.children.iter()],
        }
    }
}

/// A resource on a classpath.
#[derive(Debug, Clone)]
pub enum Resource {
    /// A readable resource.
    Leaf(LeafResource),
    /// A directory-like composite.
    Tree(ResourceTree),
}

impl Resource {
    /// Relative path of the resource.
    pub fn relative_path(&self) -> &str {
        match self {
            Resource::Leaf(leaf) => &leaf.relative_path,
            Resource::Tree(tree) => &tree.relative_path,
        }
    }
}

impl From<LeafResource> for Resource {
    fn from(leaf: LeafResource) -> Self {
        Resource::Leaf(leaf)
    }
}

impl From<ResourceTree> for Resource {
    fn from(tree: ResourceTree) -> Self {
        Resource::Tree(tree)
    }
}

/// Iterator returned by [`ResourceTree::leaves`].
pub struct Leaves<'a> {
    stack: Vec<std::slice::Iter<'a, Resource>>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a LeafResource;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(Resource::Leaf(leaf)) => return Some(leaf),
                Some(Resource::Tree(tree)) => self.stack.push(tree.children.iter()),
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> ResourceTree {
        ResourceTree::new("")
            .with_child(LeafResource::from_bytes("A.class", b"a".to_vec()))
            .with_child(
                ResourceTree::new("pkg")
                    .with_child(LeafResource::from_bytes("pkg/B.class", b"b".to_vec()))
                    .with_child(ResourceTree::new("pkg/empty"))
                    .with_child(LeafResource::from_bytes("pkg/c.txt", b"c".to_vec())),
            )
            .with_child(LeafResource::from_bytes("D.class", b"d".to_vec()))
    }

    #[test]
    fn leaves_are_depth_first() {
        let t = tree();
        let paths: Vec<&str> = t.leaves().map(|l| l.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["A.class", "pkg/B.class", "pkg/c.txt", "D.class"]);
    }

    #[test]
    fn empty_tree_has_no_leaves() {
        assert_eq!(ResourceTree::new("").leaves().count(), 0);
    }

    #[test]
    fn name_is_last_segment() {
        assert_eq!(LeafResource::from_bytes("a/b/C.class", b"".to_vec()).name(), "C.class");
        assert_eq!(LeafResource::from_bytes("C.class", b"".to_vec()).name(), "C.class");
    }

    #[test]
    fn in_memory_leaf_is_transient() {
        let leaf = LeafResource::from_bytes("A.class", b"abc".to_vec());
        assert!(!leaf.has_stable_identity());
        assert_eq!(&*leaf.read_content().unwrap(), b"abc");
        assert_eq!(leaf.snapshot.content_hash, ContentHash::from_bytes(b"abc"));
    }

    #[test]
    fn file_leaf_reads_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("A.class");
        std::fs::write(&path, b"bytes").unwrap();

        let leaf = LeafResource::from_file("A.class", &path).unwrap();
        assert!(leaf.has_stable_identity());
        assert_eq!(leaf.snapshot.kind, FileKind::RegularFile);
        assert_eq!(&*leaf.read_content().unwrap(), b"bytes");
    }

    #[test]
    fn file_leaf_keeps_the_bytes_it_hashed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("A.class");
        std::fs::write(&path, b"alpha").unwrap();
        let leaf = LeafResource::from_file("A.class", &path).unwrap();

        std::fs::write(&path, b"beta").unwrap();
        assert_eq!(&*leaf.read_content().unwrap(), b"alpha");
        assert_eq!(leaf.snapshot.content_hash, ContentHash::from_bytes(b"alpha"));
    }

    #[test]
    fn explicit_snapshot_reads_current_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("A.class");
        std::fs::write(&path, b"beta").unwrap();
        let leaf = LeafResource::new(
            "A.class",
            LeafSource::File(path),
            ContentSnapshot::regular_file(ContentHash::from_bytes(b"alpha")),
        );
        assert_eq!(&*leaf.read_content().unwrap(), b"beta");
    }

    #[test]
    fn missing_file_is_snapshotted_but_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let leaf = LeafResource::from_file("Gone.class", dir.path().join("Gone.class")).unwrap();
        assert_eq!(leaf.snapshot, ContentSnapshot::missing());
        assert!(matches!(leaf.read_content(), Err(SnapshotError::Io { .. })));
    }
}
