//! Enumerating a classpath directory into a [`ResourceTree`].

use std::path::Path;

use walkdir::WalkDir;

use crate::error::SnapshotError;
use crate::resource::{LeafResource, ResourceTree};

/// Builds the resource tree of a classpath directory.
///
/// Entries are visited in file-name order, symlinks are followed, and every
/// regular file is hashed into its content snapshot. Relative paths always
/// use `/` separators; a name that is not valid UTF-8 is an error.
pub fn enumerate_directory(root: &Path) -> Result<ResourceTree, SnapshotError> {
    // stack[d] is the open tree at depth d; stack[0] is the root.
    let mut stack = vec![ResourceTree::new("")];

    for entry in walker(root) {
        let entry = entry.map_err(|e| walk_error(root, e))?;

        close_trees(&mut stack, entry.depth());

        let relative_path = relative_path(root, entry.path())?;
        if entry.file_type().is_dir() {
            stack.push(ResourceTree::new(relative_path));
        } else if entry.file_type().is_file() {
            let leaf = LeafResource::from_file(relative_path, entry.path())?;
            if let Some(parent) = stack.last_mut() {
                parent.children.push(leaf.into());
            }
        }
    }

    close_trees(&mut stack, 1);
    Ok(stack.pop().unwrap_or_default())
}

/// Calls `visit` with the relative and full path of every regular file
/// beneath `root`, in the same order as [`enumerate_directory`], without
/// building a tree.
pub fn for_each_file<F>(root: &Path, mut visit: F) -> Result<(), SnapshotError>
where
    F: FnMut(String, &Path) -> Result<(), SnapshotError>,
{
    for entry in walker(root) {
        let entry = entry.map_err(|e| walk_error(root, e))?;
        if entry.file_type().is_file() {
            visit(relative_path(root, entry.path())?, entry.path())?;
        }
    }
    Ok(())
}

fn walker(root: &Path) -> walkdir::IntoIter {
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
}

fn walk_error(root: &Path, e: walkdir::Error) -> SnapshotError {
    let path = e.path().unwrap_or(root).to_path_buf();
    SnapshotError::Io {
        path,
        source: e.into(),
    }
}

/// Pops open trees until only `depth` remain, attaching each to its parent.
fn close_trees(stack: &mut Vec<ResourceTree>, depth: usize) {
    while stack.len() > depth {
        let Some(done) = stack.pop() else { break };
        match stack.last_mut() {
            Some(parent) => parent.children.push(done.into()),
            None => {
                stack.push(done);
                break;
            }
        }
    }
}

fn relative_path(root: &Path, path: &Path) -> Result<String, SnapshotError> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let segments = relative
        .components()
        .map(|c| {
            c.as_os_str().to_str().ok_or_else(|| SnapshotError::NonUtf8Path {
                path: path.to_path_buf(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{FileKind, Resource};

    #[test]
    fn builds_nested_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("com/example")).unwrap();
        std::fs::write(dir.path().join("com/example/B.class"), b"b").unwrap();
        std::fs::write(dir.path().join("com/example/A.class"), b"a").unwrap();
        std::fs::write(dir.path().join("README.txt"), b"r").unwrap();

        let tree = enumerate_directory(dir.path()).unwrap();
        let paths: Vec<&str> = tree.leaves().map(|l| l.relative_path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["README.txt", "com/example/A.class", "com/example/B.class"]
        );

        match &tree.children[0] {
            Resource::Leaf(leaf) => assert_eq!(leaf.relative_path, "README.txt"),
            other => panic!("expected leaf, got {other:?}"),
        }
        match &tree.children[1] {
            Resource::Tree(com) => {
                assert_eq!(com.relative_path, "com");
                assert_eq!(com.children.len(), 1);
            }
            other => panic!("expected tree, got {other:?}"),
        }
    }

    #[test]
    fn leaves_are_file_backed_and_hashed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("A.class"), b"content").unwrap();
        let tree = enumerate_directory(dir.path()).unwrap();
        let leaf = tree.leaves().next().unwrap();
        assert!(leaf.has_stable_identity());
        assert_eq!(leaf.snapshot.kind, FileKind::RegularFile);
        assert_eq!(
            leaf.snapshot.content_hash,
            sigil_common::ContentHash::from_bytes(b"content")
        );
    }

    #[test]
    fn empty_directory_yields_empty_tree() {
        let dir = tempfile::tempdir().unwrap();
        let tree = enumerate_directory(dir.path()).unwrap();
        assert!(tree.children.is_empty());
    }

    #[test]
    fn missing_root_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = enumerate_directory(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, SnapshotError::Io { .. }));
    }

    #[test]
    fn visits_files_in_tree_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("com/example")).unwrap();
        std::fs::write(dir.path().join("com/example/A.class"), b"a").unwrap();
        std::fs::write(dir.path().join("README.txt"), b"r").unwrap();

        let mut visited = Vec::new();
        for_each_file(dir.path(), |relative, _| {
            visited.push(relative);
            Ok(())
        })
        .unwrap();
        assert_eq!(visited, vec!["README.txt", "com/example/A.class"]);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_file_name_is_rejected() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let name = OsStr::from_bytes(b"caf\xe9.class");
        if std::fs::write(dir.path().join(name), b"x").is_err() {
            // Some filesystems refuse non-UTF-8 names outright.
            return;
        }

        let err = enumerate_directory(dir.path()).unwrap_err();
        assert!(matches!(err, SnapshotError::NonUtf8Path { .. }));
        let err = for_each_file(dir.path(), |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, SnapshotError::NonUtf8Path { .. }));
    }
}
