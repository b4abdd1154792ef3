//! Filtered directory enumeration for folder-sync

use crate::error::{Result, SyncError};
use crate::filter::{PathFilter, relative_path};
use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};

/// Filtered contents of one root, in enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    pub dirs: Vec<PathBuf>,
    pub files: Vec<PathBuf>,
}

/// Enumerate all visible directories and regular files under `root`.
///
/// Directories rejected by `filter` are pruned, so nothing beneath them is ever
/// read. Symbolic links are never descended into: a link to a regular file is
/// reported as a file, any other link is skipped.
pub fn enumerate(root: &Path, filter: &PathFilter) -> Result<Tree> {
    let meta = fs::metadata(root).map_err(|e| SyncError::io("read", root, e))?;
    if !meta.is_dir() {
        return Err(SyncError::io(
            "walk",
            root,
            std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
        ));
    }

    let walk_root = root.to_path_buf();
    let prune = filter.clone();
    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            match relative_path(&walk_root, entry.path()) {
                Some(rel) => prune.visible(&rel, is_dir),
                None => false,
            }
        });

    let mut tree = Tree::default();
    for result in builder.build() {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("Skipping unreadable entry under {}: {}", root.display(), err);
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        let Some(file_type) = entry.file_type() else {
            continue;
        };
        let Some(rel) = relative_path(root, entry.path()) else {
            continue;
        };
        if file_type.is_dir() {
            tree.dirs.push(rel);
        } else if file_type.is_file() {
            tree.files.push(rel);
        } else if file_type.is_symlink() {
            match fs::metadata(entry.path()) {
                Ok(target) if target.is_file() => tree.files.push(rel),
                Ok(_) => log::debug!("Not following link {}", entry.path().display()),
                Err(err) => log::warn!("Skipping dangling link {}: {}", entry.path().display(), err),
            }
        }
    }
    Ok(tree)
}

/// Enumerate both roots in parallel.
pub fn enumerate_pair(root_a: &Path, root_b: &Path, filter: &PathFilter) -> Result<(Tree, Tree)> {
    let (a, b) = rayon::join(|| enumerate(root_a, filter), || enumerate(root_b, filter));
    Ok((a?, b?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::IgnoreSpec;
    use tempfile::tempdir;

    fn default_filter() -> PathFilter {
        PathFilter::new(IgnoreSpec::default())
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_enumerate_empty_dir() {
        let dir = tempdir().unwrap();
        let tree = enumerate(dir.path(), &default_filter()).unwrap();
        assert!(tree.dirs.is_empty());
        assert!(tree.files.is_empty());
    }

    #[test]
    fn test_enumerate_nested() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub/deeper")).unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::write(dir.path().join("sub/b.txt"), b"b").unwrap();
        fs::write(dir.path().join("sub/deeper/c.txt"), b"c").unwrap();
        let tree = enumerate(dir.path(), &default_filter()).unwrap();
        assert_eq!(tree.dirs, paths(&["empty", "sub", "sub/deeper"]));
        assert_eq!(tree.files, paths(&["a.txt", "sub/b.txt", "sub/deeper/c.txt"]));
    }

    #[test]
    fn test_enumerate_prunes_ignored() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("build/obj")).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::create_dir_all(dir.path().join(".sync_logs")).unwrap();
        fs::write(dir.path().join("build/obj/x.o"), b"o").unwrap();
        fs::write(dir.path().join(".git/HEAD"), b"ref").unwrap();
        fs::write(dir.path().join(".sync_logs/old_sync.log"), b"log").unwrap();
        fs::write(dir.path().join("keep.rs"), b"fn main() {}").unwrap();
        fs::write(dir.path().join("scratch.tmp"), b"tmp").unwrap();
        let filter = PathFilter::new(IgnoreSpec::new(["build"], [".tmp"], true));
        let tree = enumerate(dir.path(), &filter).unwrap();
        assert!(tree.dirs.is_empty());
        assert_eq!(tree.files, paths(&["keep.rs"]));
    }

    #[test]
    fn test_enumerate_shows_hidden_when_allowed() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(".config")).unwrap();
        fs::write(dir.path().join(".config/app.toml"), b"x = 1").unwrap();
        let filter = PathFilter::new(IgnoreSpec::new(Vec::<String>::new(), Vec::<String>::new(), false));
        let tree = enumerate(dir.path(), &filter).unwrap();
        assert_eq!(tree.dirs, paths(&[".config"]));
        assert_eq!(tree.files, paths(&[".config/app.toml"]));
    }

    #[cfg(unix)]
    #[test]
    fn test_enumerate_does_not_follow_dir_links() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("real")).unwrap();
        fs::write(dir.path().join("real/f.txt"), b"f").unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("real/loop")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real/f.txt"), dir.path().join("link.txt")).unwrap();
        let tree = enumerate(dir.path(), &default_filter()).unwrap();
        assert_eq!(tree.dirs, paths(&["real"]));
        assert_eq!(tree.files, paths(&["link.txt", "real/f.txt"]));
    }

    #[cfg(unix)]
    #[test]
    fn test_enumerate_non_utf8_name() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;
        let dir = tempdir().unwrap();
        let name = OsStr::from_bytes(b"caf\xe9.txt");
        fs::write(dir.path().join(name), b"latin-1").unwrap();
        let tree = enumerate(dir.path(), &default_filter()).unwrap();
        assert_eq!(tree.files, vec![PathBuf::from(name)]);
        assert!(dir.path().join(&tree.files[0]).is_file());
    }

    #[test]
    fn test_enumerate_missing_root() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(enumerate(&missing, &default_filter()).is_err());
    }
}
