//! Directory structure mirroring for folder-sync

use crate::error::{Result, SyncError};
use crate::filter::{first_link, join_relative, relative_path};
use rustc_hash::FxHashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of mirroring one root's directory structure onto another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorReport {
    /// Relative paths of the directories created on the destination.
    pub created: Vec<PathBuf>,
    /// Relative paths of the directories that could not be created.
    pub failed: Vec<PathBuf>,
}

/// List every directory under `root`, unfiltered and in sorted walk order.
///
/// Hidden directories are included and links are not followed.
pub fn list_directories(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(SyncError::io(
            "walk",
            root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ));
    }
    let mut dirs = Vec::new();
    // Serial: this already runs inside a rayon::join on the global pool.
    for entry in jwalk::WalkDir::new(root)
        .parallelism(jwalk::Parallelism::Serial)
        .skip_hidden(false)
        .follow_links(false)
        .sort(true)
    {
        match entry {
            Ok(dir_entry) => {
                if dir_entry.depth == 0 || !dir_entry.file_type().is_dir() {
                    continue;
                }
                if let Some(rel) = relative_path(root, &dir_entry.path()) {
                    dirs.push(rel);
                }
            }
            Err(err) => log::warn!("Skipping unreadable entry under {}: {}", root.display(), err),
        }
    }
    Ok(dirs)
}

/// Create under `dst` every directory that exists under `src` but not under `dst`.
///
/// This ignores the path filter entirely. When both structures already match,
/// nothing is written.
pub fn mirror_directories(src: &Path, dst: &Path) -> Result<MirrorReport> {
    let (src_dirs, dst_dirs) = rayon::join(|| list_directories(src), || list_directories(dst));
    let existing: FxHashSet<PathBuf> = dst_dirs?.into_iter().collect();

    let mut report = MirrorReport::default();
    for rel in src_dirs? {
        if existing.contains(&rel) {
            continue;
        }
        let target = join_relative(dst, &rel);
        match first_link(dst, &rel) {
            Ok(None) => {}
            Ok(Some(link)) if link == target => {
                log::debug!("Leaving link {} in place", target.display());
                continue;
            }
            Ok(Some(link)) => {
                log::warn!(
                    "Not creating {} beneath link {}",
                    target.display(),
                    link.display()
                );
                report.failed.push(rel);
                continue;
            }
            Err(err) => {
                log::warn!("Cannot inspect {}: {}", target.display(), err);
                report.failed.push(rel);
                continue;
            }
        }
        if target.is_dir() {
            continue;
        }
        match fs::create_dir_all(&target) {
            Ok(()) => {
                log::debug!("Created directory {}", target.display());
                report.created.push(rel);
            }
            Err(err) => {
                log::warn!("Failed to create directory {}: {}", target.display(), err);
                report.failed.push(rel);
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_mirror_creates_missing_dirs() {
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        fs::create_dir_all(a.path().join("x/y/z")).unwrap();
        fs::create_dir_all(a.path().join(".hidden")).unwrap();
        fs::create_dir_all(b.path().join("x")).unwrap();
        let report = mirror_directories(a.path(), b.path()).unwrap();
        assert_eq!(report.created, paths(&[".hidden", "x/y", "x/y/z"]));
        assert!(report.failed.is_empty());
        assert!(b.path().join("x/y/z").is_dir());
        assert!(b.path().join(".hidden").is_dir());
    }

    #[test]
    fn test_mirror_is_idempotent() {
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        fs::create_dir_all(a.path().join("one/two")).unwrap();
        fs::create_dir_all(b.path().join("three")).unwrap();
        mirror_directories(a.path(), b.path()).unwrap();
        mirror_directories(b.path(), a.path()).unwrap();
        assert!(mirror_directories(a.path(), b.path()).unwrap().created.is_empty());
        assert!(mirror_directories(b.path(), a.path()).unwrap().created.is_empty());
        assert_eq!(list_directories(a.path()).unwrap(), list_directories(b.path()).unwrap());
    }

    #[test]
    fn test_mirror_counts_blocked_dirs() {
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        fs::create_dir_all(a.path().join("clash")).unwrap();
        fs::write(b.path().join("clash"), b"a file").unwrap();
        let report = mirror_directories(a.path(), b.path()).unwrap();
        assert!(report.created.is_empty());
        assert_eq!(report.failed, paths(&["clash"]));
    }

    #[cfg(unix)]
    #[test]
    fn test_mirror_never_creates_through_links() {
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        let outside = tempdir().unwrap();
        fs::create_dir_all(a.path().join("sub/deeper")).unwrap();
        std::os::unix::fs::symlink(outside.path(), b.path().join("sub")).unwrap();
        let report = mirror_directories(a.path(), b.path()).unwrap();
        assert!(report.created.is_empty());
        assert_eq!(report.failed, paths(&["sub/deeper"]));
        assert!(!outside.path().join("deeper").exists());
    }

    #[test]
    fn test_list_directories_skips_files() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("d")).unwrap();
        fs::write(dir.path().join("f.txt"), b"f").unwrap();
        assert_eq!(list_directories(dir.path()).unwrap(), paths(&["d"]));
    }
}
