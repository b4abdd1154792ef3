//! Copy planning for folder-sync
//!
//! Decides, per direction, which files have to be copied. Identity is the
//! relative path; only presence and modification time are consulted.

use crate::filter::join_relative;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A relative path together with its size and modification time.
///
/// Metadata is read when the entry is planned, not during the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

impl FileEntry {
    /// Read metadata for `rel_path` under `root`, following links.
    pub fn stat(root: &Path, rel_path: &Path) -> io::Result<Self> {
        let meta = fs::metadata(join_relative(root, rel_path))?;
        Ok(Self {
            path: rel_path.to_path_buf(),
            size: meta.len(),
            modified: meta.modified()?,
        })
    }
}

/// Why a file is copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyReason {
    /// The file is absent on the target side.
    New,
    /// The source copy has a strictly newer modification time.
    MoreRecent,
}

impl fmt::Display for CopyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyReason::New => f.write_str("new"),
            CopyReason::MoreRecent => f.write_str("more recent"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    AToB,
    BToA,
}

impl Direction {
    /// Resolve `(source_root, target_root)` for this direction.
    pub fn roots<'a>(&self, root_a: &'a Path, root_b: &'a Path) -> (&'a Path, &'a Path) {
        match self {
            Direction::AToB => (root_a, root_b),
            Direction::BToA => (root_b, root_a),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::AToB => f.write_str("A -> B"),
            Direction::BToA => f.write_str("B -> A"),
        }
    }
}

/// A single planned copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyDecision {
    pub path: PathBuf,
    pub reason: CopyReason,
    pub direction: Direction,
    /// Source size observed while planning.
    pub size: u64,
}

impl CopyDecision {
    /// Full `(source, destination)` paths of this copy.
    pub fn endpoints(&self, root_a: &Path, root_b: &Path) -> (PathBuf, PathBuf) {
        let (src_root, dst_root) = self.direction.roots(root_a, root_b);
        (
            join_relative(src_root, &self.path),
            join_relative(dst_root, &self.path),
        )
    }
}

/// Plan the copies for one direction.
///
/// A file is copied when it is missing on the target, or, with
/// `sync_most_recent`, when the source is strictly newer. Equal times never copy.
/// A symbolic link on the target counts as present and is never written
/// through, even when it dangles. Decisions keep the order of `files`.
pub fn plan_direction(
    files: &[PathBuf],
    src_root: &Path,
    dst_root: &Path,
    direction: Direction,
    sync_most_recent: bool,
) -> Vec<CopyDecision> {
    let mut decisions = Vec::new();
    for rel in files {
        let source = match FileEntry::stat(src_root, rel) {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("Skipping {} ({}): {}", rel.display(), direction, err);
                continue;
            }
        };
        let target = join_relative(dst_root, rel);
        let reason = match fs::symlink_metadata(&target) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Some(CopyReason::New),
            Err(err) => {
                log::warn!("Cannot inspect {}: {}", target.display(), err);
                None
            }
            Ok(meta) if meta.file_type().is_symlink() => {
                log::info!("Leaving link {} in place", target.display());
                None
            }
            Ok(_) if !sync_most_recent => None,
            Ok(meta) => match meta.modified() {
                Ok(target_time) if source.modified > target_time => Some(CopyReason::MoreRecent),
                Ok(_) => None,
                Err(err) => {
                    log::warn!("Cannot read modification time of {}: {}", target.display(), err);
                    None
                }
            },
        };
        if let Some(reason) = reason {
            log::debug!(
                "Planned {} copy of {} because of '{}'",
                direction,
                rel.display(),
                reason
            );
            decisions.push(CopyDecision {
                path: source.path,
                reason,
                direction,
                size: source.size,
            });
        }
    }
    decisions
}

/// Plan both directions against the current state of the two roots.
///
/// Both sets are complete before this returns, so nothing copied later in the
/// run can show up as a candidate for the opposite direction.
pub fn reconcile(
    files_a: &[PathBuf],
    files_b: &[PathBuf],
    root_a: &Path,
    root_b: &Path,
    sync_most_recent: bool,
) -> (Vec<CopyDecision>, Vec<CopyDecision>) {
    rayon::join(
        || plan_direction(files_a, root_a, root_b, Direction::AToB, sync_most_recent),
        || plan_direction(files_b, root_b, root_a, Direction::BToA, sync_most_recent),
    )
}
