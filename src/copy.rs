//! File copy execution for folder-sync

use crate::error::{Result, SyncError};
use crate::filter::first_link;
use crate::progress::Progress;
use crate::reconcile::CopyDecision;
use filetime::{FileTime, set_file_times};
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::Path;

/// What to do when a single copy fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Record the failure and carry on with the remaining decisions.
    #[default]
    Continue,
    /// Stop copying at the first failure; the rest is recorded as skipped.
    Abort,
}

#[derive(Debug)]
pub enum CopyOutcome {
    Copied { bytes: u64 },
    Failed(SyncError),
    Skipped,
}

#[derive(Debug)]
pub struct CopyRecord {
    pub decision: CopyDecision,
    pub outcome: CopyOutcome,
}

/// Outcomes of one copy pass, in decision order.
#[derive(Debug, Default)]
pub struct CopyReport {
    pub records: Vec<CopyRecord>,
}

impl CopyReport {
    /// A pass in which nothing was attempted.
    pub fn skipped(decisions: &[CopyDecision]) -> Self {
        Self {
            records: decisions
                .iter()
                .map(|decision| CopyRecord {
                    decision: decision.clone(),
                    outcome: CopyOutcome::Skipped,
                })
                .collect(),
        }
    }

    pub fn copied(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, CopyOutcome::Copied { .. }))
            .count()
    }

    pub fn bytes(&self) -> u64 {
        self.records
            .iter()
            .map(|r| match r.outcome {
                CopyOutcome::Copied { bytes } => bytes,
                _ => 0,
            })
            .sum()
    }

    pub fn failed(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, CopyOutcome::Failed(_)))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, CopyOutcome::Skipped))
            .count()
    }
}

/// Copy one file, preserving its modification time and permission bits.
///
/// The destination's parent directory is created if it is missing. Nothing is
/// written when the destination or one of its directories is a symbolic link.
pub fn apply(decision: &CopyDecision, root_a: &Path, root_b: &Path) -> Result<u64> {
    let (src, dst) = decision.endpoints(root_a, root_b);
    let (_, dst_root) = decision.direction.roots(root_a, root_b);
    let link = first_link(dst_root, &decision.path)
        .map_err(|e| SyncError::io("inspect", &dst, e))?;
    if let Some(link) = link {
        return Err(SyncError::io(
            "write through link",
            link,
            io::Error::new(io::ErrorKind::InvalidInput, "destination is a symbolic link"),
        ));
    }
    if let Some(parent) = dst.parent() {
        if !parent.is_dir() {
            fs::create_dir_all(parent).map_err(|e| SyncError::io("create directory", parent, e))?;
        }
    }
    let meta = fs::metadata(&src).map_err(|e| SyncError::io("read", &src, e))?;
    let bytes = fs::copy(&src, &dst).map_err(|e| SyncError::io("copy", &src, e))?;

    let accessed = FileTime::from_last_access_time(&meta);
    let modified = FileTime::from_last_modification_time(&meta);
    set_file_times(&dst, accessed, modified)
        .map_err(|e| SyncError::io("preserve timestamps", &dst, e))?;
    fs::set_permissions(&dst, meta.permissions())
        .map_err(|e| SyncError::io("preserve permissions", &dst, e))?;

    log::debug!(
        "Copied {} ==> {} ({} bytes)",
        src.display(),
        dst.display(),
        bytes
    );
    Ok(bytes)
}

/// Apply every decision of one pass.
///
/// With [`FailurePolicy::Continue`] copies run on the rayon pool; with
/// [`FailurePolicy::Abort`] they run in order and stop at the first failure.
pub fn execute(
    decisions: &[CopyDecision],
    root_a: &Path,
    root_b: &Path,
    policy: FailurePolicy,
    label: &str,
    progress: &dyn Progress,
) -> CopyReport {
    let total: u64 = decisions.iter().map(|d| d.size).sum();
    progress.begin(label, total);

    let run_one = |decision: &CopyDecision| {
        let outcome = match apply(decision, root_a, root_b) {
            Ok(bytes) => {
                progress.advance(bytes);
                CopyOutcome::Copied { bytes }
            }
            Err(err) => {
                log::warn!(
                    "Copy of {} ({}) failed: {}",
                    decision.path.display(),
                    decision.direction,
                    err
                );
                CopyOutcome::Failed(err)
            }
        };
        CopyRecord {
            decision: decision.clone(),
            outcome,
        }
    };

    let records = match policy {
        FailurePolicy::Continue => decisions.par_iter().map(run_one).collect(),
        FailurePolicy::Abort => {
            let mut records = Vec::with_capacity(decisions.len());
            let mut failed = false;
            for decision in decisions {
                if failed {
                    records.push(CopyRecord {
                        decision: decision.clone(),
                        outcome: CopyOutcome::Skipped,
                    });
                    continue;
                }
                let record = run_one(decision);
                failed = matches!(record.outcome, CopyOutcome::Failed(_));
                records.push(record);
            }
            records
        }
    };

    progress.finish();
    CopyReport { records }
}
