//! Two-way folder synchronization runs for folder-sync

use crate::copy::{self, CopyReport, FailurePolicy};
use crate::error::{Result, Side, SyncError};
use crate::filter::{IgnoreSpec, PathFilter};
use crate::journal::{self, RunLogArtifact, RunParams, RunRecord};
use crate::mirror::{self, MirrorReport};
use crate::progress::Progress;
use crate::reconcile::{self, CopyDecision};
use crate::walk;
use chrono::Local;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Configuration of a single sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub root_a: PathBuf,
    pub root_b: PathBuf,
    /// Overwrite files whose counterpart has a strictly newer modification time.
    pub sync_most_recent: bool,
    pub ignore: IgnoreSpec,
    pub failure_policy: FailurePolicy,
}

impl SyncOptions {
    pub fn new(root_a: impl Into<PathBuf>, root_b: impl Into<PathBuf>) -> Self {
        Self {
            root_a: root_a.into(),
            root_b: root_b.into(),
            sync_most_recent: false,
            ignore: IgnoreSpec::default(),
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn params(&self) -> RunParams {
        RunParams {
            root_a: self.root_a.clone(),
            root_b: self.root_b.clone(),
            sync_most_recent: self.sync_most_recent,
            ignore: self.ignore.clone(),
        }
    }

    /// Fail unless both roots are existing directories.
    pub fn check_roots(&self) -> Result<()> {
        for (side, path) in [(Side::A, &self.root_a), (Side::B, &self.root_b)] {
            if !path.is_dir() {
                return Err(SyncError::MissingRoot {
                    side,
                    path: path.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Planned copies of both directions, without touching either root.
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    pub files_a: usize,
    pub files_b: usize,
    pub a_to_b: Vec<CopyDecision>,
    pub b_to_a: Vec<CopyDecision>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.a_to_b.is_empty() && self.b_to_a.is_empty()
    }
}

/// Summary of a completed run.
#[derive(Debug)]
pub struct SyncReport {
    pub mirrored_to_b: MirrorReport,
    pub mirrored_to_a: MirrorReport,
    pub files_a: usize,
    pub files_b: usize,
    pub a_to_b: CopyReport,
    pub b_to_a: CopyReport,
    pub elapsed: Duration,
    pub log: RunLogArtifact,
}

impl SyncReport {
    pub fn copied(&self) -> usize {
        self.a_to_b.copied() + self.b_to_a.copied()
    }

    pub fn bytes(&self) -> u64 {
        self.a_to_b.bytes() + self.b_to_a.bytes()
    }

    pub fn failed(&self) -> usize {
        self.a_to_b.failed() + self.b_to_a.failed()
    }

    pub fn skipped(&self) -> usize {
        self.a_to_b.skipped_count() + self.b_to_a.skipped_count()
    }

    /// Directories that could not be created on either side.
    pub fn mirror_failed(&self) -> usize {
        self.mirrored_to_b.failed.len() + self.mirrored_to_a.failed.len()
    }

    /// Whether every directory was mirrored and every planned copy succeeded.
    pub fn is_clean(&self) -> bool {
        self.mirror_failed() == 0 && self.failed() == 0 && self.skipped() == 0
    }
}

fn plan_unchecked(options: &SyncOptions) -> Result<SyncPlan> {
    let filter = PathFilter::new(options.ignore.clone());
    let (tree_a, tree_b) = walk::enumerate_pair(&options.root_a, &options.root_b, &filter)?;
    let (a_to_b, b_to_a) = reconcile::reconcile(
        &tree_a.files,
        &tree_b.files,
        &options.root_a,
        &options.root_b,
        options.sync_most_recent,
    );
    Ok(SyncPlan {
        files_a: tree_a.files.len(),
        files_b: tree_b.files.len(),
        a_to_b,
        b_to_a,
    })
}

/// Compute what a run would copy, without creating or copying anything.
pub fn plan(options: &SyncOptions) -> Result<SyncPlan> {
    options.check_roots()?;
    plan_unchecked(options)
}

/// Run one full synchronization pass between the two roots.
///
/// Order: mirror directories both ways, enumerate both roots, plan both
/// directions, copy A to B, copy B to A, then write the run log to both roots.
/// Copy failures are recorded in the report and the log; they do not stop the
/// run unless [`FailurePolicy::Abort`] is selected.
pub fn sync_folders(options: &SyncOptions, progress: &dyn Progress) -> Result<SyncReport> {
    options.check_roots()?;
    let started_at = Local::now();
    let start = Instant::now();
    let root_a = options.root_a.as_path();
    let root_b = options.root_b.as_path();

    log::info!(
        "Starting sync between {} and {}",
        root_a.display(),
        root_b.display()
    );
    log::info!("  sync_most_recent: {}", options.sync_most_recent);
    log::info!("  ignore_files: {:?}", options.ignore.ignore_files());
    log::info!("  ignore_extensions: {:?}", options.ignore.ignore_extensions());
    log::info!("  ignore_hidden: {}", options.ignore.ignore_hidden());

    let mirrored_to_b = mirror::mirror_directories(root_a, root_b)?;
    let mirrored_to_a = mirror::mirror_directories(root_b, root_a)?;
    log::info!(
        "Mirrored directory structure ({} created in B, {} created in A)",
        mirrored_to_b.created.len(),
        mirrored_to_a.created.len()
    );
    let dirs_failed = mirrored_to_b.failed.len() + mirrored_to_a.failed.len();
    if dirs_failed > 0 {
        log::warn!("{} directories could not be created", dirs_failed);
    }

    let plan = plan_unchecked(options)?;
    log::info!(
        "Planned {} copies A -> B and {} copies B -> A",
        plan.a_to_b.len(),
        plan.b_to_a.len()
    );

    let a_to_b = copy::execute(
        &plan.a_to_b,
        root_a,
        root_b,
        options.failure_policy,
        &format!("Syncing {} to {}", root_a.display(), root_b.display()),
        progress,
    );
    let b_to_a = if options.failure_policy == FailurePolicy::Abort && a_to_b.failed() > 0 {
        CopyReport::skipped(&plan.b_to_a)
    } else {
        copy::execute(
            &plan.b_to_a,
            root_a,
            root_b,
            options.failure_policy,
            &format!("Syncing {} to {}", root_b.display(), root_a.display()),
            progress,
        )
    };

    let elapsed = start.elapsed();
    log::info!("Sync completed in {:.3?}. Saving logs...", elapsed);

    let params = options.params();
    let artifact = journal::record(&RunRecord {
        params: &params,
        started_at,
        files_a: plan.files_a,
        files_b: plan.files_b,
        mirrored_to_b: &mirrored_to_b,
        mirrored_to_a: &mirrored_to_a,
        a_to_b: &a_to_b,
        b_to_a: &b_to_a,
        elapsed,
    })?;
    log::info!(
        "Logs saved to {} and {}",
        artifact.path_a.display(),
        artifact.path_b.display()
    );

    Ok(SyncReport {
        mirrored_to_b,
        mirrored_to_a,
        files_a: plan.files_a,
        files_b: plan.files_b,
        a_to_b,
        b_to_a,
        elapsed,
        log: artifact,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_missing_root_touches_nothing() {
        let a = tempdir().unwrap();
        let missing = a.path().join("missing");
        let options = SyncOptions::new(a.path(), &missing);
        let err = sync_folders(&options, &NoProgress).unwrap_err();
        assert!(matches!(err, SyncError::MissingRoot { side: Side::B, .. }));
        assert!(!a.path().join(crate::filter::LOG_DIR_NAME).exists());
        assert!(!missing.exists());
    }

    #[test]
    fn test_plan_is_read_only() {
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        fs::create_dir(a.path().join("sub")).unwrap();
        fs::write(a.path().join("sub/x.txt"), b"x").unwrap();
        let plan = plan(&SyncOptions::new(a.path(), b.path())).unwrap();
        assert_eq!(plan.a_to_b.len(), 1);
        assert!(plan.b_to_a.is_empty());
        assert!(!b.path().join("sub").exists());
    }

    #[test]
    fn test_sync_counts() {
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        fs::write(a.path().join("one.txt"), b"1").unwrap();
        fs::write(b.path().join("two.txt"), b"22").unwrap();
        let report = sync_folders(&SyncOptions::new(a.path(), b.path()), &NoProgress).unwrap();
        assert_eq!(report.files_a, 1);
        assert_eq!(report.files_b, 1);
        assert_eq!(report.copied(), 2);
        assert_eq!(report.bytes(), 3);
        assert!(report.is_clean());
    }

    #[test]
    fn test_mirror_failure_is_not_clean() {
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        fs::create_dir(a.path().join("clash")).unwrap();
        fs::write(b.path().join("clash"), b"file in the way").unwrap();
        let report = sync_folders(&SyncOptions::new(a.path(), b.path()), &NoProgress).unwrap();
        assert_eq!(report.mirror_failed(), 1);
        assert_eq!(report.failed(), 0);
        assert!(!report.is_clean());
        let expected = format!(
            "FAILED to create directory: {}",
            b.path().join("clash").display()
        );
        assert!(report.log.contents.contains(&expected));
        assert_eq!(fs::read_to_string(&report.log.path_b).unwrap(), report.log.contents);
    }
}
