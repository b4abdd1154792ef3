//! Run logs for folder-sync
//!
//! Each run leaves one text file, written identically under the reserved log
//! directory of both roots. Files are named after the run's start time and are
//! never overwritten.

use crate::copy::{CopyOutcome, CopyReport};
use crate::error::{Result, SyncError};
use crate::filter::{IgnoreSpec, LOG_DIR_NAME};
use crate::mirror::MirrorReport;
use chrono::{DateTime, Local};
use std::fmt::{self, Write as _};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Give up looking for a free log name after this many collisions.
const MAX_NAME_ATTEMPTS: usize = 1000;

/// Input parameters of a run, as recorded in its log.
#[derive(Debug, Clone)]
pub struct RunParams {
    pub root_a: PathBuf,
    pub root_b: PathBuf,
    pub sync_most_recent: bool,
    pub ignore: IgnoreSpec,
}

/// Everything the run log is rendered from.
#[derive(Debug)]
pub struct RunRecord<'a> {
    pub params: &'a RunParams,
    pub started_at: DateTime<Local>,
    pub files_a: usize,
    pub files_b: usize,
    pub mirrored_to_b: &'a MirrorReport,
    pub mirrored_to_a: &'a MirrorReport,
    pub a_to_b: &'a CopyReport,
    pub b_to_a: &'a CopyReport,
    pub elapsed: Duration,
}

/// A written run log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLogArtifact {
    pub file_name: String,
    pub contents: String,
    pub path_a: PathBuf,
    pub path_b: PathBuf,
}

/// Log file name for a run started at `started_at`.
///
/// `attempt` > 0 adds a numeric suffix, used when the plain name is taken.
pub fn log_file_name(started_at: &DateTime<Local>, attempt: usize) -> String {
    let stamp = started_at.format("%Y-%m-%d_%H-%M-%S");
    if attempt == 0 {
        format!("{stamp}_sync.log")
    } else {
        format!("{stamp}_{attempt}_sync.log")
    }
}

/// Render the transcript of a run.
pub fn render(record: &RunRecord<'_>) -> String {
    let mut out = String::new();
    // Writing into a String never fails.
    let _ = write_transcript(&mut out, record);
    out
}

fn write_transcript(out: &mut String, record: &RunRecord<'_>) -> fmt::Result {
    let params = record.params;
    let reports = [record.a_to_b, record.b_to_a];
    let copied: usize = reports.iter().map(|r| r.copied()).sum();
    let bytes: u64 = reports.iter().map(|r| r.bytes()).sum();
    let failed: usize = reports.iter().map(|r| r.failed()).sum();
    let skipped: usize = reports.iter().map(|r| r.skipped_count()).sum();
    // (destination root, mirror outcome)
    let mirrors = [
        (params.root_b.as_path(), record.mirrored_to_b),
        (params.root_a.as_path(), record.mirrored_to_a),
    ];
    let dirs_created: usize = mirrors.iter().map(|(_, m)| m.created.len()).sum();
    let dirs_failed: usize = mirrors.iter().map(|(_, m)| m.failed.len()).sum();

    writeln!(out, "Parameters:")?;
    writeln!(out, "  folderA: {}", params.root_a.display())?;
    writeln!(out, "  folderB: {}", params.root_b.display())?;
    writeln!(out, "  sync_most_recent: {}", params.sync_most_recent)?;
    writeln!(out, "  ignore_files: {:?}", params.ignore.ignore_files())?;
    writeln!(out, "  ignore_extensions: {:?}", params.ignore.ignore_extensions())?;
    writeln!(out, "  ignore_hidden: {}", params.ignore.ignore_hidden())?;
    writeln!(out)?;
    writeln!(
        out,
        "Considered {} files in A and {} in B.",
        record.files_a, record.files_b
    )?;
    writeln!(
        out,
        "Mirrored directories ({} created, {} failed).",
        dirs_created, dirs_failed
    )?;
    writeln!(
        out,
        "Synced {} files ({} copied, {} bytes, {} failed, {} skipped) between {} and {} in {:.3} seconds.",
        record.files_a + record.files_b,
        copied,
        bytes,
        failed,
        skipped,
        params.root_a.display(),
        params.root_b.display(),
        record.elapsed.as_secs_f64()
    )?;

    for (root, mirror) in mirrors {
        for rel in &mirror.created {
            writeln!(out, "Created directory: {}", root.join(rel).display())?;
        }
    }
    for report in reports {
        for r in &report.records {
            if let CopyOutcome::Copied { .. } = r.outcome {
                let (src, dst) = r.decision.endpoints(&params.root_a, &params.root_b);
                writeln!(
                    out,
                    "Because of '{}': {} ==> {}",
                    r.decision.reason,
                    src.display(),
                    dst.display()
                )?;
            }
        }
    }

    for (root, mirror) in mirrors {
        for rel in &mirror.failed {
            writeln!(out, "FAILED to create directory: {}", root.join(rel).display())?;
        }
    }
    for report in reports {
        for r in &report.records {
            let (src, dst) = r.decision.endpoints(&params.root_a, &params.root_b);
            match &r.outcome {
                CopyOutcome::Failed(err) => writeln!(
                    out,
                    "FAILED because of '{}': {} ==> {} ({})",
                    r.decision.reason,
                    src.display(),
                    dst.display(),
                    err
                )?,
                CopyOutcome::Skipped => writeln!(
                    out,
                    "SKIPPED because of '{}': {} ==> {}",
                    r.decision.reason,
                    src.display(),
                    dst.display()
                )?,
                CopyOutcome::Copied { .. } => {}
            }
        }
    }
    Ok(())
}

fn write_new(path: &Path, contents: &str) -> Result<()> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            return Err(SyncError::LogExists {
                path: path.to_path_buf(),
            });
        }
        Err(err) => return Err(SyncError::io("create run log", path, err)),
    };
    file.write_all(contents.as_bytes())
        .and_then(|()| file.sync_all())
        .map_err(|e| SyncError::io("write run log", path, e))
}

fn same_dir(a: &Path, b: &Path) -> Result<bool> {
    let a = fs::canonicalize(a).map_err(|e| SyncError::io("resolve", a, e))?;
    let b = fs::canonicalize(b).map_err(|e| SyncError::io("resolve", b, e))?;
    Ok(a == b)
}

/// Write the run log under both roots and return where it went.
pub fn record(record: &RunRecord<'_>) -> Result<RunLogArtifact> {
    let dir_a = record.params.root_a.join(LOG_DIR_NAME);
    let dir_b = record.params.root_b.join(LOG_DIR_NAME);
    for dir in [&dir_a, &dir_b] {
        fs::create_dir_all(dir).map_err(|e| SyncError::io("create log directory", dir, e))?;
    }
    let shared = same_dir(&dir_a, &dir_b)?;
    let contents = render(record);

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let file_name = log_file_name(&record.started_at, attempt);
        let path_a = dir_a.join(&file_name);
        let path_b = dir_b.join(&file_name);
        if path_a.exists() || path_b.exists() {
            continue;
        }
        write_new(&path_a, &contents)?;
        if !shared {
            write_new(&path_b, &contents)?;
        }
        return Ok(RunLogArtifact {
            file_name,
            contents,
            path_a,
            path_b,
        });
    }
    Err(SyncError::LogExists {
        path: dir_a.join(log_file_name(&record.started_at, 0)),
    })
}
