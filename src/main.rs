use anyhow::Context;
use clap::{ArgAction, Parser};
use folder_sync::progress::{NoProgress, Progress};
use folder_sync::{FailurePolicy, IgnoreSpec, SyncError, SyncOptions};
use std::path::PathBuf;
use std::process::ExitCode;

/// Keep two folders in sync by copying files missing on either side.
#[derive(Debug, Parser)]
#[command(name = "folder-sync", version)]
struct Cli {
    /// Path to the first folder.
    root_a: PathBuf,
    /// Path to the second folder.
    root_b: PathBuf,
    /// Also overwrite files whose counterpart was modified more recently.
    #[arg(long)]
    sync_most_recent: bool,
    /// Relative paths of files or folders to ignore.
    #[arg(long, num_args = 0.., value_name = "PATH")]
    ignore_files: Vec<String>,
    /// File suffixes to ignore, e.g. `.tmp`.
    #[arg(long, num_args = 0.., value_name = "SUFFIX")]
    ignore_extensions: Vec<String>,
    /// Ignore hidden files and folders (`--ignore-hidden false` to include them).
    #[arg(
        long,
        num_args = 0..=1,
        default_value_t = true,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    ignore_hidden: bool,
    /// Number of worker threads (default: 2x logical CPUs).
    #[arg(long, value_name = "N")]
    threads: Option<usize>,
    /// Stop copying at the first failed file.
    #[arg(long)]
    fail_fast: bool,
    /// Show planned copies without changing anything.
    #[arg(long)]
    dry_run: bool,
    /// Do not draw a progress bar.
    #[arg(long)]
    no_progress: bool,
}

impl Cli {
    fn options(&self) -> SyncOptions {
        let mut options = SyncOptions::new(&self.root_a, &self.root_b);
        options.sync_most_recent = self.sync_most_recent;
        options.ignore = IgnoreSpec::new(
            &self.ignore_files,
            &self.ignore_extensions,
            self.ignore_hidden,
        );
        options.failure_policy = if self.fail_fast {
            FailurePolicy::Abort
        } else {
            FailurePolicy::Continue
        };
        options
    }
}

#[cfg(feature = "progress")]
fn progress_sink(disabled: bool) -> Box<dyn Progress> {
    if disabled {
        Box::new(NoProgress)
    } else {
        Box::new(folder_sync::progress::BarProgress::new())
    }
}

#[cfg(not(feature = "progress"))]
fn progress_sink(_disabled: bool) -> Box<dyn Progress> {
    Box::new(NoProgress)
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    // Sensible default: 2x logical CPUs for I/O bound
    let num_threads = cli.threads.unwrap_or_else(|| num_cpus::get() * 2);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .context("failed to build thread pool")?;
    log::debug!("Using {} threads", num_threads);

    let options = cli.options();

    if cli.dry_run {
        let plan = folder_sync::plan(&options)?;
        println!(
            "Considered {} files ({} in A, {} in B)",
            plan.files_a + plan.files_b,
            plan.files_a,
            plan.files_b
        );
        for decision in plan.a_to_b.iter().chain(plan.b_to_a.iter()) {
            let (src, dst) = decision.endpoints(&options.root_a, &options.root_b);
            println!(
                "Would copy because of '{}': {} ==> {}",
                decision.reason,
                src.display(),
                dst.display()
            );
        }
        if plan.is_empty() {
            println!("Nothing to do.");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let progress = progress_sink(cli.no_progress);
    let report = folder_sync::sync_folders(&options, progress.as_ref())?;

    log::info!("Sync Logs at {}:", report.log.file_name);
    log::info!("{}", report.log.contents);
    if report.is_clean() {
        Ok(ExitCode::SUCCESS)
    } else {
        log::warn!(
            "{} copies failed, {} were skipped and {} directories could not be created",
            report.failed(),
            report.skipped(),
            report.mirror_failed()
        );
        Ok(ExitCode::from(2))
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            match err.downcast_ref::<SyncError>() {
                Some(SyncError::MissingRoot { .. }) => log::error!("{}", err),
                _ => log::error!("Sync failed: {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let argv = ["folder-sync", "/a", "/b"].iter().chain(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_ignore_hidden_forms() {
        assert!(parse(&[]).ignore_hidden);
        assert!(parse(&["--ignore-hidden"]).ignore_hidden);
        assert!(parse(&["--ignore-hidden", "true"]).ignore_hidden);
        assert!(!parse(&["--ignore-hidden", "false"]).ignore_hidden);
        assert!(!parse(&["--ignore-hidden=false"]).ignore_hidden);
    }

    #[test]
    fn test_bare_ignore_hidden_before_other_flags() {
        let cli = parse(&["--ignore-hidden", "--sync-most-recent"]);
        assert!(cli.ignore_hidden);
        assert!(cli.sync_most_recent);
    }

    #[test]
    fn test_options_from_flags() {
        let cli = parse(&[
            "--ignore-files",
            "build",
            "docs/draft.md",
            "--ignore-extensions",
            ".tmp",
            "--fail-fast",
        ]);
        let options = cli.options();
        assert_eq!(options.ignore.ignore_files(), &["build", "docs/draft.md", ".sync_logs"]);
        assert_eq!(options.ignore.ignore_extensions(), &[".tmp"]);
        assert!(options.ignore.ignore_hidden());
        assert_eq!(options.failure_policy, FailurePolicy::Abort);
    }
}
