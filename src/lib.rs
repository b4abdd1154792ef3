//! Core library for folder-sync: two-way folder synchronization.
//!
//! A run mirrors the directory structure of both roots, enumerates the files
//! that pass the ignore rules, copies files that are missing on one side
//! (and, optionally, files that are newer on one side), and leaves an
//! identical run log under `.sync_logs` in both roots.

pub mod copy;
pub mod error;
pub mod filter;
pub mod journal;
pub mod mirror;
pub mod progress;
pub mod reconcile;
pub mod sync;
pub mod walk;

pub use copy::FailurePolicy;
pub use error::{Result, Side, SyncError};
pub use filter::{IgnoreSpec, LOG_DIR_NAME, PathFilter};
pub use reconcile::{CopyDecision, CopyReason, Direction};
pub use sync::{SyncOptions, SyncPlan, SyncReport, plan, sync_folders};
