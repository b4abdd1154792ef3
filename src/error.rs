//! Error types for folder-sync

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type for folder-sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// One of the two roots of a sync pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => f.write_str("A"),
            Side::B => f.write_str("B"),
        }
    }
}

/// Errors that can occur while synchronizing two folders
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Folder {side} does not exist: {}", path.display())]
    MissingRoot { side: Side, path: PathBuf },

    #[error("Failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Run log already exists: {}", path.display())]
    LogExists { path: PathBuf },
}

impl SyncError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
