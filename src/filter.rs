//! Path filtering rules for folder-sync
//!
//! Every path handled here is relative to its root. Two files on different
//! roots are the same file when their relative paths have equal components.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Name of the directory holding run logs under each root. Always ignored.
pub const LOG_DIR_NAME: &str = ".sync_logs";

/// Names starting with this character are hidden.
pub const HIDDEN_MARKER: char = '.';

/// Immutable ignore configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreSpec {
    ignore_files: Vec<String>,
    ignore_extensions: Vec<String>,
    ignore_hidden: bool,
}

impl Default for IgnoreSpec {
    fn default() -> Self {
        Self::new(Vec::<String>::new(), Vec::<String>::new(), true)
    }
}

impl IgnoreSpec {
    /// Build an ignore spec from caller input.
    ///
    /// Ignore-file entries are normalized to relative `/`-separated form and the
    /// reserved log directory is always appended.
    pub fn new<F, E>(ignore_files: F, ignore_extensions: E, ignore_hidden: bool) -> Self
    where
        F: IntoIterator,
        F::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let mut files: Vec<String> = ignore_files
            .into_iter()
            .filter_map(|entry| normalize_entry(entry.as_ref()))
            .collect();
        if !files.iter().any(|entry| entry == LOG_DIR_NAME) {
            files.push(LOG_DIR_NAME.to_string());
        }
        let extensions = ignore_extensions
            .into_iter()
            .map(|ext| ext.as_ref().to_string())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self {
            ignore_files: files,
            ignore_extensions: extensions,
            ignore_hidden,
        }
    }

    pub fn ignore_files(&self) -> &[String] {
        &self.ignore_files
    }

    pub fn ignore_extensions(&self) -> &[String] {
        &self.ignore_extensions
    }

    pub fn ignore_hidden(&self) -> bool {
        self.ignore_hidden
    }
}

fn normalize_entry(entry: &str) -> Option<String> {
    let mut entry = entry.replace('\\', "/");
    while let Some(rest) = entry.strip_prefix("./") {
        entry = rest.to_string();
    }
    let trimmed = entry.trim_matches('/');
    if trimmed.is_empty() || trimmed == "." {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Decides which relative paths are visible to synchronization.
#[derive(Debug, Clone)]
pub struct PathFilter {
    spec: IgnoreSpec,
}

impl PathFilter {
    pub fn new(spec: IgnoreSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &IgnoreSpec {
        &self.spec
    }

    /// Returns whether `rel_path` should take part in synchronization.
    ///
    /// Rules, in order:
    /// 1. hidden names are rejected when hidden exclusion is on;
    /// 2. a path equal to an ignore-file entry, or lying beneath one, is rejected;
    /// 3. files whose path ends with an ignored extension are rejected.
    ///
    /// Names are compared as raw bytes, so paths that are not valid UTF-8 are
    /// handled like any other. A directory for which this returns `false` must
    /// not be descended into.
    pub fn visible(&self, rel_path: impl AsRef<Path>, is_dir: bool) -> bool {
        let rel_path = rel_path.as_ref();
        if self.spec.ignore_hidden
            && rel_path.components().any(|component| match component {
                Component::Normal(name) => name
                    .as_encoded_bytes()
                    .starts_with(&[HIDDEN_MARKER as u8]),
                _ => false,
            })
        {
            return false;
        }

        // Path::starts_with matches whole components only.
        if self
            .spec
            .ignore_files
            .iter()
            .any(|entry| rel_path.starts_with(entry))
        {
            return false;
        }

        if !is_dir {
            let bytes = rel_path.as_os_str().as_encoded_bytes();
            if self
                .spec
                .ignore_extensions
                .iter()
                .any(|ext| bytes.ends_with(ext.as_bytes()))
            {
                return false;
            }
        }

        true
    }
}

/// Express `path` relative to `root`, keeping only normal components.
///
/// Returns `None` for the root itself or for paths outside of `root`.
pub fn relative_path(root: &Path, path: &Path) -> Option<PathBuf> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: PathBuf = rel
        .components()
        .filter(|component| matches!(component, Component::Normal(_)))
        .collect();
    if parts.as_os_str().is_empty() {
        None
    } else {
        Some(parts)
    }
}

/// Resolve a relative path against `root`.
pub fn join_relative(root: &Path, rel_path: &Path) -> PathBuf {
    root.join(rel_path)
}

/// First symbolic link met while resolving `rel_path` under `root`, if any.
///
/// The final component counts too. Resolution stops at the first component
/// that does not exist.
pub fn first_link(root: &Path, rel_path: &Path) -> io::Result<Option<PathBuf>> {
    let mut current = root.to_path_buf();
    for component in rel_path.components() {
        current.push(component);
        match std::fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => return Ok(Some(current)),
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => break,
            Err(err) => return Err(err),
        }
    }
    Ok(None)
}
