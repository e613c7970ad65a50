// src/repo_status.rs
use std::path::{Path, PathBuf};

/// Verdict for a single scanned project.
///
/// The three findings are independent. The `*_snoozed` flags record that a
/// finding was silenced by the snooze store rather than being absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectStatus {
    pub path: PathBuf,
    pub is_dirty: bool,
    pub has_stash: bool,
    pub upstreamed: bool,
    pub is_dirty_snoozed: bool,
    pub has_stash_snoozed: bool,
    pub upstreamed_snoozed: bool,
    /// Porcelain style summary of changed files, only filled in for dirty
    /// projects when the caller asked for it.
    pub status_string: Option<String>,
}

impl ProjectStatus {
    pub fn new(path: impl Into<PathBuf>, is_dirty: bool, has_stash: bool, upstreamed: bool) -> Self {
        Self {
            path: path.into(),
            is_dirty,
            has_stash,
            upstreamed,
            is_dirty_snoozed: false,
            has_stash_snoozed: false,
            upstreamed_snoozed: false,
            status_string: None,
        }
    }

    pub fn is_clean(&self) -> bool {
        !self.is_dirty && !self.has_stash && self.upstreamed
    }

    /// Final path component, used as the name on status lines.
    pub fn display_name(&self) -> String {
        display_name(&self.path)
    }
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
