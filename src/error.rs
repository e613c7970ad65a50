use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StatusError>;

/// Failures raised while scanning projects or maintaining the snooze store.
///
/// Per-project variants are caught at the project boundary by the scanner and
/// turned into diagnostics. Only `ScanRootUnreadable` aborts a whole scan.
#[derive(Error, Debug)]
pub enum StatusError {
    #[error("{path}: not a git repository: {source}")]
    RepoOpenFailed {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("{path}: could not get repo status: {source}")]
    WorktreeStatusFailed {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("could not get local branch {0}")]
    LocalBranchNotFound(String),

    /// `origin` has no branch of that name. Expected for brand new branches.
    #[error("origin does not have branch {0}")]
    RemoteRefNotFound(String),

    #[error("neither main nor master branch exists on origin")]
    NoMainishBranch,

    #[error("could not read scan root {path}: {source}")]
    ScanRootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed snooze store {path}: {source}")]
    StoreMalformed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("could not write snooze store {path}: {reason}")]
    StoreWrite { path: PathBuf, reason: String },

    #[error("invalid duration format: {0}. Use formats like 1h, 30min, 2d, 3w, 4m, 5y")]
    InvalidDuration(String),

    #[error("invalid check {0}, expected one of dirty, stash, upstream, all")]
    InvalidCheck(String),

    #[error("invalid snooze timestamp {0}")]
    InvalidTimestamp(String),

    #[error("the scan worker for {0} exited without a result")]
    WorkerLost(PathBuf),

    #[error(transparent)]
    Git(#[from] git2::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StatusError {
    pub fn is_remote_ref_not_found(&self) -> bool {
        matches!(self, StatusError::RemoteRefNotFound(_))
    }

    /// True for directories that simply are not repositories; the scanner
    /// skips those without a visible diagnostic.
    pub fn is_not_a_repo(&self) -> bool {
        matches!(self, StatusError::RepoOpenFailed { .. })
    }
}
