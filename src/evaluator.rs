use std::path::Path;

use git2::{Repository, Status, StatusOptions, Statuses};
use tracing::{debug, info, warn};

use crate::error::{Result, StatusError};
use crate::repo_status::ProjectStatus;
use crate::upstream::{find_mainish_branch, is_branch_upstreamed};

/// Produces a verdict for one candidate directory.
///
/// The scanner only talks to this trait, so tests can drive it with fixtures
/// instead of real repositories.
pub trait Evaluate: Send + Sync + 'static {
    fn evaluate(&self, path: &Path) -> Result<ProjectStatus>;
}

impl<F> Evaluate for F
where
    F: Fn(&Path) -> Result<ProjectStatus> + Send + Sync + 'static,
{
    fn evaluate(&self, path: &Path) -> Result<ProjectStatus> {
        self(path)
    }
}

/// Evaluates projects by opening them as git repositories.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitEvaluator {
    /// Attach a summary of changed files to dirty projects.
    pub show_changes: bool,
}

impl GitEvaluator {
    pub fn new(show_changes: bool) -> Self {
        Self { show_changes }
    }
}

impl Evaluate for GitEvaluator {
    fn evaluate(&self, path: &Path) -> Result<ProjectStatus> {
        let repo = Repository::open(path).map_err(|source| StatusError::RepoOpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        evaluate(&repo, path, self.show_changes)
    }
}

/// How the checked out branch was found to be upstreamed, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    /// Contained in the same-named branch on origin.
    Tracking,
    /// Contained in origin's integration branch.
    Mainish(&'static str),
    NotUpstreamed,
}

impl Upstream {
    pub fn is_upstreamed(self) -> bool {
        !matches!(self, Upstream::NotUpstreamed)
    }
}

/// Combines working tree, stash and upstream state of an open repository.
pub fn evaluate(repo: &Repository, path: &Path, show_changes: bool) -> Result<ProjectStatus> {
    let statuses = worktree_statuses(repo).map_err(|source| StatusError::WorktreeStatusFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let is_dirty = !statuses.is_empty();

    let mut project = ProjectStatus::new(
        path,
        is_dirty,
        has_stash(repo),
        resolve_upstream(repo, path).is_upstreamed(),
    );
    if is_dirty && show_changes {
        project.status_string = Some(status_summary(&statuses));
    }
    Ok(project)
}

pub(crate) fn worktree_statuses(repo: &Repository) -> std::result::Result<Statuses<'_>, git2::Error> {
    repo.statuses(Some(
        StatusOptions::new()
            .include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false)
            .include_unmodified(false),
    ))
}

/// Presence of the stash ref, the content is never inspected.
pub fn has_stash(repo: &Repository) -> bool {
    repo.find_reference("refs/stash").is_ok()
}

/// Works out whether the current checkout has reached origin.
///
/// The same-named origin branch is tried first, then origin's main or master.
/// Every failure ends up as `NotUpstreamed` with a diagnostic; nothing here is
/// allowed to abort a scan.
pub fn resolve_upstream(repo: &Repository, path: &Path) -> Upstream {
    let path = path.display();

    let head = match repo.head() {
        Ok(head) => head,
        Err(e) => {
            warn!(%path, "error getting HEAD: {e}");
            return Upstream::NotUpstreamed;
        }
    };

    // TODO: fall back to checking whether the detached commit itself is upstreamed
    let branch = match head.shorthand() {
        Some(name) if head.is_branch() => name,
        _ => {
            info!(%path, "local checkout does not have branch name");
            return Upstream::NotUpstreamed;
        }
    };

    match is_branch_upstreamed(repo, branch, branch) {
        Ok(true) => return Upstream::Tracking,
        Ok(false) => {}
        Err(e) if e.is_remote_ref_not_found() => debug!(%path, "{e}"),
        Err(e) => warn!(%path, "error checking if branch itself is upstreamed: {e}"),
    }

    let mainish = match find_mainish_branch(repo) {
        Ok(mainish) => mainish,
        Err(e) => {
            info!(%path, "could not determine upstream branch: {e}");
            return Upstream::NotUpstreamed;
        }
    };

    match is_branch_upstreamed(repo, branch, mainish) {
        Ok(true) => Upstream::Mainish(mainish),
        Ok(false) => Upstream::NotUpstreamed,
        Err(e) if e.is_remote_ref_not_found() => {
            info!(%path, "origin does not have {mainish} branch");
            Upstream::NotUpstreamed
        }
        Err(e) => {
            warn!(%path, "error checking if branch is upstreamed into {mainish}: {e}");
            Upstream::NotUpstreamed
        }
    }
}

/// Two column summary of changed files, index first, then working tree.
pub fn status_summary(statuses: &Statuses<'_>) -> String {
    let mut lines = Vec::with_capacity(statuses.len());
    for entry in statuses.iter() {
        let status = entry.status();
        let path = entry.path().unwrap_or("<non-utf8 path>");
        lines.push(format!("{} {path}", status_code(status)));
    }
    lines.join("\n")
}

fn status_code(status: Status) -> String {
    if status.is_conflicted() {
        return "UU".to_string();
    }
    if status.is_wt_new() && !status.intersects(index_flags()) {
        return "??".to_string();
    }

    let index = if status.is_index_new() {
        'A'
    } else if status.is_index_modified() {
        'M'
    } else if status.is_index_deleted() {
        'D'
    } else if status.is_index_renamed() {
        'R'
    } else if status.is_index_typechange() {
        'T'
    } else {
        ' '
    };
    let worktree = if status.is_wt_modified() {
        'M'
    } else if status.is_wt_deleted() {
        'D'
    } else if status.is_wt_renamed() {
        'R'
    } else if status.is_wt_typechange() {
        'T'
    } else if status.is_wt_new() {
        '?'
    } else {
        ' '
    };
    format!("{index}{worktree}")
}

fn index_flags() -> Status {
    Status::INDEX_NEW
        | Status::INDEX_MODIFIED
        | Status::INDEX_DELETED
        | Status::INDEX_RENAMED
        | Status::INDEX_TYPECHANGE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_porcelain_columns() {
        assert_eq!(status_code(Status::WT_NEW), "??");
        assert_eq!(status_code(Status::WT_MODIFIED), " M");
        assert_eq!(status_code(Status::INDEX_NEW), "A ");
        assert_eq!(status_code(Status::INDEX_MODIFIED | Status::WT_MODIFIED), "MM");
        assert_eq!(status_code(Status::INDEX_DELETED), "D ");
        assert_eq!(status_code(Status::CONFLICTED), "UU");
    }

    #[test]
    fn only_not_upstreamed_is_a_finding() {
        assert!(Upstream::Tracking.is_upstreamed());
        assert!(Upstream::Mainish("main").is_upstreamed());
        assert!(!Upstream::NotUpstreamed.is_upstreamed());
    }

    #[test]
    fn closures_can_stand_in_for_the_evaluator() {
        let fixture =
            |path: &Path| -> Result<ProjectStatus> { Ok(ProjectStatus::new(path, true, false, true)) };
        let status = fixture.evaluate(Path::new("demo")).unwrap();
        assert!(status.is_dirty);
        assert_eq!(status.path, Path::new("demo"));
    }
}
