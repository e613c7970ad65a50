//! Deciding whether a local branch has already reached `origin`.
//!
//! Everything here is read-only and works on the remote-tracking refs that are
//! already present locally. Fetching is left to the user.

use git2::{BranchType, ErrorCode, Repository};

use crate::error::{Result, StatusError};

pub const REMOTE: &str = "origin";

const MAIN: &str = "main";
const MASTER: &str = "master";

/// Guesses the integration branch from the remote-tracking refs of `origin`.
///
/// `main` is preferred over `master` when both exist, independent of the
/// order in which libgit2 enumerates the refs.
pub fn find_mainish_branch(repo: &Repository) -> Result<&'static str> {
    let main = format!("{REMOTE}/{MAIN}");
    let master = format!("{REMOTE}/{MASTER}");

    let mut has_main = false;
    let mut has_master = false;
    for branch in repo.branches(Some(BranchType::Remote))? {
        let (branch, _) = branch?;
        // Non UTF-8 names can't be either of the two we're looking for.
        match branch.name() {
            Ok(Some(name)) if name == main => has_main = true,
            Ok(Some(name)) if name == master => has_master = true,
            _ => {}
        }
    }

    match (has_main, has_master) {
        (true, _) => Ok(MAIN),
        (false, true) => Ok(MASTER),
        (false, false) => Err(StatusError::NoMainishBranch),
    }
}

/// Checks whether every commit of `local_branch` is also reachable from
/// `origin/<remote_branch>`.
///
/// Being identical to or behind the remote both count as upstreamed. A missing
/// remote ref is reported as [`StatusError::RemoteRefNotFound`] so callers can
/// tell it apart from real failures.
pub fn is_branch_upstreamed(
    repo: &Repository,
    local_branch: &str,
    remote_branch: &str,
) -> Result<bool> {
    let local = repo
        .find_branch(local_branch, BranchType::Local)
        .and_then(|branch| branch.get().peel_to_commit())
        .map_err(|_| StatusError::LocalBranchNotFound(local_branch.to_string()))?
        .id();

    let remote_ref = match repo.find_reference(&format!("refs/remotes/{REMOTE}/{remote_branch}")) {
        Ok(reference) => reference,
        Err(e) if e.code() == ErrorCode::NotFound => {
            return Err(StatusError::RemoteRefNotFound(format!(
                "{REMOTE}/{remote_branch}"
            )))
        }
        Err(e) => return Err(e.into()),
    };
    let remote = remote_ref.peel_to_commit()?.id();

    Ok(local == remote || repo.graph_descendant_of(remote, local)?)
}
