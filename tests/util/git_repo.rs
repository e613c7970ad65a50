use std::fs;
use std::path::{Path, PathBuf};

use git2::build::CheckoutBuilder;
use git2::{
    BranchType, Commit, IndexAddOption, Oid, Repository, RepositoryInitOptions, ResetType,
    Signature,
};

/// A throwaway repository whose `main` branch is born on the first commit.
pub struct GitRepo {
    pub path: PathBuf,
    pub repo: Repository,
}

#[allow(dead_code)]
impl GitRepo {
    pub fn init(path: &Path) -> Self {
        fs::create_dir_all(path).unwrap();
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(path, &opts).unwrap();
        Self {
            path: path.to_path_buf(),
            repo,
        }
    }

    fn signature() -> Signature<'static> {
        Signature::now("Gori Test", "gori@example.com").unwrap()
    }

    pub fn write_file(&self, name: &str, contents: &str) {
        fs::write(self.path.join(name), contents).unwrap();
    }

    /// Stages everything and commits it onto HEAD.
    pub fn commit_all(&self, message: &str) -> Oid {
        let mut index = self.repo.index().unwrap();
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree = self.repo.find_tree(index.write_tree().unwrap()).unwrap();

        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&Commit> = parent.iter().collect();
        let sig = Self::signature();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }

    /// Writes a file named after `message` and commits it.
    pub fn commit_file(&self, message: &str) -> Oid {
        self.write_file(&format!("{message}.txt"), message);
        self.commit_all(message)
    }

    /// Points `origin/<branch>` at `oid`, as a fetch would have.
    pub fn set_remote_branch(&self, branch: &str, oid: Oid) {
        self.repo
            .reference(&format!("refs/remotes/origin/{branch}"), oid, true, "fetch")
            .unwrap();
    }

    pub fn checkout_new_branch(&self, name: &str) {
        let head = self.repo.head().unwrap().peel_to_commit().unwrap();
        self.repo.branch(name, &head, false).unwrap();
        self.repo.set_head(&format!("refs/heads/{name}")).unwrap();
    }

    pub fn checkout_branch(&self, name: &str) {
        self.repo.find_branch(name, BranchType::Local).unwrap();
        self.repo.set_head(&format!("refs/heads/{name}")).unwrap();
        self.repo
            .checkout_head(Some(CheckoutBuilder::new().force()))
            .unwrap();
    }

    /// Moves the current branch and the working tree to `oid`.
    pub fn reset_hard(&self, oid: Oid) {
        let commit = self.repo.find_commit(oid).unwrap();
        self.repo
            .reset(commit.as_object(), ResetType::Hard, None)
            .unwrap();
    }

    pub fn detach_head(&self) {
        let oid = self.repo.head().unwrap().target().unwrap();
        self.repo.set_head_detached(oid).unwrap();
    }

    /// Modifies a tracked file and stashes the change.
    pub fn stash_change(&mut self, name: &str) {
        self.write_file(name, "work in progress");
        let sig = Self::signature();
        self.repo.stash_save(&sig, "wip", None).unwrap();
    }
}
