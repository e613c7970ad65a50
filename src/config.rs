use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, StatusError};
use crate::snooze::SnoozeKind;

/// Name of the snooze store, always located in the scan root.
pub const STORE_FILE_NAME: &str = ".goriignore.toml";

/// Per-kind snooze deadlines. A missing key means the kind is not snoozed.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
pub struct Snooze {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dirty_workdir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stashes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_upstreamed: Option<String>,
}

impl Snooze {
    pub fn get(&self, kind: SnoozeKind) -> Option<&str> {
        match kind {
            SnoozeKind::DirtyWorkdir => self.dirty_workdir.as_deref(),
            SnoozeKind::Stashes => self.stashes.as_deref(),
            SnoozeKind::NotUpstreamed => self.not_upstreamed.as_deref(),
        }
    }

    pub fn set(&mut self, kind: SnoozeKind, until: String) {
        let slot = match kind {
            SnoozeKind::DirtyWorkdir => &mut self.dirty_workdir,
            SnoozeKind::Stashes => &mut self.stashes,
            SnoozeKind::NotUpstreamed => &mut self.not_upstreamed,
        };
        *slot = Some(until);
    }

    pub fn is_empty(&self) -> bool {
        self.dirty_workdir.is_none() && self.stashes.is_none() && self.not_upstreamed.is_none()
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct RepoEntry {
    /// Relative to the directory holding the store.
    pub path: String,
    #[serde(default, skip_serializing_if = "Snooze::is_empty")]
    pub snooze: Snooze,
}

impl RepoEntry {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            snooze: Snooze::default(),
        }
    }

    /// Absolute, lexically normalized location this entry refers to.
    pub fn location(&self, scan_root: &Path) -> PathBuf {
        absolute_location(&scan_root.join(&self.path))
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
pub struct SnoozeConfig {
    #[serde(default)]
    pub repos: Vec<RepoEntry>,
}

impl SnoozeConfig {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn store_path(scan_root: &Path) -> PathBuf {
        scan_root.join(STORE_FILE_NAME)
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);

        let mut buffer = String::new();
        reader.read_to_string(&mut buffer)?;

        toml::from_str(&buffer).map_err(|source| StatusError::StoreMalformed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads the store of `scan_root`. A missing store is an empty one.
    pub fn load(scan_root: &Path) -> Result<Self> {
        match Self::load_file(&Self::store_path(scan_root)) {
            Err(StatusError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(Self::empty()),
            other => other,
        }
    }

    /// Like [`SnoozeConfig::load`], but an unreadable store only disables
    /// snoozing for this scan.
    pub fn load_or_warn(scan_root: &Path) -> Self {
        Self::load(scan_root).unwrap_or_else(|e| {
            warn!("loading ignore config: {e}");
            Self::empty()
        })
    }

    /// Serializes `self` as TOML and writes it to `path`, replacing whatever
    /// was there.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string(self).map_err(|e| StatusError::StoreWrite {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        fs::write(path, contents).map_err(|e| StatusError::StoreWrite {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn save(&self, scan_root: &Path) -> Result<()> {
        self.save_to_path(&Self::store_path(scan_root))
    }

    /// Entries whose path resolves to the same location as `project`.
    pub fn entries_for<'a>(
        &'a self,
        project: &Path,
        scan_root: &'a Path,
    ) -> impl Iterator<Item = &'a RepoEntry> + 'a {
        let target = absolute_location(project);
        self.repos
            .iter()
            .filter(move |entry| entry.location(scan_root) == target)
    }

    /// Returns the entry for `project`, appending a new one stored relative to
    /// `scan_root` if none matches yet.
    pub fn entry_mut(&mut self, project: &Path, scan_root: &Path) -> &mut RepoEntry {
        let target = absolute_location(project);
        let position = self
            .repos
            .iter()
            .position(|entry| entry.location(scan_root) == target);

        let index = match position {
            Some(index) => index,
            None => {
                self.repos
                    .push(RepoEntry::new(relative_path(project, scan_root)));
                self.repos.len() - 1
            }
        };
        &mut self.repos[index]
    }
}

/// Makes `path` absolute against the current directory and folds away `.`
/// and `..` without touching the filesystem.
pub fn absolute_location(path: &Path) -> PathBuf {
    let anchored = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in anchored.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// `project` relative to `scan_root`, climbing out with `..` when it lives
/// elsewhere. Falls back to the absolute location when the two share no
/// prefix at all (different drives).
pub fn relative_path(project: &Path, scan_root: &Path) -> String {
    let project_abs = absolute_location(project);
    let root_abs = absolute_location(scan_root);

    let shared = project_abs
        .components()
        .zip(root_abs.components())
        .take_while(|(a, b)| a == b)
        .count();
    if shared == 0 {
        return project_abs.to_string_lossy().into_owned();
    }

    let mut rel = PathBuf::new();
    for _ in root_abs.components().skip(shared) {
        rel.push("..");
    }
    for component in project_abs.components().skip(shared) {
        rel.push(component.as_os_str());
    }

    if rel.as_os_str().is_empty() {
        ".".to_string()
    } else {
        rel.to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_store_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(SnoozeConfig::load(dir.path()).unwrap(), SnoozeConfig::empty());
    }

    #[test]
    fn malformed_store_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(SnoozeConfig::store_path(dir.path()), "repos = 12").unwrap();

        let err = SnoozeConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, StatusError::StoreMalformed { .. }));
        assert_eq!(SnoozeConfig::load_or_warn(dir.path()), SnoozeConfig::empty());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SnoozeConfig::empty();
        let entry = config.entry_mut(&dir.path().join("alpha"), dir.path());
        entry
            .snooze
            .set(SnoozeKind::Stashes, "2030-01-02 03:04:05".to_string());
        config.repos.push(RepoEntry::new("beta"));

        config.save(dir.path()).unwrap();
        let written = fs::read_to_string(SnoozeConfig::store_path(dir.path())).unwrap();
        assert!(written.contains("path = \"alpha\""));
        assert!(written.contains("stashes = \"2030-01-02 03:04:05\""));
        assert!(!written.contains("dirty_workdir"));

        assert_eq!(SnoozeConfig::load(dir.path()).unwrap(), config);
    }

    #[test]
    fn reads_hand_written_store() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            SnoozeConfig::store_path(dir.path()),
            r#"
[[repos]]
path = "alpha"

[repos.snooze]
dirty_workdir = "2030-01-02 03:04:05"

[[repos]]
path = "beta"
"#,
        )
        .unwrap();

        let config = SnoozeConfig::load(dir.path()).unwrap();
        assert_eq!(config.repos.len(), 2);
        assert_eq!(
            config.repos[0].snooze.get(SnoozeKind::DirtyWorkdir),
            Some("2030-01-02 03:04:05")
        );
        assert!(config.repos[1].snooze.is_empty());
    }

    #[test]
    fn entries_match_by_resolved_location() {
        let root = Path::new("/scan/root");
        let config = SnoozeConfig {
            repos: vec![
                RepoEntry::new("alpha"),
                RepoEntry::new("./beta/../alpha"),
                RepoEntry::new("gamma"),
            ],
        };

        let matched: Vec<_> = config
            .entries_for(Path::new("/scan/root/alpha"), root)
            .map(|e| e.path.as_str())
            .collect();
        assert_eq!(matched, vec!["alpha", "./beta/../alpha"]);
    }

    #[test]
    fn entry_mut_reuses_existing_entry() {
        let root = Path::new("/scan/root");
        let mut config = SnoozeConfig {
            repos: vec![RepoEntry::new("alpha")],
        };

        config.entry_mut(Path::new("/scan/root/./alpha"), root);
        assert_eq!(config.repos.len(), 1);

        config.entry_mut(Path::new("/scan/root/beta"), root);
        assert_eq!(config.repos.len(), 2);
        assert_eq!(config.repos[1].path, "beta");
    }

    #[test]
    fn relative_path_climbs_out_of_root() {
        assert_eq!(
            relative_path(Path::new("/scan/root/alpha"), Path::new("/scan/root")),
            "alpha"
        );
        assert_eq!(
            relative_path(Path::new("/scan/root"), Path::new("/scan/root")),
            "."
        );
        assert_eq!(
            relative_path(Path::new("/scan/other"), Path::new("/scan/root")),
            "../other"
        );
        assert_eq!(
            relative_path(Path::new("/elsewhere/alpha"), Path::new("/scan/root")),
            "../../elsewhere/alpha"
        );
    }

    #[test]
    fn snooze_outside_root_applies_to_that_project() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("sub");
        fs::create_dir(&root).unwrap();
        let project = root.join("../other");

        crate::snooze::snooze(&root, &project, "1h", "dirty").unwrap();

        let config = SnoozeConfig::load(&root).unwrap();
        assert_eq!(config.repos.len(), 1);
        assert_eq!(config.repos[0].path, "../other");

        let status = crate::repo_status::ProjectStatus::new(&project, true, false, true);
        let status = crate::snooze::apply(&project, status, &config, &root, chrono::Local::now());
        assert!(status.is_dirty_snoozed);
        assert!(!status.is_dirty);
    }
}
