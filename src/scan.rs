//! Scanning a flat directory of project checkouts.
//!
//! Each immediate subdirectory is evaluated on the blocking pool, at most
//! `concurrency` at a time. Results come back in sorted directory order no
//! matter which evaluation finishes first.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::barrier::{ordered_slots, OrderedSlots};
use crate::config::SnoozeConfig;
use crate::error::{Result, StatusError};
use crate::evaluator::Evaluate;
use crate::repo_status::ProjectStatus;
use crate::snooze;

pub const DEFAULT_CONCURRENCY: usize = 8;
pub const MAX_CONCURRENCY: usize = 64;

const CONCURRENCY_ENV: &str = "GORI_CONCURRENCY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Evaluations allowed in flight at once.
    pub concurrency: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

pub fn parse_concurrency(raw: Option<&str>, default_value: usize) -> usize {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default_value)
        .clamp(1, MAX_CONCURRENCY)
}

pub fn concurrency_from_env() -> usize {
    let raw = std::env::var(CONCURRENCY_ENV).ok();
    parse_concurrency(raw.as_deref(), DEFAULT_CONCURRENCY)
}

/// Immediate subdirectories of `root`, sorted by name.
pub fn candidate_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_dir() => dirs.push(entry.into_path()),
            Ok(_) => {}
            Err(e) if e.depth() == 0 => {
                let message = e.to_string();
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, message));
                return Err(StatusError::ScanRootUnreadable {
                    path: root.to_path_buf(),
                    source,
                });
            }
            Err(e) => warn!("skipping unreadable entry: {e}"),
        }
    }
    Ok(dirs)
}

/// Tally of a finished scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub scanned: usize,
    pub clean: usize,
    pub attention: usize,
    /// Directories that are not repositories.
    pub skipped: usize,
    pub errors: usize,
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} repositories scanned: {} clean, {} need attention, {} errors",
            self.scanned - self.skipped,
            self.clean,
            self.attention,
            self.errors
        )
    }
}

/// A running scan. Pull results with [`Scan::next`].
pub struct Scan {
    paths: Vec<PathBuf>,
    results: OrderedSlots<Result<ProjectStatus>>,
    summary: ScanSummary,
}

impl Scan {
    /// Lists the candidates under `root` and starts evaluating them.
    ///
    /// Must be called from within a Tokio runtime. Snoozes from `config` are
    /// applied to every successful evaluation before it is published.
    pub fn start<E: Evaluate>(
        root: &Path,
        options: ScanOptions,
        config: SnoozeConfig,
        evaluator: E,
    ) -> Result<Self> {
        let paths = candidate_dirs(root)?;
        let (slots, results) = ordered_slots(paths.len());

        let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
        let evaluator = Arc::new(evaluator);
        let config = Arc::new(config);
        let root = root.to_path_buf();
        let jobs: Vec<_> = slots.into_iter().zip(paths.iter().cloned()).collect();
        let now = Local::now();

        tokio::spawn(async move {
            for (slot, path) in jobs {
                let Ok(permit) = semaphore.clone().acquire_owned().await else {
                    return;
                };
                let evaluator = Arc::clone(&evaluator);
                let config = Arc::clone(&config);
                let root = root.clone();
                tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    let outcome = evaluator.evaluate(&path).map(|status| {
                        if status.is_clean() {
                            status
                        } else {
                            snooze::apply(&path, status, &config, &root, now)
                        }
                    });
                    slot.fill(outcome);
                });
            }
        });

        Ok(Self {
            paths,
            results,
            summary: ScanSummary::default(),
        })
    }

    /// Next project with an unresolved finding, in sorted directory order.
    ///
    /// Clean projects and failed evaluations are counted and skipped; failures
    /// are logged with their path.
    pub async fn next(&mut self) -> Option<ProjectStatus> {
        while let Some(outcome) = self.results.next().await {
            self.summary.scanned += 1;
            match outcome {
                Ok(Ok(status)) if status.is_clean() => self.summary.clean += 1,
                Ok(Ok(status)) => {
                    self.summary.attention += 1;
                    return Some(status);
                }
                Ok(Err(e)) if e.is_not_a_repo() => {
                    self.summary.skipped += 1;
                    debug!("{e}");
                }
                Ok(Err(e)) => {
                    self.summary.errors += 1;
                    warn!("{e}");
                }
                Err(index) => {
                    self.summary.errors += 1;
                    warn!("{}", StatusError::WorkerLost(self.paths[index].clone()));
                }
            }
        }
        None
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn summary(&self) -> ScanSummary {
        self.summary
    }
}

/// Scans `root` and collects every project that needs attention, in order.
pub async fn scan<E: Evaluate>(
    root: &Path,
    options: ScanOptions,
    config: SnoozeConfig,
    evaluator: E,
) -> Result<Vec<ProjectStatus>> {
    let mut scan = Scan::start(root, options, config, evaluator)?;
    let mut projects = Vec::new();
    while let Some(status) = scan.next().await {
        projects.push(status);
    }
    debug!("{}", scan.summary());
    Ok(projects)
}
