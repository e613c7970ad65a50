//! Time boxed suppression of findings.
//!
//! A snooze only ever silences a finding that is currently bad, and only until
//! its deadline passes. Stale entries stay in the store until overwritten.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone};
use regex::Regex;
use tracing::warn;

use crate::config::{RepoEntry, SnoozeConfig};
use crate::error::{Result, StatusError};
use crate::repo_status::ProjectStatus;

/// Local wall clock, second precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// A thousand years is plenty and keeps every later date computation in range.
const MAX_SNOOZE_SECS: i64 = 1000 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnoozeKind {
    DirtyWorkdir,
    Stashes,
    NotUpstreamed,
}

impl SnoozeKind {
    pub const ALL: [SnoozeKind; 3] = [
        SnoozeKind::DirtyWorkdir,
        SnoozeKind::Stashes,
        SnoozeKind::NotUpstreamed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SnoozeKind::DirtyWorkdir => "dirty_workdir",
            SnoozeKind::Stashes => "stashes",
            SnoozeKind::NotUpstreamed => "not_upstreamed",
        }
    }
}

impl fmt::Display for SnoozeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which findings a snooze request covers, as typed by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Dirty,
    Stash,
    Upstream,
    All,
}

impl Check {
    pub fn kinds(self) -> &'static [SnoozeKind] {
        match self {
            Check::Dirty => &[SnoozeKind::DirtyWorkdir],
            Check::Stash => &[SnoozeKind::Stashes],
            Check::Upstream => &[SnoozeKind::NotUpstreamed],
            Check::All => &SnoozeKind::ALL,
        }
    }
}

impl FromStr for Check {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "dirty" => Ok(Check::Dirty),
            "stash" => Ok(Check::Stash),
            "upstream" => Ok(Check::Upstream),
            "all" => Ok(Check::All),
            _ => Err(StatusError::InvalidCheck(s.to_string())),
        }
    }
}

fn calendar_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)([dwmy])$").expect("valid regex"))
}

fn clock_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:\d+(?:\.\d+)?(?:h|min|ms|us|µs|ns|s))+$").expect("valid regex"))
}

fn clock_part_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)(h|min|ms|us|µs|ns|s)").expect("valid regex"))
}

/// Parses a snooze duration.
///
/// Accepts clock units, optionally chained (`1h`, `30min`, `1h30min`, `1.5h`,
/// `45s`), or a whole number of calendar units: `d` day, `w` week, `m` month
/// of 30 days, `y` year of 365 days.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let normalized = input.trim().to_lowercase();
    let invalid = || StatusError::InvalidDuration(input.to_string());

    if let Some(caps) = calendar_re().captures(&normalized) {
        let value: i64 = caps[1].parse().map_err(|_| invalid())?;
        let unit_secs: i64 = match &caps[2] {
            "d" => 24 * 60 * 60,
            "w" => 7 * 24 * 60 * 60,
            "m" => 30 * 24 * 60 * 60,
            "y" => 365 * 24 * 60 * 60,
            _ => return Err(invalid()),
        };
        let secs = value
            .checked_mul(unit_secs)
            .filter(|secs| *secs <= MAX_SNOOZE_SECS)
            .ok_or_else(invalid)?;
        return Ok(Duration::seconds(secs));
    }

    if clock_re().is_match(&normalized) {
        let mut total_secs = 0f64;
        for caps in clock_part_re().captures_iter(&normalized) {
            let value: f64 = caps[1].parse().map_err(|_| invalid())?;
            let unit_secs = match &caps[2] {
                "h" => 3600.0,
                "min" => 60.0,
                "s" => 1.0,
                "ms" => 1e-3,
                "us" | "µs" => 1e-6,
                "ns" => 1e-9,
                _ => return Err(invalid()),
            };
            total_secs += value * unit_secs;
        }
        if !total_secs.is_finite() || total_secs > MAX_SNOOZE_SECS as f64 {
            return Err(invalid());
        }
        return Ok(Duration::milliseconds((total_secs * 1000.0).round() as i64));
    }

    Err(invalid())
}

pub fn format_timestamp(at: DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Reads a snooze deadline, either RFC 3339 or [`TIMESTAMP_FORMAT`] in local time.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Local>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Local));
    }
    let naive = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map_err(|_| StatusError::InvalidTimestamp(raw.to_string()))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| StatusError::InvalidTimestamp(raw.to_string()))
}

/// A deadline silences its finding only while it lies strictly after `now`.
pub fn is_snoozed(until: DateTime<Local>, now: DateTime<Local>) -> bool {
    now < until
}

fn snooze_active(entry: &RepoEntry, kind: SnoozeKind, now: DateTime<Local>) -> bool {
    let Some(raw) = entry.snooze.get(kind) else {
        return false;
    };
    match parse_timestamp(raw) {
        Ok(until) => is_snoozed(until, now),
        Err(e) => {
            warn!(path = %entry.path, %kind, "error parsing snooze time: {e}");
            false
        }
    }
}

/// Silences the findings of `status` that have an active snooze in `config`.
///
/// Entries are matched by resolving their path against `scan_root`. Findings
/// that are already good are left alone.
pub fn apply(
    path: &Path,
    mut status: ProjectStatus,
    config: &SnoozeConfig,
    scan_root: &Path,
    now: DateTime<Local>,
) -> ProjectStatus {
    for entry in config.entries_for(path, scan_root) {
        if status.is_dirty && snooze_active(entry, SnoozeKind::DirtyWorkdir, now) {
            status.is_dirty = false;
            status.is_dirty_snoozed = true;
            status.status_string = None;
        }
        if status.has_stash && snooze_active(entry, SnoozeKind::Stashes, now) {
            status.has_stash = false;
            status.has_stash_snoozed = true;
        }
        if !status.upstreamed && snooze_active(entry, SnoozeKind::NotUpstreamed, now) {
            status.upstreamed = true;
            status.upstreamed_snoozed = true;
        }
    }
    status
}

/// Records a snooze of `check` for `project` lasting `duration` from `now`.
///
/// Returns the deadline that was written.
pub fn snooze_project(
    config: &mut SnoozeConfig,
    project: &Path,
    scan_root: &Path,
    duration: &str,
    check: &str,
    now: DateTime<Local>,
) -> Result<DateTime<Local>> {
    let check: Check = check.parse()?;
    let duration = parse_duration(duration)?;
    let until = now
        .checked_add_signed(duration)
        .ok_or_else(|| StatusError::InvalidDuration(duration.to_string()))?;

    let stamp = format_timestamp(until);
    let entry = config.entry_mut(project, scan_root);
    for kind in check.kinds() {
        entry.snooze.set(*kind, stamp.clone());
    }
    Ok(until)
}

/// Loads the store of `scan_root`, records the snooze and writes it back.
///
/// A malformed store is left untouched and reported instead of being replaced.
pub fn snooze(
    scan_root: &Path,
    project: &Path,
    duration: &str,
    check: &str,
) -> Result<DateTime<Local>> {
    let mut config = SnoozeConfig::load(scan_root)?;
    let until = snooze_project(&mut config, project, scan_root, duration, check, Local::now())?;
    config.save(scan_root)?;
    Ok(until)
}
