//! Interactive walk over the projects a scan flagged.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process;

use git2::Repository;

use crate::evaluator::{status_summary, worktree_statuses};
use crate::repo_status::ProjectStatus;
use crate::snooze;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    Ignore { duration: String, check: String },
    Next,
    Shell,
    Quit,
}

impl Command {
    /// Parses one line of input. `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim().to_lowercase();
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            return Ok(None);
        };

        let command = match command {
            "s" => Command::Status,
            "i" => {
                let Some(duration) = parts.next() else {
                    return Err("Usage: i <duration> [check]".to_string());
                };
                Command::Ignore {
                    duration: duration.to_string(),
                    check: parts.next().unwrap_or("all").to_string(),
                }
            }
            "n" => Command::Next,
            "e" => Command::Shell,
            "q" => Command::Quit,
            _ => return Err("Invalid command.".to_string()),
        };
        Ok(Some(command))
    }
}

/// Prompts for each project in turn until the list is exhausted, the user
/// quits or input ends.
pub fn visit_projects<R: BufRead, W: Write>(
    projects: &[ProjectStatus],
    scan_root: &Path,
    mut input: R,
    mut out: W,
) -> io::Result<()> {
    for (i, project) in projects.iter().enumerate() {
        loop {
            write!(
                out,
                "\nProject {}/{}: {}\n\n(s)tatus, (i)gnore, (n)ext, (e)xecute shell, (q)uit: ",
                i + 1,
                projects.len(),
                project.display_name()
            )?;
            out.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                return Ok(());
            }

            let command = match Command::parse(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(message) => {
                    writeln!(out, "{message}")?;
                    continue;
                }
            };

            match command {
                Command::Status => writeln!(out, "\n{}", describe_worktree(&project.path))?,
                Command::Ignore { duration, check } => {
                    match snooze::snooze(scan_root, &project.path, &duration, &check) {
                        Ok(until) => writeln!(
                            out,
                            "Snoozed {check} until {}",
                            snooze::format_timestamp(until)
                        )?,
                        Err(e) => writeln!(out, "{e}")?,
                    }
                }
                Command::Next => break,
                Command::Shell => {
                    if let Err(e) = open_shell(&project.path) {
                        writeln!(out, "Error starting subshell: {e}")?;
                    }
                }
                Command::Quit => return Ok(()),
            }
        }
    }
    Ok(())
}

fn describe_worktree(path: &Path) -> String {
    let repo = match Repository::open(path) {
        Ok(repo) => repo,
        Err(e) => return format!("could not open repository: {e}"),
    };
    let described = match worktree_statuses(&repo) {
        Ok(statuses) if statuses.is_empty() => "working tree clean".to_string(),
        Ok(statuses) => status_summary(&statuses),
        Err(e) => format!("could not get repo status: {e}"),
    };
    described
}

fn open_shell(path: &Path) -> io::Result<()> {
    let shell = std::env::var("SHELL")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "/bin/bash".to_string());
    process::Command::new(shell).current_dir(path).status()?;
    Ok(())
}
