use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{crate_version, value_parser, Arg, ArgAction, ArgMatches, Command};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gori::config::SnoozeConfig;
use gori::display;
use gori::evaluator::GitEvaluator;
use gori::scan::{self, Scan, ScanOptions, MAX_CONCURRENCY};
use gori::snooze;
use gori::visit;

fn cli() -> Command {
    Command::new("gori")
        .about("Reports which project checkouts have uncommitted, stashed or unpushed work.")
        .version(crate_version!())
        .args_conflicts_with_subcommands(true)
        .arg(
            Arg::new("path")
                .help("Directory whose immediate subdirectories are scanned")
                .value_parser(value_parser!(PathBuf))
                .default_value("."),
        )
        .arg(
            Arg::new("stat")
                .short('s')
                .long("stat")
                .action(ArgAction::SetTrue)
                .help("stat the files if the work tree is not clean"),
        )
        .arg(
            Arg::new("concurrency")
                .short('c')
                .long("concurrency")
                .value_parser(value_parser!(usize))
                .help(format!(
                    "maximum number of concurrent git operations [default: $GORI_CONCURRENCY or {}]",
                    scan::DEFAULT_CONCURRENCY
                )),
        )
        .arg(
            Arg::new("no-visit")
                .long("no-visit")
                .action(ArgAction::SetTrue)
                .help("don't offer to visit the projects that need attention"),
        )
        .subcommand(
            Command::new("snooze")
                .about("Hide a finding for a project until the duration has passed")
                .arg(
                    Arg::new("project")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Project directory, relative to --root"),
                )
                .arg(
                    Arg::new("duration")
                        .required(true)
                        .help("How long, e.g. 1h, 30min, 2d, 3w, 4m, 5y"),
                )
                .arg(
                    Arg::new("check")
                        .default_value("all")
                        .value_parser(["dirty", "stash", "upstream", "all"]),
                )
                .arg(
                    Arg::new("root")
                        .long("root")
                        .value_parser(value_parser!(PathBuf))
                        .default_value(".")
                        .help("Scan root holding the snooze store"),
                ),
        )
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gori=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .without_time(),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("snooze", arg_matches)) => run_snooze(arg_matches),
        _ => run_scan(&matches).await,
    }
}

fn run_snooze(matches: &ArgMatches) -> Result<()> {
    let root = path_arg(matches, "root");
    let project = root.join(path_arg(matches, "project"));
    let duration = string_arg(matches, "duration");
    let check = string_arg(matches, "check");

    let until = snooze::snooze(&root, &project, duration, check)
        .with_context(|| format!("snoozing {}", project.display()))?;
    println!(
        "Snoozed {check} for {} until {}",
        project.display(),
        snooze::format_timestamp(until)
    );
    Ok(())
}

async fn run_scan(matches: &ArgMatches) -> Result<()> {
    let root = path_arg(matches, "path");
    let show_changes = matches.get_flag("stat");
    let concurrency = matches
        .get_one::<usize>("concurrency")
        .copied()
        .unwrap_or_else(scan::concurrency_from_env)
        .clamp(1, MAX_CONCURRENCY);

    let symbols = display::symbols();
    println!("{}", display::legend(symbols));

    let config = SnoozeConfig::load_or_warn(&root);
    let mut scan = Scan::start(
        &root,
        ScanOptions { concurrency },
        config,
        GitEvaluator::new(show_changes),
    )?;

    let mut flagged = Vec::new();
    while let Some(project) = scan.next().await {
        if let Some(line) = display::status_line(&project, symbols) {
            println!("{line}");
        }
        if let (true, Some(changes)) = (project.is_dirty, &project.status_string) {
            println!("{changes}");
        }
        flagged.push(project);
    }
    info!("{}", scan.summary());

    if flagged.is_empty() || matches.get_flag("no-visit") || !io::stdin().is_terminal() {
        return Ok(());
    }

    tokio::task::spawn_blocking(move || {
        let stdin = io::stdin();
        visit::visit_projects(&flagged, &root, stdin.lock(), io::stdout())
    })
    .await?
    .context("visiting projects")
}

fn path_arg(matches: &ArgMatches, name: &str) -> PathBuf {
    matches
        .get_one::<PathBuf>(name)
        .cloned()
        .unwrap_or_else(|| Path::new(".").to_path_buf())
}

fn string_arg<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .unwrap_or_default()
}
