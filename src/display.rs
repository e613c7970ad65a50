use std::io::IsTerminal;

use crate::repo_status::ProjectStatus;

#[derive(Debug, PartialEq, Eq)]
pub struct Symbols {
    pub dirty: &'static str,
    pub stash: &'static str,
    pub not_upstreamed: &'static str,
}

const SYMBOLS_FANCY: Symbols = Symbols {
    dirty: "🚧",
    stash: "🗄️",
    not_upstreamed: "📤",
};
const SYMBOLS_PLAIN: Symbols = Symbols {
    dirty: "[D]",
    stash: "[S]",
    not_upstreamed: "[U]",
};

/// Environment variables that force a symbol set, checked in order.
const OVERRIDES: [(&str, &Symbols); 2] = [
    ("GORI_PLAIN_TEXT", &SYMBOLS_PLAIN),
    ("GORI_FANCY", &SYMBOLS_FANCY),
];

/// Terminals known to mangle emoji.
const PLAIN_TERMS: [&str; 2] = ["dumb", "vt100"];

pub fn symbols() -> &'static Symbols {
    let forced = OVERRIDES
        .iter()
        .find(|(var, _)| std::env::var_os(var).is_some())
        .map(|(_, symbols)| *symbols);
    if let Some(symbols) = forced {
        return symbols;
    }

    if wants_plain_output() {
        &SYMBOLS_PLAIN
    } else {
        &SYMBOLS_FANCY
    }
}

fn wants_plain_output() -> bool {
    if !std::io::stdout().is_terminal() || std::env::var_os("NO_COLOR").is_some() {
        return true;
    }
    std::env::var("TERM")
        .map(|term| {
            let term = term.to_lowercase();
            PLAIN_TERMS.contains(&term.as_str()) || term.contains("linux")
        })
        .unwrap_or(false)
}

pub fn legend(symbols: &Symbols) -> String {
    format!(
        "Legend:\n  {}: Dirty working directory\n  {}: Stashed changes\n  {}: Not upstreamed\n",
        symbols.dirty, symbols.stash, symbols.not_upstreamed
    )
}

/// `name: markers` for a project, or `None` if nothing is left to report.
///
/// Not-upstreamed is only flagged for clean trees; uncommitted work already
/// explains why a branch is not on origin.
pub fn status_line(project: &ProjectStatus, symbols: &Symbols) -> Option<String> {
    let mut markers = String::new();
    if project.is_dirty {
        markers.push_str(symbols.dirty);
    }
    if project.has_stash {
        markers.push_str(symbols.stash);
    }
    if !project.is_dirty && !project.upstreamed {
        markers.push_str(symbols.not_upstreamed);
    }

    if markers.is_empty() {
        None
    } else {
        Some(format!("{}: {markers}", project.display_name()))
    }
}
