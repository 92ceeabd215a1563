//! Command-line entry point.
//!
//! Handles usage output, argument parsing, locating the rule file, and
//! wiring the filesystem and console into the orchestrator.

use crate::config::{ConfigError, RuleSet};
use crate::filesystem::FileSystem;
use crate::orchestrator::{Orchestrator, RunReport, preflight};
use crate::output::Console;
use clap::Parser;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Printed verbatim when the program is started without arguments.
pub const USAGE: &str = "dtt.

Usage:
    dtt <file> [<file> ...]
    dtt [--dry-run] [--rules <path>] [--] <file> [<file> ...]

Put -- before file names that start with a dash.
";

/// Move files into directories chosen by an ordered list of regex rules.
#[derive(Debug, Parser)]
#[command(name = "dtt", version)]
pub struct Cli {
    /// Files or directories to move.
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Rule file to use instead of the one in the config directory.
    #[arg(long, value_name = "PATH")]
    pub rules: Option<PathBuf>,

    /// Print the moves that would be made without making them.
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

/// Returns the rule file to load: `explicit` when given, otherwise the
/// default location under the user's config directory.
///
/// # Errors
///
/// Returns `ConfigError::NoConfigDir` if no path was given and the config
/// directory cannot be determined.
pub fn rules_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => RuleSet::default_path(),
    }
}

/// Runs the program for `args` (including the program name).
///
/// Returns the run summary, or `None` when no run took place (usage shown,
/// help or version requested, or unparseable arguments).
///
/// # Examples
///
/// ```no_run
/// use dothething::cli::run;
/// use dothething::filesystem::OsFs;
/// use dothething::output::Console;
///
/// let mut console = Console::stdio();
/// run(["dtt", "invoice.pdf"], &OsFs, &mut console);
/// ```
pub fn run<I, T>(args: I, fs: &dyn FileSystem, console: &mut Console<'_>) -> Option<RunReport>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    if args.len() < 2 {
        console.raw_out(USAGE);
        return None;
    }

    let cli = match Cli::try_parse_from(&args) {
        Ok(cli) => cli,
        Err(e) => {
            let rendered = e.render().to_string();
            if e.use_stderr() {
                console.raw_err(&rendered);
            } else {
                console.raw_out(&rendered);
            }
            return None;
        }
    };
    debug!(?cli, "parsed arguments");

    if preflight(fs, &cli.files, console).is_err() {
        return None;
    }

    let rules = match rules_path(cli.rules.as_deref()) {
        Ok(path) => RuleSet::load_or_empty(fs, &path, |e| console.error(e)),
        Err(e) => {
            console.error(&e);
            RuleSet::default()
        }
    };

    let report = Orchestrator::new(fs, rules)
        .dry_run(cli.dry_run)
        .process(&cli.files, console);
    Some(report)
}
