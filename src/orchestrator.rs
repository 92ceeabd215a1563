//! The per-invocation batch loop.
//!
//! A run first checks that every input exists; one missing input ends the
//! run before anything is touched. Files are then handled strictly in input
//! order: match, execute, and stop at the first failed move. Moves already
//! made are not rolled back.

use crate::config::RuleSet;
use crate::executor::{Execution, Executor};
use crate::filesystem::FileSystem;
use crate::matcher::{MatchResult, match_rule};
use crate::output::Console;
use std::path::{Path, PathBuf};
use tracing::debug;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Every file was handled.
    Completed,
    /// These inputs did not exist; nothing was processed.
    MissingFiles(Vec<PathBuf>),
    /// Moving this file failed; later files were not processed.
    Aborted(PathBuf),
}

/// Summary of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub status: RunStatus,
    pub moved: usize,
    pub planned: usize,
    pub skipped: usize,
    pub unmatched: usize,
}

impl RunReport {
    fn new() -> Self {
        Self {
            status: RunStatus::Completed,
            moved: 0,
            planned: 0,
            skipped: 0,
            unmatched: 0,
        }
    }

    fn missing(files: Vec<PathBuf>) -> Self {
        Self {
            status: RunStatus::MissingFiles(files),
            ..Self::new()
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

/// Returns the inputs that do not exist, in input order.
pub fn missing_files<P: AsRef<Path>>(fs: &dyn FileSystem, files: &[P]) -> Vec<PathBuf> {
    let mut missing = Vec::new();
    for file in files {
        let file: &Path = file.as_ref();
        if !fs.exists(file) {
            missing.push(file.to_path_buf());
        }
    }
    missing
}

/// Reports every missing input as `File not found`.
///
/// # Errors
///
/// Returns the missing inputs if there are any.
pub fn preflight<P: AsRef<Path>>(
    fs: &dyn FileSystem,
    files: &[P],
    console: &mut Console<'_>,
) -> Result<(), Vec<PathBuf>> {
    let missing = missing_files(fs, files);
    if missing.is_empty() {
        return Ok(());
    }
    for file in &missing {
        console.error(format_args!("File not found: {}", file.display()));
    }
    Err(missing)
}

/// Drives matching and execution over a list of files.
pub struct Orchestrator<'a> {
    fs: &'a dyn FileSystem,
    rules: RuleSet,
    dry_run: bool,
}

impl<'a> Orchestrator<'a> {
    pub fn new(fs: &'a dyn FileSystem, rules: RuleSet) -> Self {
        Self {
            fs,
            rules,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Checks that every input exists, then processes them.
    pub fn run<P: AsRef<Path>>(&self, files: &[P], console: &mut Console<'_>) -> RunReport {
        match preflight(self.fs, files, console) {
            Ok(()) => self.process(files, console),
            Err(missing) => RunReport::missing(missing),
        }
    }

    /// Processes inputs in order without the existence check.
    pub fn process<P: AsRef<Path>>(&self, files: &[P], console: &mut Console<'_>) -> RunReport {
        let executor = Executor::new(self.fs).dry_run(self.dry_run);
        let mut report = RunReport::new();

        for file in files {
            let file: &Path = file.as_ref();
            let matched = match_rule(file, &self.rules, |_, e| console.error(e));

            let rule = match matched {
                MatchResult::Matched { rule, .. } => rule,
                MatchResult::NoMatch => {
                    console.plain(format_args!("No rule for {}", file.display()));
                    report.unmatched += 1;
                    continue;
                }
            };

            match executor.execute(file, rule, console) {
                Execution::Moved { .. } => report.moved += 1,
                Execution::Planned { .. } => report.planned += 1,
                Execution::Skipped(_) => report.skipped += 1,
                Execution::Fatal(_) => {
                    console.notice("Aborting...");
                    report.status = RunStatus::Aborted(file.to_path_buf());
                    break;
                }
            }
        }

        debug!(?report, "run finished");
        report
    }
}
