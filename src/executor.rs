//! Rule execution: moving a matched file into its rule's destination.
//!
//! Execution is a chain of gates. The destination must be an existing
//! directory and must not already contain an entry with the file's name;
//! failing either gate skips the file. Only the move itself can fail fatally.

use crate::config::Rule;
use crate::filesystem::FileSystem;
use crate::output::Console;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Why a file was left where it is. Affects only that file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Skip {
    /// The rule's destination is missing or not a directory.
    #[error("Invalid directory {}", .0.display())]
    InvalidDirectory(PathBuf),

    /// Something already exists at the computed destination path.
    #[error("File already exists {}", .0.display())]
    AlreadyExists(PathBuf),

    /// The file path has no final component to carry over (e.g. `/`).
    #[error("Cannot determine file name of {}", .0.display())]
    NoFileName(PathBuf),
}

/// The move primitive failed. Stops the whole batch.
#[derive(Debug, Error)]
#[error("Failed to move {} to {}: {source}", .from.display(), .to.display())]
pub struct MoveError {
    pub from: PathBuf,
    pub to: PathBuf,
    pub source: std::io::Error,
}

/// Result of executing one rule against one file.
#[derive(Debug)]
pub enum Execution {
    /// The file now lives at `to`.
    Moved { from: PathBuf, to: PathBuf },
    /// Dry run: the file would have been moved to `to`.
    Planned { from: PathBuf, to: PathBuf },
    /// A per-file policy check failed; nothing was touched.
    Skipped(Skip),
    /// The move failed; remaining files must not be processed.
    Fatal(MoveError),
}

impl Execution {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Execution::Fatal(_))
    }
}

/// Computes where `file` would land under `rule`, without touching anything.
///
/// # Errors
///
/// Returns the `Skip` reason if the destination is not an existing directory,
/// the file has no name, or the target path is already taken.
pub fn plan(fs: &dyn FileSystem, file: &Path, rule: &Rule) -> Result<PathBuf, Skip> {
    let dir = &rule.destination;
    if !fs.exists(dir) || !fs.is_dir(dir) {
        return Err(Skip::InvalidDirectory(dir.clone()));
    }

    let name = file
        .file_name()
        .ok_or_else(|| Skip::NoFileName(file.to_path_buf()))?;
    let target = dir.join(name);

    if fs.exists(&target) {
        return Err(Skip::AlreadyExists(target));
    }

    Ok(target)
}

/// Carries out matched rules against a filesystem.
pub struct Executor<'a> {
    fs: &'a dyn FileSystem,
    dry_run: bool,
}

impl<'a> Executor<'a> {
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self { fs, dry_run: false }
    }

    /// Only print the planned moves.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Executes `rule` against `file`, reporting to `console`.
    ///
    /// The planned operation is printed on the normal stream before the move
    /// is attempted. Skips and move failures are printed on the diagnostic
    /// stream.
    pub fn execute(&self, file: &Path, rule: &Rule, console: &mut Console<'_>) -> Execution {
        let target = match plan(self.fs, file, rule) {
            Ok(target) => target,
            Err(skip) => {
                debug!(file = %file.display(), reason = %skip, "skipping file");
                console.error(&skip);
                return Execution::Skipped(skip);
            }
        };

        console.plain(format_args!(
            "mv -v \"{}\" \"{}\"",
            file.display(),
            target.display()
        ));

        if self.dry_run {
            return Execution::Planned {
                from: file.to_path_buf(),
                to: target,
            };
        }

        match self.fs.move_path(file, &target) {
            Ok(()) => {
                info!(from = %file.display(), to = %target.display(), "moved");
                Execution::Moved {
                    from: file.to_path_buf(),
                    to: target,
                }
            }
            Err(source) => {
                let error = MoveError {
                    from: file.to_path_buf(),
                    to: target,
                    source,
                };
                console.error(&error);
                Execution::Fatal(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::MemoryFs;
    use std::io;

    fn run(fs: &MemoryFs, file: &str, rule: &Rule, dry_run: bool) -> (Execution, String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let execution = {
            let mut console = Console::new(&mut out, &mut err);
            Executor::new(fs)
                .dry_run(dry_run)
                .execute(Path::new(file), rule, &mut console)
        };
        (
            execution,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn test_moves_into_destination() {
        let fs = MemoryFs::new();
        fs.add_file("Some Awesome Thing", "x");
        fs.add_dir("/dest");
        let rule = Rule::new("(?i)awesome.?thing", "/dest");

        let (execution, out, err) = run(&fs, "Some Awesome Thing", &rule, false);

        assert!(matches!(execution, Execution::Moved { ref to, .. } if to == Path::new("/dest/Some Awesome Thing")));
        assert_eq!(out, "mv -v \"Some Awesome Thing\" \"/dest/Some Awesome Thing\"\n");
        assert_eq!(err, "");
        assert!(!fs.exists(Path::new("Some Awesome Thing")));
        assert_eq!(fs.read("/dest/Some Awesome Thing"), Some(b"x".to_vec()));
    }

    #[test]
    fn test_uses_basename_of_nested_source() {
        let fs = MemoryFs::new();
        fs.add_file("/downloads/2024/report.pdf", "pdf");
        fs.add_dir("/docs");

        let (execution, _, _) = run(&fs, "/downloads/2024/report.pdf", &Rule::new("pdf", "/docs"), false);

        assert!(matches!(execution, Execution::Moved { .. }));
        assert!(fs.exists(Path::new("/docs/report.pdf")));
    }

    #[test]
    fn test_collision_is_skipped() {
        let fs = MemoryFs::new();
        fs.add_file("Some Awesome Thing", "new");
        fs.add_file("/dest/Some Awesome Thing", "old");

        let (execution, out, err) = run(&fs, "Some Awesome Thing", &Rule::new("Thing", "/dest"), false);

        assert!(matches!(
            execution,
            Execution::Skipped(Skip::AlreadyExists(ref p)) if p == Path::new("/dest/Some Awesome Thing")
        ));
        assert_eq!(out, "");
        assert_eq!(err, "Error: File already exists /dest/Some Awesome Thing\n");
        assert_eq!(fs.read("/dest/Some Awesome Thing"), Some(b"old".to_vec()));
        assert!(fs.moves().is_empty());
    }

    #[test]
    fn test_missing_destination_is_invalid_directory() {
        let fs = MemoryFs::new();
        fs.add_file("a.txt", "a");

        let (execution, out, err) = run(&fs, "a.txt", &Rule::new("a", "/nope"), false);

        assert!(matches!(execution, Execution::Skipped(Skip::InvalidDirectory(_))));
        assert_eq!(out, "");
        assert_eq!(err, "Error: Invalid directory /nope\n");
        assert!(fs.moves().is_empty());
    }

    #[test]
    fn test_destination_that_is_a_file_is_invalid_directory() {
        let fs = MemoryFs::new();
        fs.add_file("a.txt", "a");
        fs.add_file("/target", "i am a file");

        let (execution, _, err) = run(&fs, "a.txt", &Rule::new("a", "/target"), false);

        assert_eq!(err, "Error: Invalid directory /target\n");
        assert!(!execution.is_fatal());
    }

    #[test]
    fn test_empty_destination_is_invalid_directory() {
        let fs = MemoryFs::new();
        fs.add_file("a.txt", "a");

        let (execution, _, err) = run(&fs, "a.txt", &Rule::new("a", ""), false);

        assert!(matches!(execution, Execution::Skipped(Skip::InvalidDirectory(_))));
        assert_eq!(err, "Error: Invalid directory \n");
    }

    #[test]
    fn test_move_failure_is_fatal() {
        let fs = MemoryFs::new();
        fs.add_file("a.txt", "a");
        fs.add_dir("/dest");
        fs.fail_moves_with(io::ErrorKind::PermissionDenied);

        let (execution, out, err) = run(&fs, "a.txt", &Rule::new("a", "/dest"), false);

        assert!(execution.is_fatal());
        assert_eq!(out, "mv -v \"a.txt\" \"/dest/a.txt\"\n");
        assert!(err.starts_with("Error: Failed to move a.txt to /dest/a.txt: "));
        assert!(fs.exists(Path::new("a.txt")));
    }

    #[test]
    fn test_dry_run_plans_without_moving() {
        let fs = MemoryFs::new();
        fs.add_file("a.txt", "a");
        fs.add_dir("/dest");

        let (execution, out, _) = run(&fs, "a.txt", &Rule::new("a", "/dest"), true);

        assert!(matches!(execution, Execution::Planned { .. }));
        assert_eq!(out, "mv -v \"a.txt\" \"/dest/a.txt\"\n");
        assert!(fs.exists(Path::new("a.txt")));
        assert!(fs.moves().is_empty());
    }

    #[test]
    fn test_plan_rejects_nameless_path() {
        let fs = MemoryFs::new();
        fs.add_dir("/dest");

        let result = plan(&fs, Path::new("/"), &Rule::new("x", "/dest"));
        assert_eq!(result, Err(Skip::NoFileName(PathBuf::from("/"))));
    }
}
