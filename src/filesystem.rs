//! Filesystem capabilities consumed by the rule engine.
//!
//! Everything that touches storage goes through the [`FileSystem`] trait so
//! the matcher, executor and orchestrator can run against [`OsFs`] in
//! production and [`MemoryFs`] in tests.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// The storage operations the engine needs, and nothing more.
pub trait FileSystem {
    /// Returns true if anything (file or directory) exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Returns true if `path` exists and is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Opens `path` for reading.
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + '_>>;

    /// Moves the file or directory at `from` to `to`.
    ///
    /// `to` is the full destination path, not the directory it lands in.
    fn move_path(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// The local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl FileSystem for OsFs {
    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(fs::File::open(path)?))
    }

    fn move_path(&self, from: &Path, to: &Path) -> io::Result<()> {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                debug!(from = %from.display(), to = %to.display(), "rename crosses devices, copying");
                copy_then_remove(from, to)
            }
            Err(e) => Err(e),
        }
    }
}

/// Copies `from` to `to` (recursively for directories), then deletes `from`.
///
/// Symlinks are recreated as links rather than followed. The source is only
/// removed once the whole copy succeeded.
fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(from)?;
    if metadata.file_type().is_symlink() {
        copy_symlink(from, to)?;
        return fs::remove_file(from);
    }
    if !metadata.is_dir() {
        fs::copy(from, to)?;
        return fs::remove_file(from);
    }

    for entry in WalkDir::new(from) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(io::Error::other)?;
        let target = to.join(relative);
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }

    fs::remove_dir_all(from)
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(link)?, target)
}

#[cfg(windows)]
fn copy_symlink(link: &Path, target: &Path) -> io::Result<()> {
    let points_to = fs::read_link(link)?;
    let resolved = link.parent().map_or_else(|| points_to.clone(), |p| p.join(&points_to));
    if resolved.is_dir() {
        std::os::windows::fs::symlink_dir(points_to, target)
    } else {
        std::os::windows::fs::symlink_file(points_to, target)
    }
}

#[cfg(not(any(unix, windows)))]
fn copy_symlink(link: &Path, target: &Path) -> io::Result<()> {
    fs::copy(link, target).map(|_| ())
}

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Dir,
}

/// An in-memory filesystem.
///
/// Paths are stored exactly as given; parents are created implicitly by
/// [`MemoryFs::add_file`] and [`MemoryFs::add_dir`]. Every successful move is
/// recorded so callers can assert on what was (or was not) relocated.
#[derive(Debug, Default)]
pub struct MemoryFs {
    nodes: RefCell<BTreeMap<PathBuf, Node>>,
    moves: RefCell<Vec<(PathBuf, PathBuf)>>,
    move_failure: Cell<Option<io::ErrorKind>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory and all of its ancestors.
    pub fn add_dir(&self, path: impl AsRef<Path>) -> &Self {
        let path = path.as_ref();
        let mut nodes = self.nodes.borrow_mut();
        for dir in path.ancestors().filter(|p| !p.as_os_str().is_empty()) {
            nodes.insert(dir.to_path_buf(), Node::Dir);
        }
        self
    }

    /// Adds a file with the given contents, creating its parent directories.
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> &Self {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.add_dir(parent);
        }
        self.nodes
            .borrow_mut()
            .insert(path.to_path_buf(), Node::File(contents.into()));
        self
    }

    /// Makes every subsequent move fail with `kind`.
    pub fn fail_moves_with(&self, kind: io::ErrorKind) {
        self.move_failure.set(Some(kind));
    }

    /// Returns the contents of the file at `path`, if it is a file.
    pub fn read(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.nodes.borrow().get(path.as_ref()) {
            Some(Node::File(contents)) => Some(contents.clone()),
            _ => None,
        }
    }

    /// Every successful move so far, in order.
    pub fn moves(&self) -> Vec<(PathBuf, PathBuf)> {
        self.moves.borrow().clone()
    }
}

impl FileSystem for MemoryFs {
    fn exists(&self, path: &Path) -> bool {
        self.nodes.borrow().contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.nodes.borrow().get(path), Some(Node::Dir))
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
        match self.nodes.borrow().get(path) {
            Some(Node::File(contents)) => Ok(Box::new(Cursor::new(contents.clone()))),
            Some(Node::Dir) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{} is a directory", path.display()),
            )),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: no such file or directory", path.display()),
            )),
        }
    }

    fn move_path(&self, from: &Path, to: &Path) -> io::Result<()> {
        if let Some(kind) = self.move_failure.get() {
            return Err(io::Error::from(kind));
        }
        if !self.exists(from) {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        if to.starts_with(from) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot move a path into itself",
            ));
        }
        if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty())
            && !self.is_dir(parent)
        {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }

        let mut nodes = self.nodes.borrow_mut();
        let moved: Vec<PathBuf> = nodes
            .keys()
            .filter(|key| key.starts_with(from))
            .cloned()
            .collect();

        for key in moved {
            if let Some(node) = nodes.remove(&key) {
                let target = match key.strip_prefix(from) {
                    Ok(rest) if !rest.as_os_str().is_empty() => to.join(rest),
                    _ => to.to_path_buf(),
                };
                nodes.insert(target, node);
            }
        }
        drop(nodes);

        self.moves
            .borrow_mut()
            .push((from.to_path_buf(), to.to_path_buf()));
        Ok(())
    }
}
