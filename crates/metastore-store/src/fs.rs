//! Filesystem adapter consumed by the store engine.
//!
//! The engine never touches `std::fs` directly: every existence check,
//! listing, read, write and delete goes through a [`FileSystem`], so the
//! engine can be bound to another platform or to a fault-injecting fake.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A file found by [`FileSystem::list_files`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name: String,
    pub modified: SystemTime,
}

/// Primitive filesystem operations used by the store engine.
///
/// Listings skip hidden entries (names starting with `.`) and are sorted
/// by name.
pub trait FileSystem: Send + Sync + fmt::Debug {
    fn path_exists(&self, path: &Path) -> bool;

    /// Create a directory and any missing parents.
    fn create_dir(&self, path: &Path) -> io::Result<()>;

    /// Delete a file or an empty directory. Returns `Ok(false)` if nothing
    /// was there.
    fn delete(&self, path: &Path) -> io::Result<bool>;

    /// Names of the non-hidden directories directly under `path`.
    fn list_folders(&self, path: &Path) -> io::Result<Vec<String>>;

    /// Non-hidden files directly under `path`.
    ///
    /// Files whose path appears in `known_unchanged` with the same
    /// modification time as on disk are left out.
    fn list_files(
        &self,
        path: &Path,
        known_unchanged: Option<&HashMap<PathBuf, SystemTime>>,
    ) -> io::Result<Vec<FileEntry>>;

    fn last_modified(&self, path: &Path) -> io::Result<SystemTime>;

    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Create or overwrite a file.
    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;

    /// Atomically create an empty file, failing with
    /// [`io::ErrorKind::AlreadyExists`] if it is already present.
    fn create_new(&self, path: &Path) -> io::Result<()>;

    /// Whether new entries can be created inside the directory `path`.
    fn is_writable(&self, path: &Path) -> bool;
}

/// [`FileSystem`] bound to the local disk through `std::fs`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFileSystem;

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

impl FileSystem for LocalFileSystem {
    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn delete(&self, path: &Path) -> io::Result<bool> {
        let result = match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => fs::remove_dir(path),
            Ok(_) => fs::remove_file(path),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn list_folders(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_hidden(&name) || !entry.file_type()?.is_dir() {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    fn list_files(
        &self,
        path: &Path,
        known_unchanged: Option<&HashMap<PathBuf, SystemTime>>,
    ) -> io::Result<Vec<FileEntry>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_hidden(&name) {
                continue;
            }
            let meta = entry.metadata()?;
            if !meta.is_file() {
                continue;
            }
            let path = entry.path();
            let modified = meta.modified()?;
            if known_unchanged.and_then(|known| known.get(&path)) == Some(&modified) {
                continue;
            }
            files.push(FileEntry {
                path,
                name,
                modified,
            });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    fn last_modified(&self, path: &Path) -> io::Result<SystemTime> {
        fs::metadata(path)?.modified()
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn create_new(&self, path: &Path) -> io::Result<()> {
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map(|_| ())
    }

    fn is_writable(&self, path: &Path) -> bool {
        fs::metadata(path)
            .map(|meta| meta.is_dir() && !meta.permissions().readonly())
            .unwrap_or(false)
    }
}
