//! Filesystem adapter.
//!
//! Every mutation the engine performs goes through [`Filesystem`]. Calls do
//! exactly what they say: no retries and no implicit backups.

use std::fs;
use std::path::{Path, PathBuf};

use backtrack_core::{EntryMetadata, FsError};

/// Options for [`Filesystem::remove`].
#[derive(Debug, Copy, Clone, Default)]
pub struct RemoveOptions {
    /// Remove directories together with their contents.
    pub recursive: bool,
    /// Treat a missing path as success.
    pub ignore_if_not_exists: bool,
}

impl RemoveOptions {
    /// Recursive removal that fails on a missing path.
    pub fn recursive() -> Self {
        Self {
            recursive: true,
            ignore_if_not_exists: false,
        }
    }

    /// Recursive removal that tolerates a missing path.
    pub fn recursive_if_exists() -> Self {
        Self {
            recursive: true,
            ignore_if_not_exists: true,
        }
    }
}

/// Filesystem primitives consumed by the engine.
pub trait Filesystem: Send + Sync {
    /// Whether anything (including a dangling symlink) exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Metadata for `path`, without following symlinks.
    fn stat(&self, path: &Path) -> Result<EntryMetadata, FsError>;

    /// Resolve symlinks and relative components.
    fn canonicalize(&self, path: &Path) -> Result<PathBuf, FsError>;

    /// Read a whole file.
    fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError>;

    /// Write a whole file, creating or truncating it.
    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), FsError>;

    /// Create a new empty file. Fails if `path` exists.
    fn create_file(&self, path: &Path) -> Result<(), FsError>;

    /// Create a single directory. Fails if `path` exists.
    fn mkdir(&self, path: &Path) -> Result<(), FsError>;

    /// Create a directory and any missing parents.
    fn create_dir_all(&self, path: &Path) -> Result<(), FsError>;

    /// Rename `from` to `to`. Fails if `to` is occupied by a different item.
    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError>;

    /// Remove a file, symlink or directory.
    fn remove(&self, path: &Path, options: RemoveOptions) -> Result<(), FsError>;

    /// Copy `source` to `dest`, recursing into directories.
    ///
    /// Returns the number of bytes copied. Fails if `dest` exists.
    fn copy_recursive(&self, source: &Path, dest: &Path) -> Result<u64, FsError>;

    /// Whether `path` is a directory (symlinks are not followed).
    fn is_dir(&self, path: &Path) -> bool {
        self.stat(path).map(|m| m.is_dir()).unwrap_or(false)
    }
}

/// [`Filesystem`] backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl LocalFs {
    /// Create a new local filesystem adapter.
    pub fn new() -> Self {
        Self
    }
}

impl Filesystem for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn stat(&self, path: &Path) -> Result<EntryMetadata, FsError> {
        fs::symlink_metadata(path)
            .map(|meta| EntryMetadata::from(&meta))
            .map_err(|e| FsError::io(path, e))
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf, FsError> {
        fs::canonicalize(path).map_err(|e| FsError::io(path, e))
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        fs::read(path).map_err(|e| FsError::io(path, e))
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), FsError> {
        fs::write(path, contents).map_err(|e| FsError::io(path, e))
    }

    fn create_file(&self, path: &Path) -> Result<(), FsError> {
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map(drop)
            .map_err(|e| FsError::io(path, e))
    }

    fn mkdir(&self, path: &Path) -> Result<(), FsError> {
        fs::create_dir(path).map_err(|e| FsError::io(path, e))
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        fs::create_dir_all(path).map_err(|e| FsError::io(path, e))
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        if self.exists(to) && !same_entry(from, to) {
            return Err(FsError::AlreadyExists {
                path: to.to_path_buf(),
            });
        }
        fs::rename(from, to).map_err(|e| FsError::io(from, e))
    }

    fn remove(&self, path: &Path, options: RemoveOptions) -> Result<(), FsError> {
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && options.ignore_if_not_exists => {
                return Ok(());
            }
            Err(e) => return Err(FsError::io(path, e)),
        };

        let result = if meta.is_dir() {
            if options.recursive {
                fs::remove_dir_all(path)
            } else {
                fs::remove_dir(path)
            }
        } else {
            fs::remove_file(path)
        };

        result.map_err(|e| FsError::io(path, e))
    }

    fn copy_recursive(&self, source: &Path, dest: &Path) -> Result<u64, FsError> {
        if self.exists(dest) {
            return Err(FsError::AlreadyExists {
                path: dest.to_path_buf(),
            });
        }
        copy_entry(source, dest)
    }
}

/// Copy one entry, recursing into directories.
fn copy_entry(source: &Path, dest: &Path) -> Result<u64, FsError> {
    let meta = fs::symlink_metadata(source).map_err(|e| FsError::io(source, e))?;

    if meta.file_type().is_symlink() {
        copy_symlink(source, dest)?;
        Ok(0)
    } else if meta.is_dir() {
        copy_dir_recursive(source, dest)
    } else {
        fs::copy(source, dest).map_err(|e| FsError::io(dest, e))
    }
}

/// Recursively copy a directory.
fn copy_dir_recursive(source: &Path, dest: &Path) -> Result<u64, FsError> {
    fs::create_dir(dest).map_err(|e| FsError::io(dest, e))?;

    let mut total_bytes = 0u64;

    let entries = fs::read_dir(source).map_err(|e| FsError::io(source, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| FsError::io(source, e))?;
        total_bytes += copy_entry(&entry.path(), &dest.join(entry.file_name()))?;
    }

    Ok(total_bytes)
}

#[cfg(unix)]
fn copy_symlink(source: &Path, dest: &Path) -> Result<(), FsError> {
    let target = fs::read_link(source).map_err(|e| FsError::io(source, e))?;
    std::os::unix::fs::symlink(target, dest).map_err(|e| FsError::io(dest, e))
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, dest: &Path) -> Result<(), FsError> {
    fs::copy(source, dest)
        .map(drop)
        .map_err(|e| FsError::io(dest, e))
}

/// Whether two paths name the same filesystem object (e.g. a case-only
/// rename on a case-insensitive volume).
#[cfg(unix)]
fn same_entry(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (fs::symlink_metadata(a), fs::symlink_metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_entry(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_and_stat() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFs::new();
        let file = dir.path().join("a.txt");

        assert!(!fs.exists(&file));
        fs.create_file(&file).unwrap();
        assert!(fs.exists(&file));
        assert!(fs.stat(&file).unwrap().is_file());
        assert!(matches!(
            fs.create_file(&file),
            Err(FsError::AlreadyExists { .. })
        ));

        let sub = dir.path().join("sub");
        fs.mkdir(&sub).unwrap();
        assert!(fs.is_dir(&sub));
        assert!(matches!(fs.mkdir(&sub), Err(FsError::AlreadyExists { .. })));
    }

    #[test]
    fn test_stat_missing() {
        let dir = TempDir::new().unwrap();
        let err = LocalFs.stat(&dir.path().join("nope")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_rename_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFs::new();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs.write_file(&a, b"a").unwrap();
        fs.write_file(&b, b"b").unwrap();

        assert!(matches!(fs.rename(&a, &b), Err(FsError::AlreadyExists { .. })));
        assert_eq!(fs.read_file(&b).unwrap(), b"b");

        let c = dir.path().join("c.txt");
        fs.rename(&a, &c).unwrap();
        assert!(!fs.exists(&a));
        assert_eq!(fs.read_file(&c).unwrap(), b"a");
    }

    #[test]
    fn test_remove_options() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFs::new();
        let sub = dir.path().join("sub");
        fs.mkdir(&sub).unwrap();
        fs.write_file(&sub.join("f.txt"), b"x").unwrap();

        assert!(fs.remove(&sub, RemoveOptions::default()).is_err());
        fs.remove(&sub, RemoveOptions::recursive()).unwrap();
        assert!(!fs.exists(&sub));

        assert!(fs.remove(&sub, RemoveOptions::recursive()).is_err());
        fs.remove(&sub, RemoveOptions::recursive_if_exists()).unwrap();
    }

    #[test]
    fn test_copy_recursive() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFs::new();
        let src = dir.path().join("src");
        fs.create_dir_all(&src.join("nested")).unwrap();
        fs.write_file(&src.join("top.txt"), b"hello").unwrap();
        fs.write_file(&src.join("nested").join("deep.txt"), b"world!").unwrap();

        let dst = dir.path().join("dst");
        let bytes = fs.copy_recursive(&src, &dst).unwrap();
        assert_eq!(bytes, 11);
        assert_eq!(fs.read_file(&dst.join("top.txt")).unwrap(), b"hello");
        assert_eq!(
            fs.read_file(&dst.join("nested").join("deep.txt")).unwrap(),
            b"world!"
        );

        assert!(matches!(
            fs.copy_recursive(&src, &dst),
            Err(FsError::AlreadyExists { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_preserves_symlinks() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFs::new();
        let src = dir.path().join("src");
        fs.mkdir(&src).unwrap();
        std::os::unix::fs::symlink("missing-target", src.join("link")).unwrap();

        let dst = dir.path().join("dst");
        fs.copy_recursive(&src, &dst).unwrap();
        assert!(fs.stat(&dst.join("link")).unwrap().is_symlink());
        assert_eq!(
            std::fs::read_link(dst.join("link")).unwrap(),
            PathBuf::from("missing-target")
        );
    }
}
