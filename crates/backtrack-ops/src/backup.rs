//! Backup store for pre-mutation snapshots.
//!
//! Snapshots live in a per-session directory under the backup root, one
//! entry per snapshot, named `<timestamp>-<seq>-<sanitized path>`. The store
//! never prunes on its own; the engine discards snapshots once no command on
//! either stack refers to them.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Local;
use tracing::debug;

use backtrack_core::{BackupError, BackupRef, FsError};

use crate::fs::{Filesystem, RemoveOptions};

/// Longest sanitized path fragment kept in a snapshot name.
const MAX_NAME_FRAGMENT: usize = 80;

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Point-in-time snapshots of files and directories.
#[derive(Debug)]
pub struct BackupStore {
    root: PathBuf,
    session_dir: PathBuf,
    next_id: u64,
    live: HashSet<u64>,
}

impl BackupStore {
    /// Create a store that keeps its snapshots under `root`.
    ///
    /// Nothing is created on disk until the first snapshot is taken.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let session = format!(
            "session-{}-{}-{}",
            Local::now().format("%Y%m%dT%H%M%S"),
            std::process::id(),
            SESSION_COUNTER.fetch_add(1, Ordering::Relaxed)
        );

        Self {
            session_dir: root.join(session),
            root,
            next_id: 0,
            live: HashSet::new(),
        }
    }

    /// The backup root shared by all sessions.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The directory this store writes into.
    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    /// Number of snapshots currently held.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Check if the store holds no snapshots.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Copy `path` into the store.
    pub fn snapshot(
        &mut self,
        fs: &dyn Filesystem,
        path: &Path,
    ) -> Result<BackupRef, BackupError> {
        let meta = fs.stat(path).map_err(|source| BackupError::Snapshot {
            path: path.to_path_buf(),
            source,
        })?;

        fs.create_dir_all(&self.session_dir)
            .map_err(|source| BackupError::Store {
                root: self.session_dir.clone(),
                source,
            })?;

        let id = self.next_id;
        self.next_id += 1;

        let created = Local::now();
        let name = format!(
            "{}-{:04}-{}",
            created.format("%Y%m%dT%H%M%S%.3f"),
            id,
            sanitize_path(path)
        );
        let location = self.session_dir.join(name);

        let size = match fs.copy_recursive(path, &location) {
            Ok(size) => size,
            Err(source) => {
                let _ = fs.remove(&location, RemoveOptions::recursive_if_exists());
                return Err(BackupError::Snapshot {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        debug!(id, path = %path.display(), location = %location.display(), size, "snapshot taken");
        self.live.insert(id);

        Ok(BackupRef {
            id,
            location,
            original: path.to_path_buf(),
            kind: meta.kind,
            size,
            created,
        })
    }

    /// Copy a snapshot back to `destination`.
    ///
    /// The destination must be free. The snapshot is kept.
    pub fn restore(
        &self,
        fs: &dyn Filesystem,
        backup: &BackupRef,
        destination: &Path,
    ) -> Result<(), BackupError> {
        if !self.contains(fs, backup) {
            return Err(BackupError::Missing {
                backup: backup.location.clone(),
            });
        }

        if let Err(source) = fs.copy_recursive(&backup.location, destination) {
            if !matches!(source, FsError::AlreadyExists { .. }) {
                let _ = fs.remove(destination, RemoveOptions::recursive_if_exists());
            }
            return Err(BackupError::Restore {
                destination: destination.to_path_buf(),
                source,
            });
        }

        debug!(id = backup.id, destination = %destination.display(), "snapshot restored");
        Ok(())
    }

    /// Whether the snapshot is still present on disk.
    pub fn contains(&self, fs: &dyn Filesystem, backup: &BackupRef) -> bool {
        fs.exists(&backup.location)
    }

    /// Delete one snapshot.
    pub fn discard(&mut self, fs: &dyn Filesystem, backup: &BackupRef) -> Result<(), BackupError> {
        self.live.remove(&backup.id);
        fs.remove(&backup.location, RemoveOptions::recursive_if_exists())
            .map_err(|source| BackupError::Store {
                root: backup.location.clone(),
                source,
            })?;
        debug!(id = backup.id, "snapshot discarded");
        Ok(())
    }

    /// Delete every snapshot of this session.
    pub fn purge(&mut self, fs: &dyn Filesystem) -> Result<(), BackupError> {
        self.live.clear();
        fs.remove(&self.session_dir, RemoveOptions::recursive_if_exists())
            .map_err(|source| BackupError::Store {
                root: self.session_dir.clone(),
                source,
            })
    }
}

/// Turn a path into a single filename-safe fragment.
fn sanitize_path(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('_');

    let count = cleaned.chars().count();
    let fragment: String = if count > MAX_NAME_FRAGMENT {
        cleaned.chars().skip(count - MAX_NAME_FRAGMENT).collect()
    } else {
        cleaned.to_string()
    };

    if fragment.is_empty() || fragment.chars().all(|c| c == '.') {
        "root".to_string()
    } else {
        fragment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalFs;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(sanitize_path(Path::new("/tmp/x/file.txt")), "tmp_x_file.txt");
        assert_eq!(sanitize_path(Path::new("/")), "root");
        assert_eq!(sanitize_path(Path::new("/a b/c:d")), "a_b_c_d");

        let long = format!("/{}", "a".repeat(200));
        assert_eq!(sanitize_path(Path::new(&long)).len(), MAX_NAME_FRAGMENT);
    }

    #[test]
    fn test_snapshot_and_restore_file() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFs::new();
        let mut store = BackupStore::new(dir.path().join("backups"));
        let file = dir.path().join("file.txt");
        fs.write_file(&file, b"hello").unwrap();

        let backup = store.snapshot(&fs, &file).unwrap();
        assert_eq!(backup.original, file);
        assert_eq!(backup.size, 5);
        assert!(backup.location.starts_with(store.session_dir()));
        assert_eq!(store.len(), 1);

        fs.remove(&file, RemoveOptions::default()).unwrap();
        store.restore(&fs, &backup, &file).unwrap();
        assert_eq!(fs.read_file(&file).unwrap(), b"hello");

        // The snapshot survives a restore.
        assert!(store.contains(&fs, &backup));
    }

    #[test]
    fn test_repeated_snapshots_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFs::new();
        let mut store = BackupStore::new(dir.path().join("backups"));
        let file = dir.path().join("file.txt");
        fs.write_file(&file, b"one").unwrap();

        let first = store.snapshot(&fs, &file).unwrap();
        fs.write_file(&file, b"two").unwrap();
        let second = store.snapshot(&fs, &file).unwrap();

        assert_ne!(first.location, second.location);
        assert_eq!(fs.read_file(&first.location).unwrap(), b"one");
        assert_eq!(fs.read_file(&second.location).unwrap(), b"two");
    }

    #[test]
    fn test_snapshot_directory() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFs::new();
        let mut store = BackupStore::new(dir.path().join("backups"));
        let folder = dir.path().join("folder");
        fs.create_dir_all(&folder.join("inner")).unwrap();
        fs.write_file(&folder.join("inner").join("a.txt"), b"a").unwrap();

        let backup = store.snapshot(&fs, &folder).unwrap();
        assert!(backup.kind.is_dir());

        fs.remove(&folder, RemoveOptions::recursive()).unwrap();
        store.restore(&fs, &backup, &folder).unwrap();
        assert_eq!(fs.read_file(&folder.join("inner").join("a.txt")).unwrap(), b"a");
    }

    #[test]
    fn test_snapshot_missing_source() {
        let dir = TempDir::new().unwrap();
        let mut store = BackupStore::new(dir.path().join("backups"));
        let err = store
            .snapshot(&LocalFs, &dir.path().join("missing"))
            .unwrap_err();
        assert!(matches!(err, BackupError::Snapshot { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn test_restore_missing_backup() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFs::new();
        let mut store = BackupStore::new(dir.path().join("backups"));
        let file = dir.path().join("file.txt");
        fs.write_file(&file, b"hello").unwrap();

        let backup = store.snapshot(&fs, &file).unwrap();
        fs.remove(&backup.location, RemoveOptions::recursive()).unwrap();

        let err = store
            .restore(&fs, &backup, &dir.path().join("elsewhere.txt"))
            .unwrap_err();
        assert!(matches!(err, BackupError::Missing { .. }));
        assert!(err.to_string().contains("Cannot undo: backup missing"));
    }

    #[test]
    fn test_restore_refuses_occupied_destination() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFs::new();
        let mut store = BackupStore::new(dir.path().join("backups"));
        let file = dir.path().join("file.txt");
        fs.write_file(&file, b"hello").unwrap();

        let backup = store.snapshot(&fs, &file).unwrap();
        fs.write_file(&file, b"changed").unwrap();

        let err = store.restore(&fs, &backup, &file).unwrap_err();
        assert!(matches!(err, BackupError::Restore { .. }));
        assert_eq!(fs.read_file(&file).unwrap(), b"changed");
    }

    #[test]
    fn test_discard_and_purge() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFs::new();
        let mut store = BackupStore::new(dir.path().join("backups"));
        let file = dir.path().join("file.txt");
        fs.write_file(&file, b"hello").unwrap();

        let first = store.snapshot(&fs, &file).unwrap();
        let second = store.snapshot(&fs, &file).unwrap();

        store.discard(&fs, &first).unwrap();
        assert!(!store.contains(&fs, &first));
        assert!(store.contains(&fs, &second));
        assert_eq!(store.len(), 1);

        store.purge(&fs).unwrap();
        assert!(!fs.exists(store.session_dir()));
        assert!(store.is_empty());
        assert!(fs.exists(store.root()));
    }

    #[test]
    fn test_sessions_are_distinct() {
        let dir = TempDir::new().unwrap();
        let a = BackupStore::new(dir.path());
        let b = BackupStore::new(dir.path());
        assert_ne!(a.session_dir(), b.session_dir());
    }
}
