//! Shared state and helpers for the command executors.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use backtrack_core::{BackupError, BackupRef, EntryKind, FsError, OpError, OpResult};

use crate::backup::BackupStore;
use crate::confirm::Confirm;
use crate::conflict::{Conflict, ReplacePolicy, auto_suffix_path, is_within, normalize_path};
use crate::fs::{Filesystem, RemoveOptions};

/// Everything an executor needs: filesystem, backups and the user.
pub struct ExecContext {
    pub(crate) fs: Box<dyn Filesystem>,
    pub(crate) backups: BackupStore,
    pub(crate) confirm: Box<dyn Confirm>,
}

impl ExecContext {
    pub(crate) fn new(
        fs: Box<dyn Filesystem>,
        backups: BackupStore,
        confirm: Box<dyn Confirm>,
    ) -> Self {
        Self {
            fs,
            backups,
            confirm,
        }
    }

    pub(crate) fn fs(&self) -> &dyn Filesystem {
        self.fs.as_ref()
    }

    /// Raise `conflict` according to `policy`.
    pub(crate) fn resolve(&mut self, policy: ReplacePolicy, conflict: Conflict) -> OpResult<()> {
        match policy {
            ReplacePolicy::Approved => Ok(()),
            ReplacePolicy::Forbid => Err(FsError::AlreadyExists {
                path: conflict.destination,
            }
            .into()),
            ReplacePolicy::Ask => {
                if self.confirm.confirm(&conflict) {
                    Ok(())
                } else {
                    Err(OpError::Cancelled)
                }
            }
        }
    }

    /// Refuse to remove, replace or relocate the backup store or a folder
    /// holding it. Snapshotting such a folder would copy it into itself.
    pub(crate) fn guard_backup_store(&self, path: &Path) -> OpResult<()> {
        let root = self.backups.root();
        let root = normalize_path(root).unwrap_or_else(|_| root.to_path_buf());

        let mut contains = is_within(&root, path);
        // A symlink is removed or copied as a link, never through its target.
        let is_link = self
            .fs
            .stat(path)
            .map(|meta| meta.kind == EntryKind::Symlink)
            .unwrap_or(false);
        if !contains && !is_link {
            if let (Ok(root), Ok(path)) = (self.fs.canonicalize(&root), self.fs.canonicalize(path)) {
                contains = is_within(&root, &path);
            }
        }

        if contains {
            return Err(OpError::ContainsBackupStore {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    /// Snapshot `path`, then remove it.
    pub(crate) fn back_up_and_remove(&mut self, path: &Path) -> OpResult<BackupRef> {
        let backup = self.backups.snapshot(self.fs.as_ref(), path)?;

        if let Err(e) = self.fs.remove(path, RemoveOptions::recursive()) {
            // A partial recursive removal leaves the snapshot as the only
            // copy of what was removed, so keep it.
            if self.fs.exists(path) && self.fs.is_dir(path) {
                warn!(
                    path = %path.display(),
                    backup = %backup.location.display(),
                    "removal failed part-way; backup kept"
                );
            } else {
                self.discard(&backup);
            }
            return Err(e.into());
        }

        Ok(backup)
    }

    /// Put `backup` back at `path`, discarding nothing.
    pub(crate) fn restore(&self, backup: &BackupRef, path: &Path) -> OpResult<()> {
        self.backups
            .restore(self.fs.as_ref(), backup, path)
            .map_err(OpError::from)
    }

    /// Fail early when a snapshot an inverse depends on has vanished.
    pub(crate) fn require_backup(&self, backup: &BackupRef) -> OpResult<()> {
        if self.backups.contains(self.fs.as_ref(), backup) {
            Ok(())
        } else {
            Err(BackupError::Missing {
                backup: backup.location.clone(),
            }
            .into())
        }
    }

    /// Best-effort undo of a `back_up_and_remove` after a later step failed.
    pub(crate) fn put_back(&mut self, backup: BackupRef, path: &Path) {
        match self.restore(&backup, path) {
            Ok(()) => self.discard(&backup),
            Err(e) => warn!(
                path = %path.display(),
                backup = %backup.location.display(),
                error = %e,
                "could not put replaced item back"
            ),
        }
    }

    /// Discard a snapshot, logging failures.
    pub(crate) fn discard(&mut self, backup: &BackupRef) {
        if let Err(e) = self.backups.discard(self.fs.as_ref(), backup) {
            warn!(id = backup.id, error = %e, "failed to discard backup");
        }
    }

    /// Replace whatever is at `path` with the contents of `backup`.
    ///
    /// The current item is renamed aside first and renamed back if the
    /// restore fails, so either the swap completes or nothing changes.
    pub(crate) fn swap_in_backup(&self, backup: &BackupRef, path: &Path) -> OpResult<()> {
        if !self.fs.exists(path) {
            return self.restore(backup, path);
        }

        let aside = self.aside_path(path);
        self.fs.rename(path, &aside)?;
        debug!(path = %path.display(), aside = %aside.display(), "set aside for restore");

        if let Err(e) = self.restore(backup, path) {
            if let Err(back) = self.fs.rename(&aside, path) {
                warn!(
                    path = %path.display(),
                    aside = %aside.display(),
                    error = %back,
                    "could not return set-aside item after failed restore"
                );
            }
            return Err(e);
        }

        if let Err(e) = self.fs.remove(&aside, RemoveOptions::recursive()) {
            warn!(path = %aside.display(), error = %e, "could not remove set-aside item");
        }
        Ok(())
    }

    /// A free hidden sibling of `path` to park it in.
    fn aside_path(&self, path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let candidate = path.with_file_name(format!(".{name}.backtrack-undo"));
        if self.fs.exists(&candidate) {
            auto_suffix_path(self.fs(), &candidate, EntryKind::Folder)
        } else {
            candidate
        }
    }

    /// Remove `path` recursively if anything is there.
    pub(crate) fn remove_if_exists(&self, path: &Path) -> OpResult<()> {
        self.fs
            .remove(path, RemoveOptions::recursive_if_exists())
            .map_err(OpError::from)
    }
}
