//! Delete operation backed by a snapshot.

use std::path::Path;

use tracing::debug;

use backtrack_core::{BackupRef, Command, FsError, OpResult};

use crate::conflict::{Conflict, ReplacePolicy};
use crate::context::ExecContext;

/// Delete `path` after snapshotting it.
///
/// With `confirm` set, the user is asked first.
pub(crate) fn delete(ctx: &mut ExecContext, path: &Path, confirm: bool) -> OpResult<Command> {
    ctx.fs().stat(path)?;
    ctx.guard_backup_store(path)?;

    if confirm {
        ctx.resolve(ReplacePolicy::Ask, Conflict::delete(path.to_path_buf()))?;
    }

    let backup = ctx.back_up_and_remove(path)?;
    debug!(path = %path.display(), backup = backup.id, "deleted");

    Ok(Command::Delete {
        path: path.to_path_buf(),
        backup,
    })
}

/// Restore a deleted item from its snapshot.
pub(crate) fn revert_delete(ctx: &mut ExecContext, path: &Path, backup: &BackupRef) -> OpResult<()> {
    ctx.require_backup(backup)?;

    if ctx.fs().exists(path) {
        return Err(FsError::AlreadyExists {
            path: path.to_path_buf(),
        }
        .into());
    }

    ctx.restore(backup, path)
}

/// Delete `path` again without prompting.
pub(crate) fn redo_delete(ctx: &mut ExecContext, path: &Path) -> OpResult<Command> {
    delete(ctx, path, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::context;
    use backtrack_core::OpError;
    use tempfile::TempDir;

    #[test]
    fn test_delete_and_restore_file() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path(), true);
        let path = dir.path().join("doomed.txt");
        std::fs::write(&path, "precious").unwrap();

        let cmd = delete(&mut ctx, &path, true).unwrap();
        assert!(!path.exists());

        let Command::Delete { backup, .. } = &cmd else {
            panic!("expected a delete command");
        };
        revert_delete(&mut ctx, &path, backup).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "precious");
    }

    #[test]
    fn test_delete_and_restore_tree() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path(), true);
        let root = dir.path().join("project");
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("src/main.rs"), "fn main() {}").unwrap();
        std::fs::write(root.join("README"), "readme").unwrap();

        let cmd = delete(&mut ctx, &root, false).unwrap();
        assert!(!root.exists());

        revert_delete(&mut ctx, &root, cmd.backups()[0]).unwrap();
        assert_eq!(
            std::fs::read_to_string(root.join("src/main.rs")).unwrap(),
            "fn main() {}"
        );
        assert_eq!(std::fs::read_to_string(root.join("README")).unwrap(), "readme");
    }

    #[test]
    fn test_declined_delete_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path(), false);
        let path = dir.path().join("keep.txt");
        std::fs::write(&path, "keep").unwrap();

        let err = delete(&mut ctx, &path, true).unwrap_err();
        assert!(err.is_cancelled());
        assert!(path.exists());
        assert!(ctx.backups.is_empty());
    }

    #[test]
    fn test_restore_refuses_occupied_path() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path(), true);
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "old").unwrap();

        let cmd = delete(&mut ctx, &path, false).unwrap();
        std::fs::write(&path, "new").unwrap();

        let err = revert_delete(&mut ctx, &path, cmd.backups()[0]).unwrap_err();
        assert!(matches!(err, OpError::Fs(FsError::AlreadyExists { .. })));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_delete_missing_path() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path(), true);
        let err = delete(&mut ctx, &dir.path().join("ghost"), true).unwrap_err();
        assert!(matches!(err, OpError::Fs(FsError::NotFound { .. })));
    }
}
