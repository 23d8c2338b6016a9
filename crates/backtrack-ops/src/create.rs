//! File and folder creation.

use std::path::Path;

use tracing::debug;

use backtrack_core::{BackupRef, Command, EntryKind, OpError, OpResult};

use crate::conflict::{Conflict, ReplacePolicy, auto_suffix_path};
use crate::context::ExecContext;
use crate::operation::{CreateKind, CreateNaming};
use crate::rename::validate_name;

/// Create an empty file or folder at `path`.
pub(crate) fn create(
    ctx: &mut ExecContext,
    path: &Path,
    kind: CreateKind,
    naming: CreateNaming,
    policy: ReplacePolicy,
) -> OpResult<Command> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| OpError::InvalidName {
            name: path.display().to_string(),
            reason: "Path has no valid file name".to_string(),
        })?;
    validate_name(name)?;

    let parent = path.parent().unwrap_or(Path::new(""));
    let parent_meta = ctx.fs().stat(parent)?;
    if !parent_meta.is_dir() {
        return Err(OpError::NotADirectory {
            path: parent.to_path_buf(),
        });
    }

    let mut target = path.to_path_buf();
    let mut replaced: Option<BackupRef> = None;

    if ctx.fs().exists(&target) {
        match naming {
            CreateNaming::AutoSuffix => {
                target = auto_suffix_path(ctx.fs(), path, EntryKind::from(kind));
            }
            CreateNaming::Exact => {
                ctx.guard_backup_store(&target)?;
                let existing = ctx.fs().stat(&target)?;
                ctx.resolve(
                    policy,
                    Conflict::existing(None, target.clone(), existing.kind),
                )?;
                replaced = Some(ctx.back_up_and_remove(&target)?);
            }
        }
    }

    let result = match kind {
        CreateKind::File => ctx.fs().create_file(&target),
        CreateKind::Folder => ctx.fs().mkdir(&target),
    };

    if let Err(e) = result {
        if let Some(backup) = replaced {
            ctx.put_back(backup, &target);
        }
        return Err(e.into());
    }

    debug!(path = %target.display(), %kind, replaced = replaced.is_some(), "created");

    Ok(match kind {
        CreateKind::File => Command::CreateFile {
            path: target,
            replaced,
        },
        CreateKind::Folder => Command::CreateFolder {
            path: target,
            replaced,
        },
    })
}

/// Remove a created item and bring back whatever it replaced.
pub(crate) fn revert_create(
    ctx: &mut ExecContext,
    path: &Path,
    replaced: Option<&BackupRef>,
) -> OpResult<()> {
    match replaced {
        Some(backup) => {
            ctx.require_backup(backup)?;
            ctx.swap_in_backup(backup, path)
        }
        None => ctx.remove_if_exists(path),
    }
}

/// Re-create an item previously created at `path`.
pub(crate) fn redo_create(
    ctx: &mut ExecContext,
    path: &Path,
    kind: CreateKind,
    replaced: bool,
) -> OpResult<Command> {
    create(
        ctx,
        path,
        kind,
        CreateNaming::Exact,
        ReplacePolicy::for_redo(replaced),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::context;
    use backtrack_core::FsError;
    use tempfile::TempDir;

    #[test]
    fn test_create_file_and_revert() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path(), true);
        let path = dir.path().join("new.txt");

        let cmd = create(
            &mut ctx,
            &path,
            CreateKind::File,
            CreateNaming::Exact,
            ReplacePolicy::Ask,
        )
        .unwrap();
        assert!(matches!(cmd, Command::CreateFile { replaced: None, .. }));
        assert!(path.is_file());

        revert_create(&mut ctx, &path, None).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_auto_suffix_on_existing_name() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path(), false);
        let path = dir.path().join("untitled.txt");
        std::fs::write(&path, "keep").unwrap();

        let cmd = create(
            &mut ctx,
            &path,
            CreateKind::File,
            CreateNaming::AutoSuffix,
            ReplacePolicy::Ask,
        )
        .unwrap();
        assert_eq!(cmd.result_path(), dir.path().join("untitled2.txt"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep");
    }

    #[test]
    fn test_exact_name_declined() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path(), false);
        let path = dir.path().join("taken");
        std::fs::create_dir(&path).unwrap();

        let err = create(
            &mut ctx,
            &path,
            CreateKind::Folder,
            CreateNaming::Exact,
            ReplacePolicy::Ask,
        )
        .unwrap_err();
        assert!(err.is_cancelled());
        assert!(path.is_dir());
    }

    #[test]
    fn test_exact_name_replaced_and_reverted() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path(), true);
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "old notes").unwrap();

        let cmd = create(
            &mut ctx,
            &path,
            CreateKind::File,
            CreateNaming::Exact,
            ReplacePolicy::Ask,
        )
        .unwrap();
        assert!(cmd.is_replace());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");

        revert_create(&mut ctx, &path, cmd.replaced()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old notes");
    }

    #[test]
    fn test_missing_parent() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path(), true);
        let path = dir.path().join("missing").join("new.txt");

        let err = create(
            &mut ctx,
            &path,
            CreateKind::File,
            CreateNaming::Exact,
            ReplacePolicy::Ask,
        )
        .unwrap_err();
        assert!(matches!(err, OpError::Fs(FsError::NotFound { .. })));
    }

    #[test]
    fn test_invalid_name() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path(), true);
        let err = create(
            &mut ctx,
            &dir.path().join("bad. "),
            CreateKind::File,
            CreateNaming::Exact,
            ReplacePolicy::Ask,
        )
        .unwrap_err();
        assert!(matches!(err, OpError::InvalidName { .. }));
    }

    #[test]
    fn test_redo_refuses_occupied_path() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path(), true);
        let path = dir.path().join("new.txt");
        std::fs::write(&path, "someone else").unwrap();

        let err = redo_create(&mut ctx, &path, CreateKind::File, false).unwrap_err();
        assert!(matches!(err, OpError::Fs(FsError::AlreadyExists { .. })));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "someone else");
    }
}
