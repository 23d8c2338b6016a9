//! Move operation.

use std::path::Path;

use tracing::{debug, warn};

use backtrack_core::{BackupRef, Command, FsError, OpError, OpResult};

use crate::conflict::{ReplacePolicy, check_self_containment};
use crate::context::ExecContext;
use crate::copy::prepare_target;
use crate::fs::RemoveOptions;

/// Move `source` to `target`, replacing an existing item per `policy`.
pub(crate) fn move_to(
    ctx: &mut ExecContext,
    source: &Path,
    target: &Path,
    policy: ReplacePolicy,
) -> OpResult<Command> {
    ctx.fs().stat(source)?;
    ctx.guard_backup_store(source)?;

    if let Some(parent) = target.parent() {
        check_self_containment(ctx.fs(), source, parent)?;
    }
    if target == source {
        return Err(OpError::SameFile {
            path: target.to_path_buf(),
        });
    }

    let replaced = prepare_target(ctx, source, target, policy)?;

    if let Err(e) = move_item(ctx, source, target) {
        if let Some(backup) = replaced {
            ctx.put_back(backup, target);
        }
        return Err(e);
    }

    debug!(
        source = %source.display(),
        target = %target.display(),
        replaced = replaced.is_some(),
        "moved"
    );

    Ok(Command::Move {
        source: source.to_path_buf(),
        target: target.to_path_buf(),
        replaced,
    })
}

/// Move the item back to `source` and restore what it replaced.
pub(crate) fn revert_move(
    ctx: &mut ExecContext,
    source: &Path,
    target: &Path,
    replaced: Option<&BackupRef>,
) -> OpResult<()> {
    if let Some(backup) = replaced {
        ctx.require_backup(backup)?;
    }

    if ctx.fs().exists(source) {
        return Err(FsError::AlreadyExists {
            path: source.to_path_buf(),
        }
        .into());
    }

    move_item(ctx, target, source)?;

    if let Some(backup) = replaced {
        if let Err(e) = ctx.restore(backup, target) {
            // Keep the filesystem in the state the history describes.
            if let Err(forward) = move_item(ctx, source, target) {
                warn!(
                    source = %source.display(),
                    target = %target.display(),
                    error = %forward,
                    "could not return moved item after failed restore"
                );
            }
            return Err(e);
        }
    }
    Ok(())
}

/// Move again, replacing only if the original move did.
pub(crate) fn redo_move(
    ctx: &mut ExecContext,
    source: &Path,
    target: &Path,
    replaced: bool,
) -> OpResult<Command> {
    move_to(ctx, source, target, ReplacePolicy::for_redo(replaced))
}

/// Rename when possible, otherwise copy then remove.
fn move_item(ctx: &mut ExecContext, from: &Path, to: &Path) -> OpResult<()> {
    match ctx.fs().rename(from, to) {
        Ok(()) => return Ok(()),
        // Cross-device and similar failures fall through to copy.
        Err(FsError::Io { .. }) => {}
        Err(e) => return Err(e.into()),
    }

    let is_dir = ctx.fs().is_dir(from);
    if let Err(e) = ctx.fs().copy_recursive(from, to) {
        if let Err(cleanup) = ctx.remove_if_exists(to) {
            warn!(path = %to.display(), error = %cleanup, "could not remove partial copy");
        }
        return Err(e.into());
    }

    if let Err(e) = ctx.fs().remove(from, RemoveOptions::recursive()) {
        if is_dir {
            warn!(
                source = %from.display(),
                error = %e,
                "moved folder copied but source could not be fully removed"
            );
            return Ok(());
        }
        if let Err(cleanup) = ctx.remove_if_exists(to) {
            warn!(path = %to.display(), error = %cleanup, "could not roll back copy");
        }
        return Err(e.into());
    }

    Ok(())
}
