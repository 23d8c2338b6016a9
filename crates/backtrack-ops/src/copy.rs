//! Copy operation.

use std::path::Path;

use tracing::{debug, warn};

use backtrack_core::{BackupRef, Command, OpError, OpResult};

use crate::conflict::{Conflict, ReplacePolicy, check_replace_own_contents, check_self_containment};
use crate::context::ExecContext;

/// Copy `source` to `target`, replacing an existing item per `policy`.
pub(crate) fn copy(
    ctx: &mut ExecContext,
    source: &Path,
    target: &Path,
    policy: ReplacePolicy,
) -> OpResult<Command> {
    ctx.fs().stat(source)?;

    if let Some(parent) = target.parent() {
        check_self_containment(ctx.fs(), source, parent)?;
    }
    if target == source {
        return Err(OpError::SameFile {
            path: target.to_path_buf(),
        });
    }

    let replaced = prepare_target(ctx, source, target, policy)?;

    match ctx.fs().copy_recursive(source, target) {
        Ok(bytes) => {
            debug!(
                source = %source.display(),
                target = %target.display(),
                bytes,
                "copied"
            );
        }
        Err(e) => {
            if let Err(cleanup) = ctx.remove_if_exists(target) {
                warn!(path = %target.display(), error = %cleanup, "could not remove partial copy");
            }
            if let Some(backup) = replaced {
                ctx.put_back(backup, target);
            }
            return Err(e.into());
        }
    }

    Ok(Command::Copy {
        source: source.to_path_buf(),
        target: target.to_path_buf(),
        replaced,
    })
}

/// Clear an occupied `target` after the user agreed, returning its snapshot.
pub(crate) fn prepare_target(
    ctx: &mut ExecContext,
    source: &Path,
    target: &Path,
    policy: ReplacePolicy,
) -> OpResult<Option<BackupRef>> {
    if !ctx.fs().exists(target) {
        return Ok(None);
    }

    check_replace_own_contents(source, target)?;
    ctx.guard_backup_store(target)?;
    let existing = ctx.fs().stat(target)?;
    ctx.resolve(
        policy,
        Conflict::existing(Some(source.to_path_buf()), target.to_path_buf(), existing.kind),
    )?;

    ctx.back_up_and_remove(target).map(Some)
}

/// Remove the copy and bring back whatever it replaced.
pub(crate) fn revert_copy(
    ctx: &mut ExecContext,
    target: &Path,
    replaced: Option<&BackupRef>,
) -> OpResult<()> {
    match replaced {
        Some(backup) => {
            ctx.require_backup(backup)?;
            ctx.swap_in_backup(backup, target)
        }
        None => ctx.remove_if_exists(target),
    }
}

/// Copy again, replacing only if the original copy did.
pub(crate) fn redo_copy(
    ctx: &mut ExecContext,
    source: &Path,
    target: &Path,
    replaced: bool,
) -> OpResult<Command> {
    copy(ctx, source, target, ReplacePolicy::for_redo(replaced))
}
