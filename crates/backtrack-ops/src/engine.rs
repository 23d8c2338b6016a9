//! The undo/redo engine: the single entry point the UI talks to.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use backtrack_core::{Command, CommandKind, EngineConfig, OpError, OpResult};

use crate::backup::BackupStore;
use crate::confirm::Confirm;
use crate::conflict::{ReplacePolicy, auto_suffix_path, normalize_path};
use crate::context::ExecContext;
use crate::fs::{Filesystem, LocalFs};
use crate::operation::{CreateKind, CreateNaming, FileOperation};
use crate::outcome::{OperationOutcome, OutcomeKind};
use crate::undo::{LogEntry, OperationLog};
use crate::{copy, create, delete, move_op, rename};

/// Copy of both history stacks for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    /// Undoable entries, oldest first.
    pub undo: Vec<LogEntry>,
    /// Redoable entries, next to redo last.
    pub redo: Vec<LogEntry>,
}

/// Applies file operations and replays their inverses.
///
/// Every request returns an [`OperationOutcome`]; errors never escape.
pub struct Engine {
    ctx: ExecContext,
    log: OperationLog,
    config: EngineConfig,
}

impl Engine {
    /// Create an engine on the local filesystem.
    pub fn new(config: EngineConfig, confirm: impl Confirm + 'static) -> Self {
        Self::with_filesystem(config, LocalFs::new(), confirm)
    }

    /// Create an engine on a custom filesystem.
    pub fn with_filesystem(
        config: EngineConfig,
        fs: impl Filesystem + 'static,
        confirm: impl Confirm + 'static,
    ) -> Self {
        let backups = BackupStore::new(config.backup_root.clone());
        debug!(session = %backups.session_dir().display(), "engine started");

        Self {
            ctx: ExecContext::new(Box::new(fs), backups, Box::new(confirm)),
            log: OperationLog::new(config.max_history),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn log(&self) -> &OperationLog {
        &self.log
    }

    pub fn backups(&self) -> &BackupStore {
        &self.ctx.backups
    }

    /// Replace the confirmation capability.
    pub fn set_confirm(&mut self, confirm: impl Confirm + 'static) {
        self.ctx.confirm = Box::new(confirm);
    }

    /// Apply any file operation.
    pub fn execute(&mut self, operation: FileOperation) -> OperationOutcome {
        match operation {
            FileOperation::Create { path, kind, naming } => self.apply_create(&path, kind, naming),
            FileOperation::Rename { source, new_name } => self.apply_rename(&source, &new_name),
            FileOperation::Delete { path } => self.apply_delete(&path),
            FileOperation::Copy {
                source,
                destination_dir,
            } => self.apply_copy(&source, &destination_dir),
            FileOperation::Move {
                source,
                destination_dir,
            } => self.apply_move(&source, &destination_dir),
        }
    }

    /// Create an empty file or folder.
    pub fn apply_create(
        &mut self,
        path: &Path,
        kind: CreateKind,
        naming: CreateNaming,
    ) -> OperationOutcome {
        let operation = match kind {
            CreateKind::File => CommandKind::CreateFile,
            CreateKind::Folder => CommandKind::CreateFolder,
        };
        let result = normalize_path(path)
            .map_err(OpError::from)
            .and_then(|path| create::create(&mut self.ctx, &path, kind, naming, ReplacePolicy::Ask));
        self.finish_apply(operation, result)
    }

    /// Rename an item within its folder.
    pub fn apply_rename(&mut self, source: &Path, new_name: &str) -> OperationOutcome {
        let result = normalize_path(source)
            .map_err(OpError::from)
            .and_then(|source| rename::rename(&mut self.ctx, &source, new_name));
        self.finish_apply(CommandKind::Rename, result)
    }

    /// Delete an item, keeping a snapshot for undo.
    pub fn apply_delete(&mut self, path: &Path) -> OperationOutcome {
        let confirm = self.config.confirm_delete;
        let result = normalize_path(path)
            .map_err(OpError::from)
            .and_then(|path| delete::delete(&mut self.ctx, &path, confirm));
        self.finish_apply(CommandKind::Delete, result)
    }

    /// Copy an item into `destination_dir`.
    pub fn apply_copy(&mut self, source: &Path, destination_dir: &Path) -> OperationOutcome {
        let result = self.try_copy(source, destination_dir);
        self.finish_apply(CommandKind::Copy, result)
    }

    /// Move an item into `destination_dir`.
    pub fn apply_move(&mut self, source: &Path, destination_dir: &Path) -> OperationOutcome {
        let result = self.try_move(source, destination_dir);
        self.finish_apply(CommandKind::Move, result)
    }

    /// Invert the most recent command.
    pub fn undo(&mut self) -> OperationOutcome {
        let Some(entry) = self.log.pop_undo() else {
            return OperationOutcome::nothing(OutcomeKind::Undo);
        };
        let operation = entry.command.kind();

        match self.invert(&entry.command) {
            Ok(path) => {
                let message = entry.undo_description();
                info!(id = entry.id, %operation, "undone: {}", message);
                self.log.push_redo(entry);
                OperationOutcome::completed(OutcomeKind::Undo, operation, message, path)
            }
            Err(e) => {
                warn!(id = entry.id, %operation, error = %e, "undo failed");
                self.log.restore_undo(entry);
                OperationOutcome::from_error(OutcomeKind::Undo, Some(operation), &e)
            }
        }
    }

    /// Re-execute the most recently undone command.
    pub fn redo(&mut self) -> OperationOutcome {
        let Some(entry) = self.log.pop_redo() else {
            return OperationOutcome::nothing(OutcomeKind::Redo);
        };
        let operation = entry.command.kind();

        match self.replay(&entry.command) {
            Ok(command) => {
                let id = entry.id;
                self.discard_entries([entry]);
                let fresh = LogEntry::new(id, command);
                let message = fresh.description.clone();
                let path = fresh.command.result_path().to_path_buf();
                info!(id = fresh.id, %operation, "redone: {}", message);

                if let Some(evicted) = self.log.push_undo(fresh) {
                    self.discard_entries([evicted]);
                }
                OperationOutcome::completed(OutcomeKind::Redo, operation, message, path)
            }
            Err(e) => {
                warn!(id = entry.id, %operation, error = %e, "redo failed");
                self.log.restore_redo(entry);
                OperationOutcome::from_error(OutcomeKind::Redo, Some(operation), &e)
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        self.log.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.log.can_redo()
    }

    /// Snapshot both stacks.
    pub fn history(&self) -> History {
        History {
            undo: self.log.iter_undo().cloned().collect(),
            redo: self.log.iter_redo().cloned().collect(),
        }
    }

    /// Forget all history and discard every snapshot it referenced.
    pub fn clear(&mut self) {
        let entries = self.log.clear();
        debug!(count = entries.len(), "history cleared");
        self.discard_entries(entries);
    }

    fn finish_apply(&mut self, operation: CommandKind, result: OpResult<Command>) -> OperationOutcome {
        match result {
            Ok(command) => {
                let message = command.description();
                let path = command.result_path().to_path_buf();
                let (id, dropped) = self.log.record(command);
                info!(id, %operation, "applied: {}", message);
                self.discard_entries(dropped);
                OperationOutcome::completed(OutcomeKind::Apply, operation, message, path)
            }
            Err(e) => {
                if e.is_cancelled() {
                    debug!(%operation, "cancelled by user");
                } else {
                    warn!(%operation, error = %e, "operation failed");
                }
                OperationOutcome::from_error(OutcomeKind::Apply, Some(operation), &e)
            }
        }
    }

    fn try_copy(&mut self, source: &Path, destination_dir: &Path) -> OpResult<Command> {
        let (source, mut target) = self.transfer_paths(source, destination_dir)?;

        // Pasting into the item's own folder makes a duplicate.
        if target == source {
            let kind = self.ctx.fs().stat(&source)?.kind;
            target = auto_suffix_path(self.ctx.fs(), &target, kind);
        }

        copy::copy(&mut self.ctx, &source, &target, ReplacePolicy::Ask)
    }

    fn try_move(&mut self, source: &Path, destination_dir: &Path) -> OpResult<Command> {
        let (source, target) = self.transfer_paths(source, destination_dir)?;
        move_op::move_to(&mut self.ctx, &source, &target, ReplacePolicy::Ask)
    }

    /// Resolve a copy or move request to absolute source and target paths.
    fn transfer_paths(&self, source: &Path, destination_dir: &Path) -> OpResult<(PathBuf, PathBuf)> {
        let source = normalize_path(source)?;
        let destination_dir = normalize_path(destination_dir)?;

        if !self.ctx.fs().stat(&destination_dir)?.is_dir() {
            return Err(OpError::NotADirectory {
                path: destination_dir,
            });
        }

        let name = source.file_name().ok_or_else(|| OpError::InvalidName {
            name: source.display().to_string(),
            reason: "Path has no file name".to_string(),
        })?;
        let target = destination_dir.join(name);
        Ok((source, target))
    }

    /// Run the inverse of `command`, returning the path it brought back.
    fn invert(&mut self, command: &Command) -> OpResult<PathBuf> {
        let ctx = &mut self.ctx;
        match command {
            Command::CreateFile { path, replaced } | Command::CreateFolder { path, replaced } => {
                create::revert_create(ctx, path, replaced.as_ref())?;
                Ok(path.clone())
            }
            Command::Rename { from, to } => {
                rename::revert_rename(ctx, from, to)?;
                Ok(from.clone())
            }
            Command::Delete { path, backup } => {
                delete::revert_delete(ctx, path, backup)?;
                Ok(path.clone())
            }
            Command::Copy {
                target, replaced, ..
            } => {
                copy::revert_copy(ctx, target, replaced.as_ref())?;
                Ok(target.clone())
            }
            Command::Move {
                source,
                target,
                replaced,
            } => {
                move_op::revert_move(ctx, source, target, replaced.as_ref())?;
                Ok(source.clone())
            }
        }
    }

    /// Re-run the forward action of `command`, producing a fresh record.
    fn replay(&mut self, command: &Command) -> OpResult<Command> {
        let ctx = &mut self.ctx;
        match command {
            Command::CreateFile { path, replaced } => {
                create::redo_create(ctx, path, CreateKind::File, replaced.is_some())
            }
            Command::CreateFolder { path, replaced } => {
                create::redo_create(ctx, path, CreateKind::Folder, replaced.is_some())
            }
            Command::Rename { from, to } => rename::redo_rename(ctx, from, to),
            Command::Delete { path, .. } => delete::redo_delete(ctx, path),
            Command::Copy {
                source,
                target,
                replaced,
            } => copy::redo_copy(ctx, source, target, replaced.is_some()),
            Command::Move {
                source,
                target,
                replaced,
            } => move_op::redo_move(ctx, source, target, replaced.is_some()),
        }
    }

    fn discard_entries(&mut self, entries: impl IntoIterator<Item = LogEntry>) {
        for entry in entries {
            for backup in entry.command.backups() {
                self.ctx.discard(backup);
            }
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if !self.config.purge_on_exit {
            return;
        }
        let fs = self.ctx.fs.as_ref();
        match self.ctx.backups.purge(fs) {
            Ok(()) => debug!(session = %self.ctx.backups.session_dir().display(), "backups purged"),
            Err(e) => warn!(error = %e, "failed to purge backups"),
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("log", &self.log)
            .field("backups", &self.ctx.backups)
            .finish_non_exhaustive()
    }
}
