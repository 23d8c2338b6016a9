//! Undoable file operations for backtrack.
//!
//! Every mutation goes through the [`Engine`], which snapshots whatever it is
//! about to destroy, records a [`Command`](backtrack_core::Command) that can
//! invert it, and keeps the undo and redo stacks. [`OperationExecutor`] runs an
//! engine on a blocking worker for async callers.

mod backup;
mod confirm;
mod conflict;
mod context;
mod copy;
mod create;
mod delete;
mod engine;
mod executor;
mod fs;
mod move_op;
mod operation;
mod outcome;
mod rename;
mod undo;

pub use backup::BackupStore;
pub use confirm::{AlwaysConfirm, Confirm, NeverConfirm};
pub use conflict::{
    Conflict, ConflictKind, ReplacePolicy, auto_suffix_path, check_replace_own_contents,
    check_self_containment, is_within, normalize_path,
};
pub use engine::{Engine, History};
pub use executor::{ChannelConfirm, ConfirmRequest, ExecutorClosed, OperationExecutor};
pub use fs::{Filesystem, LocalFs, RemoveOptions};
pub use operation::{CreateKind, CreateNaming, FileOperation};
pub use outcome::{OperationOutcome, OutcomeKind, OutcomeStatus};
pub use rename::validate_filename;
pub use undo::{LogEntry, OperationLog};

/// Default channel buffer size for queued operation requests.
pub const OPERATION_CHANNEL_SIZE: usize = 100;
