//! Core types for backtrack.
//!
//! This crate provides the data model shared by the undo/redo engine:
//! applied command records, backup references, entry metadata, the error
//! taxonomy and engine configuration.

mod command;
mod config;
mod entry;
mod error;

pub use command::{BackupRef, Command, CommandKind};
pub use config::{
    DEFAULT_BACKUP_DIR_NAME, DEFAULT_MAX_HISTORY, EngineConfig, EngineConfigBuilder,
    default_backup_root,
};
pub use entry::{EntryKind, EntryMetadata};
pub use error::{BackupError, FsError, OpError, OpResult};
