//! Applied command records and backup references.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::entry::EntryKind;

/// Reference to a snapshot held in the backup store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRef {
    /// Store-local sequence number.
    pub id: u64,
    /// Where the snapshot lives inside the backup root.
    pub location: PathBuf,
    /// The path that was backed up.
    pub original: PathBuf,
    /// What was backed up.
    pub kind: EntryKind,
    /// Bytes copied into the snapshot.
    pub size: u64,
    /// When the snapshot was taken.
    pub created: DateTime<Local>,
}

/// The kind of a command, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum CommandKind {
    #[strum(to_string = "Create file")]
    CreateFile,
    #[strum(to_string = "Create folder")]
    CreateFolder,
    Rename,
    Delete,
    Copy,
    Move,
}

/// One applied, reversible filesystem mutation.
///
/// Each variant carries exactly what is needed to invert it: the paths it
/// touched and the snapshots of anything it destroyed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// An empty file was created, optionally replacing an existing item.
    CreateFile {
        path: PathBuf,
        replaced: Option<BackupRef>,
    },
    /// An empty folder was created, optionally replacing an existing item.
    CreateFolder {
        path: PathBuf,
        replaced: Option<BackupRef>,
    },
    /// An item was renamed inside its parent directory.
    Rename { from: PathBuf, to: PathBuf },
    /// An item was removed after being backed up.
    Delete { path: PathBuf, backup: BackupRef },
    /// `source` was copied to `target`.
    Copy {
        source: PathBuf,
        target: PathBuf,
        replaced: Option<BackupRef>,
    },
    /// `source` was moved to `target`.
    Move {
        source: PathBuf,
        target: PathBuf,
        replaced: Option<BackupRef>,
    },
}

impl Command {
    /// The kind of this command.
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::CreateFile { .. } => CommandKind::CreateFile,
            Self::CreateFolder { .. } => CommandKind::CreateFolder,
            Self::Rename { .. } => CommandKind::Rename,
            Self::Delete { .. } => CommandKind::Delete,
            Self::Copy { .. } => CommandKind::Copy,
            Self::Move { .. } => CommandKind::Move,
        }
    }

    /// The path a UI should select after the command has been applied.
    pub fn result_path(&self) -> &Path {
        match self {
            Self::CreateFile { path, .. }
            | Self::CreateFolder { path, .. }
            | Self::Delete { path, .. } => path,
            Self::Rename { to, .. } => to,
            Self::Copy { target, .. } | Self::Move { target, .. } => target,
        }
    }

    /// Whether the forward action overwrote an existing item.
    pub fn is_replace(&self) -> bool {
        self.replaced().is_some()
    }

    /// The snapshot of an overwritten item, if any.
    pub fn replaced(&self) -> Option<&BackupRef> {
        match self {
            Self::CreateFile { replaced, .. }
            | Self::CreateFolder { replaced, .. }
            | Self::Copy { replaced, .. }
            | Self::Move { replaced, .. } => replaced.as_ref(),
            Self::Rename { .. } | Self::Delete { .. } => None,
        }
    }

    /// Every snapshot owned by this command.
    pub fn backups(&self) -> Vec<&BackupRef> {
        match self {
            Self::Delete { backup, .. } => vec![backup],
            _ => self.replaced().into_iter().collect(),
        }
    }

    /// Human-readable description of the forward action.
    pub fn description(&self) -> String {
        match self {
            Self::CreateFile { path, replaced } => {
                with_replace(format!("Created file '{}'", file_name(path)), replaced)
            }
            Self::CreateFolder { path, replaced } => {
                with_replace(format!("Created folder '{}'", file_name(path)), replaced)
            }
            Self::Rename { from, to } => {
                format!("Renamed '{}' to '{}'", file_name(from), file_name(to))
            }
            Self::Delete { path, .. } => format!("Deleted '{}'", file_name(path)),
            Self::Copy {
                source,
                target,
                replaced,
            } => with_replace(
                format!("Copied '{}' to {}", file_name(source), parent_display(target)),
                replaced,
            ),
            Self::Move {
                source,
                target,
                replaced,
            } => with_replace(
                format!("Moved '{}' to {}", file_name(source), parent_display(target)),
                replaced,
            ),
        }
    }

    /// Get a description of how to undo this command.
    pub fn undo_description(&self) -> String {
        match self {
            Self::CreateFile { replaced: None, .. } => "Delete the created file".to_string(),
            Self::CreateFolder { replaced: None, .. } => "Delete the created folder".to_string(),
            Self::CreateFile { path, .. } | Self::CreateFolder { path, .. } => {
                format!("Restore the previous '{}'", file_name(path))
            }
            Self::Rename { from, .. } => format!("Rename back to '{}'", file_name(from)),
            Self::Delete { path, .. } => format!("Restore '{}' from backup", file_name(path)),
            Self::Copy {
                target,
                replaced: None,
                ..
            } => format!("Delete the copy '{}'", file_name(target)),
            Self::Copy { target, .. } => {
                format!("Restore the replaced '{}'", file_name(target))
            }
            Self::Move { source, .. } => {
                format!("Move '{}' back to {}", file_name(source), parent_display(source))
            }
        }
    }
}

fn with_replace(description: String, replaced: &Option<BackupRef>) -> String {
    if replaced.is_some() {
        format!("{description} (replaced existing)")
    } else {
        description
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn parent_display(path: &Path) -> String {
    path.parent()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}
