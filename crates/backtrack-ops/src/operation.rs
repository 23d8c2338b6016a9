//! File operation requests.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use backtrack_core::{CommandKind, EntryKind};

/// What a create request makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum CreateKind {
    File,
    #[strum(to_string = "folder", serialize = "dir", serialize = "directory")]
    Folder,
}

impl From<CreateKind> for EntryKind {
    fn from(kind: CreateKind) -> Self {
        match kind {
            CreateKind::File => EntryKind::File,
            CreateKind::Folder => EntryKind::Folder,
        }
    }
}

/// How a create request treats an occupied name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CreateNaming {
    /// The user typed the name; an existing item raises a replace prompt.
    #[default]
    Exact,
    /// "New file" style action; an existing name gets a numeric suffix.
    AutoSuffix,
}

/// A file operation requested by the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileOperation {
    /// Create a new empty file or folder.
    Create {
        path: PathBuf,
        kind: CreateKind,
        naming: CreateNaming,
    },
    /// Rename a single file or directory.
    Rename { source: PathBuf, new_name: String },
    /// Delete a file or directory (backed up first).
    Delete { path: PathBuf },
    /// Copy an item into a destination directory.
    Copy {
        source: PathBuf,
        destination_dir: PathBuf,
    },
    /// Move an item into a destination directory.
    Move {
        source: PathBuf,
        destination_dir: PathBuf,
    },
}

impl FileOperation {
    /// Create a file creation operation with a user-chosen name.
    pub fn create_file(path: impl Into<PathBuf>) -> Self {
        Self::Create {
            path: path.into(),
            kind: CreateKind::File,
            naming: CreateNaming::Exact,
        }
    }

    /// Create a folder creation operation with a user-chosen name.
    pub fn create_folder(path: impl Into<PathBuf>) -> Self {
        Self::Create {
            path: path.into(),
            kind: CreateKind::Folder,
            naming: CreateNaming::Exact,
        }
    }

    /// Create a "new item" operation that picks a free name.
    pub fn create_new(path: impl Into<PathBuf>, kind: CreateKind) -> Self {
        Self::Create {
            path: path.into(),
            kind,
            naming: CreateNaming::AutoSuffix,
        }
    }

    /// Create a rename operation.
    pub fn rename(source: impl Into<PathBuf>, new_name: impl Into<String>) -> Self {
        Self::Rename {
            source: source.into(),
            new_name: new_name.into(),
        }
    }

    /// Create a delete operation.
    pub fn delete(path: impl Into<PathBuf>) -> Self {
        Self::Delete { path: path.into() }
    }

    /// Create a copy operation.
    pub fn copy(source: impl Into<PathBuf>, destination_dir: impl Into<PathBuf>) -> Self {
        Self::Copy {
            source: source.into(),
            destination_dir: destination_dir.into(),
        }
    }

    /// Create a move operation.
    pub fn move_to(source: impl Into<PathBuf>, destination_dir: impl Into<PathBuf>) -> Self {
        Self::Move {
            source: source.into(),
            destination_dir: destination_dir.into(),
        }
    }

    /// The kind of command this operation produces.
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Create {
                kind: CreateKind::File,
                ..
            } => CommandKind::CreateFile,
            Self::Create {
                kind: CreateKind::Folder,
                ..
            } => CommandKind::CreateFolder,
            Self::Rename { .. } => CommandKind::Rename,
            Self::Delete { .. } => CommandKind::Delete,
            Self::Copy { .. } => CommandKind::Copy,
            Self::Move { .. } => CommandKind::Move,
        }
    }
}
