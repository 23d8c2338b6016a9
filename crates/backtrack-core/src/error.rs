//! Error types for filesystem operations, backups and command execution.

use std::path::PathBuf;

use thiserror::Error;

/// Errors reported by the filesystem adapter.
#[derive(Debug, Error)]
pub enum FsError {
    /// Path not found.
    #[error("File not found: {path}")]
    NotFound { path: PathBuf },

    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Something already occupies the path.
    #[error("'{path}' already exists")]
    AlreadyExists { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists { path },
            _ => Self::Io { path, source },
        }
    }

    /// The path the error refers to.
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::NotFound { path }
            | Self::PermissionDenied { path }
            | Self::AlreadyExists { path }
            | Self::Io { path, .. } => path,
        }
    }

    /// Check whether this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors raised while taking or restoring backup snapshots.
#[derive(Debug, Error)]
pub enum BackupError {
    /// The source could not be copied into the backup area.
    #[error("Could not back up {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: FsError,
    },

    /// The snapshot disappeared before it could be restored.
    #[error("Cannot undo: backup missing ({backup})")]
    Missing { backup: PathBuf },

    /// The snapshot exists but copying it back failed.
    #[error("Could not restore {destination} from backup: {source}")]
    Restore {
        destination: PathBuf,
        #[source]
        source: FsError,
    },

    /// The backup area itself could not be prepared.
    #[error("Backup storage unavailable at {root}: {source}")]
    Store {
        root: PathBuf,
        #[source]
        source: FsError,
    },
}

/// Errors that abort a command before or during execution.
#[derive(Debug, Error)]
pub enum OpError {
    /// Filesystem failure.
    #[error(transparent)]
    Fs(#[from] FsError),

    /// Backup failure.
    #[error(transparent)]
    Backup(#[from] BackupError),

    /// Copy or move of a folder into itself or one of its descendants.
    #[error("Cannot copy or move a folder into itself or its descendants")]
    SelfContainment { folder: PathBuf, destination: PathBuf },

    /// The existing target is an ancestor of the source being pasted over it.
    #[error("Cannot replace a folder with one of its own contents")]
    ReplaceOwnContents { item: PathBuf, target: PathBuf },

    /// Source and destination resolve to the same item.
    #[error("Source and destination are the same: {path}")]
    SameFile { path: PathBuf },

    /// The requested name is not a valid filename.
    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// A rename could not be performed or reversed.
    #[error("Cannot rename {path}: {message}")]
    Rename { path: PathBuf, message: String },

    /// The item is, or contains, the directory snapshots are kept in.
    #[error("Cannot modify a folder that contains the backup store: {path}")]
    ContainsBackupStore { path: PathBuf },

    /// A destination directory is not a directory.
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// The user declined a confirmation prompt.
    #[error("Operation cancelled")]
    Cancelled,
}

impl OpError {
    /// Check if the error represents a declined confirmation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check if the error is a structural safety violation.
    pub fn is_safety_violation(&self) -> bool {
        matches!(
            self,
            Self::SelfContainment { .. }
                | Self::ReplaceOwnContents { .. }
                | Self::SameFile { .. }
                | Self::ContainsBackupStore { .. }
        )
    }
}

/// Result alias for command execution.
pub type OpResult<T> = Result<T, OpError>;
