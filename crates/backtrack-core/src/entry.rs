//! Filesystem entry kinds and metadata.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The kind of a filesystem entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    #[strum(to_string = "folder", serialize = "dir", serialize = "directory")]
    Folder,
    /// Symbolic link (not followed).
    Symlink,
}

impl EntryKind {
    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File)
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Folder)
    }

    /// Check if this is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        matches!(self, Self::Symlink)
    }
}

/// Metadata returned by a `stat` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMetadata {
    /// What the path points at, without following symlinks.
    pub kind: EntryKind,
    /// Size in bytes (0 for directories on most platforms).
    pub len: u64,
    /// Last modification time, if available.
    pub modified: Option<SystemTime>,
    /// Whether the entry is read-only.
    pub readonly: bool,
}

impl EntryMetadata {
    /// Create metadata for an entry of the given kind.
    pub fn new(kind: EntryKind, len: u64) -> Self {
        Self {
            kind,
            len,
            modified: None,
            readonly: false,
        }
    }

    /// Check if the entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Check if the entry is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Check if the entry is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        self.kind.is_symlink()
    }
}

impl From<&std::fs::Metadata> for EntryMetadata {
    fn from(meta: &std::fs::Metadata) -> Self {
        let file_type = meta.file_type();
        let kind = if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Folder
        } else {
            EntryKind::File
        };

        Self {
            kind,
            len: meta.len(),
            modified: meta.modified().ok(),
            readonly: meta.permissions().readonly(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_kind_discrimination() {
        assert!(EntryKind::File.is_file());
        assert!(!EntryKind::File.is_dir());
        assert!(EntryKind::Folder.is_dir());
        assert!(EntryKind::Symlink.is_symlink());
        assert!(!EntryKind::Symlink.is_file());
    }

    #[test]
    fn test_entry_kind_parse() {
        assert_eq!("file".parse::<EntryKind>().unwrap(), EntryKind::File);
        assert_eq!("dir".parse::<EntryKind>().unwrap(), EntryKind::Folder);
        assert_eq!("folder".parse::<EntryKind>().unwrap(), EntryKind::Folder);
        assert_eq!(EntryKind::Folder.to_string(), "folder");
        assert!("socket".parse::<EntryKind>().is_err());
    }
}
