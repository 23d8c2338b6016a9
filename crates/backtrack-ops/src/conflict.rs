//! Conflict detection and safety checks for file operations.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use backtrack_core::{EntryKind, FsError, OpError, OpResult};

use crate::fs::Filesystem;

/// What a confirmation prompt asks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    /// A file already exists at the destination.
    FileExists,
    /// A directory already exists at the destination.
    DirectoryExists,
    /// The item is about to be deleted.
    Delete,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileExists => write!(f, "File already exists"),
            Self::DirectoryExists => write!(f, "Directory already exists"),
            Self::Delete => write!(f, "Delete"),
        }
    }
}

/// A decision point raised before any mutation happens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    /// The item being copied, moved or created, if any.
    pub source: Option<PathBuf>,
    /// The path that would be overwritten or deleted.
    pub destination: PathBuf,
    /// The kind of conflict.
    pub kind: ConflictKind,
}

impl Conflict {
    /// A replace prompt for an occupied destination.
    pub fn existing(source: Option<PathBuf>, destination: PathBuf, existing: EntryKind) -> Self {
        let kind = if existing.is_dir() {
            ConflictKind::DirectoryExists
        } else {
            ConflictKind::FileExists
        };
        Self {
            source,
            destination,
            kind,
        }
    }

    /// A delete prompt.
    pub fn delete(path: PathBuf) -> Self {
        Self {
            source: None,
            destination: path,
            kind: ConflictKind::Delete,
        }
    }

    /// The question to show the user.
    pub fn message(&self) -> String {
        let name = self
            .destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.destination.display().to_string());

        match self.kind {
            ConflictKind::Delete => format!("Delete '{name}'?"),
            ConflictKind::FileExists | ConflictKind::DirectoryExists => {
                let location = self
                    .destination
                    .parent()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                format!("{}: '{name}' in {location}. Replace it?", self.kind)
            }
        }
    }
}

/// How an occupied destination is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacePolicy {
    /// Raise a confirmation prompt.
    Ask,
    /// Replacement was already approved (redo of a confirmed replace).
    Approved,
    /// Fail with `AlreadyExists`.
    Forbid,
}

impl ReplacePolicy {
    /// Policy for re-executing a command that did or did not replace.
    pub fn for_redo(replaced: bool) -> Self {
        if replaced {
            Self::Approved
        } else {
            Self::Forbid
        }
    }
}

/// Make `path` absolute and drop `.` and `..` components lexically.
pub fn normalize_path(path: &Path) -> Result<PathBuf, FsError> {
    let absolute = std::path::absolute(path).map_err(|e| FsError::io(path, e))?;

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

/// Whether `path` equals `ancestor` or lies below it.
///
/// Comparison is per component, so `/a/bc` is not within `/a/b`.
pub fn is_within(path: &Path, ancestor: &Path) -> bool {
    path.starts_with(ancestor)
}

/// Reject copying or moving `source` into `destination_dir` when the
/// destination is the source itself or one of its descendants.
pub fn check_self_containment(
    fs: &dyn Filesystem,
    source: &Path,
    destination_dir: &Path,
) -> OpResult<()> {
    let violation = || OpError::SelfContainment {
        folder: source.to_path_buf(),
        destination: destination_dir.to_path_buf(),
    };

    if is_within(destination_dir, source) {
        return Err(violation());
    }

    // A symlink source is copied or moved as a link, so its target does not
    // matter. Symlinked parents can still hide the relationship lexically.
    let source_is_link = fs
        .stat(source)
        .map(|meta| meta.kind == EntryKind::Symlink)
        .unwrap_or(false);
    if source_is_link {
        return Ok(());
    }

    if let (Ok(source), Ok(destination)) = (
        fs.canonicalize(source),
        fs.canonicalize(destination_dir),
    ) {
        if fs.is_dir(&source) && is_within(&destination, &source) {
            return Err(violation());
        }
    }

    Ok(())
}

/// Reject pasting `source` over an existing `target` that contains it.
///
/// Replacing `/a/item` with `/a/item/item` would delete the source before it
/// could be copied.
pub fn check_replace_own_contents(source: &Path, target: &Path) -> OpResult<()> {
    if source != target && is_within(source, target) {
        return Err(OpError::ReplaceOwnContents {
            item: source.to_path_buf(),
            target: target.to_path_buf(),
        });
    }
    Ok(())
}

/// Generate a free path by appending a number to the name.
///
/// For the file "untitled.txt", tries "untitled2.txt", "untitled3.txt", etc.
/// Folder names get the number at the very end ("New Folder2").
pub fn auto_suffix_path(fs: &dyn Filesystem, path: &Path, kind: EntryKind) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new(""));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let (stem, extension) = if kind.is_dir() {
        (name.clone(), None)
    } else {
        split_extension(&name)
    };

    let candidate = |suffix: &str| match extension {
        Some(ext) => format!("{stem}{suffix}.{ext}"),
        None => format!("{stem}{suffix}"),
    };

    for i in 2..10_000 {
        let new_path = parent.join(candidate(&i.to_string()));
        if !fs.exists(&new_path) {
            return new_path;
        }
    }

    // Fallback: use timestamp
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    parent.join(candidate(&format!("_{timestamp}")))
}

/// Split "name.ext" into ("name", Some("ext")). Dotfiles keep their dot.
fn split_extension(name: &str) -> (String, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => {
            (name[..idx].to_string(), Some(&name[idx + 1..]))
        }
        _ => (name.to_string(), None),
    }
}
