//! Rename operation.

use std::path::Path;

use tracing::debug;

use backtrack_core::{Command, FsError, OpError, OpResult};

use crate::context::ExecContext;

/// Rename `source` to `new_name` inside its parent directory.
pub(crate) fn rename(ctx: &mut ExecContext, source: &Path, new_name: &str) -> OpResult<Command> {
    validate_name(new_name)?;

    let parent = source.parent().ok_or_else(|| OpError::Rename {
        path: source.to_path_buf(),
        message: "Cannot resolve the parent directory".to_string(),
    })?;
    let target = parent.join(new_name);

    if target == source {
        return Err(OpError::SameFile { path: target });
    }

    rename_between(ctx, source, &target)?;
    Ok(Command::Rename {
        from: source.to_path_buf(),
        to: target,
    })
}

/// Rename `to` back to `from`.
pub(crate) fn revert_rename(ctx: &mut ExecContext, from: &Path, to: &Path) -> OpResult<()> {
    rename_between(ctx, to, from)
}

/// Repeat a rename from `from` to `to`.
pub(crate) fn redo_rename(ctx: &mut ExecContext, from: &Path, to: &Path) -> OpResult<Command> {
    rename_between(ctx, from, to)?;
    Ok(Command::Rename {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
    })
}

/// Rename with the checks shared by apply, undo and redo.
fn rename_between(ctx: &mut ExecContext, from: &Path, to: &Path) -> OpResult<()> {
    ctx.fs().stat(from)?;
    ctx.guard_backup_store(from)?;

    let parent_ok = to
        .parent()
        .map(|parent| ctx.fs().is_dir(parent))
        .unwrap_or(false);
    if !parent_ok {
        return Err(OpError::Rename {
            path: from.to_path_buf(),
            message: format!("Parent directory of {} no longer exists", to.display()),
        });
    }

    ctx.fs().rename(from, to).map_err(|e| match e {
        FsError::AlreadyExists { path } => OpError::Rename {
            message: format!(
                "'{}' already exists",
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            ),
            path: from.to_path_buf(),
        },
        other => other.into(),
    })?;

    debug!(from = %from.display(), to = %to.display(), "renamed");
    Ok(())
}

/// Validate a name and wrap failures in [`OpError::InvalidName`].
pub(crate) fn validate_name(name: &str) -> OpResult<()> {
    validate_filename(name).map_err(|reason| OpError::InvalidName {
        name: name.to_string(),
        reason,
    })
}

/// Validate a filename for cross-platform compatibility.
pub fn validate_filename(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Name cannot be empty".into());
    }

    if name.len() > 255 {
        return Err("Name is too long (max 255 characters)".into());
    }

    for c in ['/', '\0'] {
        if name.contains(c) {
            return Err(format!("Name cannot contain '{}'", c.escape_default()));
        }
    }

    #[cfg(target_os = "windows")]
    {
        let windows_invalid = ['\\', ':', '*', '?', '"', '<', '>', '|'];
        for c in windows_invalid {
            if name.contains(c) {
                return Err(format!("Name cannot contain '{}'", c));
            }
        }

        let reserved = [
            "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7",
            "COM8", "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
        ];
        let upper_name = name.to_uppercase();
        let base_name = upper_name.split('.').next().unwrap_or("");
        if reserved.contains(&base_name) {
            return Err("Reserved filename".into());
        }
    }

    if name == "." || name == ".." {
        return Err("'.' and '..' are reserved names".into());
    }

    if name.starts_with(' ') || name.ends_with(' ') {
        return Err("Name cannot start or end with spaces".into());
    }

    if name.ends_with('.') {
        return Err("Name cannot end with a dot".into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::context;
    use tempfile::TempDir;

    #[test]
    fn test_validate_filename_valid() {
        assert!(validate_filename("test.txt").is_ok());
        assert!(validate_filename("my-file").is_ok());
        assert!(validate_filename(".hidden").is_ok());
        assert!(validate_filename("file with spaces").is_ok());
    }

    #[test]
    fn test_validate_filename_invalid() {
        assert!(validate_filename("").is_err());
        assert!(validate_filename("test/file").is_err());
        assert!(validate_filename("nul\0byte").is_err());
        assert!(validate_filename(".").is_err());
        assert!(validate_filename("..").is_err());
        assert!(validate_filename("file ").is_err());
        assert!(validate_filename(" file").is_err());
        assert!(validate_filename("file.").is_err());
        assert!(validate_filename(&"x".repeat(256)).is_err());
    }

    #[test]
    fn test_rename_and_revert() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path(), true);
        let a = dir.path().join("a.txt");
        std::fs::write(&a, "content").unwrap();

        let cmd = rename(&mut ctx, &a, "b.txt").unwrap();
        let b = dir.path().join("b.txt");
        assert_eq!(
            cmd,
            Command::Rename {
                from: a.clone(),
                to: b.clone()
            }
        );
        assert!(!a.exists());
        assert_eq!(std::fs::read_to_string(&b).unwrap(), "content");

        revert_rename(&mut ctx, &a, &b).unwrap();
        assert!(a.exists());
        assert!(!b.exists());

        redo_rename(&mut ctx, &a, &b).unwrap();
        assert!(b.exists());
    }

    #[test]
    fn test_rename_onto_existing_name() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path(), true);
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "a").unwrap();
        std::fs::write(&b, "b").unwrap();

        let err = rename(&mut ctx, &a, "b.txt").unwrap_err();
        assert!(matches!(err, OpError::Rename { .. }));
        assert!(err.to_string().contains("already exists"));
        assert_eq!(std::fs::read_to_string(&b).unwrap(), "b");
    }

    #[test]
    fn test_rename_rejects_separators() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path(), true);
        let a = dir.path().join("a.txt");
        std::fs::write(&a, "a").unwrap();

        let err = rename(&mut ctx, &a, "sub/b.txt").unwrap_err();
        assert!(matches!(err, OpError::InvalidName { .. }));
        assert!(a.exists());
    }

    #[test]
    fn test_revert_fails_when_parent_is_gone() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path(), true);
        let from = dir.path().join("gone").join("a.txt");
        let to = dir.path().join("b.txt");
        std::fs::write(&to, "b").unwrap();

        let err = revert_rename(&mut ctx, &from, &to).unwrap_err();
        assert!(matches!(err, OpError::Rename { .. }));
        assert!(to.exists());
    }

    #[test]
    fn test_rename_missing_source() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path(), true);
        let err = rename(&mut ctx, &dir.path().join("nope"), "b").unwrap_err();
        assert!(matches!(err, OpError::Fs(FsError::NotFound { .. })));
    }
}
