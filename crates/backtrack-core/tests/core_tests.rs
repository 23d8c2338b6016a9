use backtrack_core::{
    BackupError, BackupRef, Command, CommandKind, EngineConfig, EntryKind, EntryMetadata,
    OpError,
};
use chrono::Local;
use std::path::PathBuf;

fn backup(original: &str) -> BackupRef {
    BackupRef {
        id: 7,
        location: PathBuf::from("/tmp/filebrowser-undo-backups/session/0007-x"),
        original: PathBuf::from(original),
        kind: EntryKind::File,
        size: 12,
        created: Local::now(),
    }
}

#[test]
fn test_user_facing_messages() {
    let err = OpError::SelfContainment {
        folder: "/a".into(),
        destination: "/a/b".into(),
    };
    assert_eq!(
        err.to_string(),
        "Cannot copy or move a folder into itself or its descendants"
    );
    assert!(err.is_safety_violation());

    let err = OpError::ReplaceOwnContents {
        item: "/a/a".into(),
        target: "/a".into(),
    };
    assert_eq!(
        err.to_string(),
        "Cannot replace a folder with one of its own contents"
    );

    let err = OpError::from(BackupError::Missing {
        backup: "/tmp/gone".into(),
    });
    assert!(err.to_string().starts_with("Cannot undo: backup missing"));
    assert!(!err.is_cancelled());
    assert!(OpError::Cancelled.is_cancelled());
}

#[test]
fn test_command_accessors() {
    let cmd = Command::Copy {
        source: "/x/a.txt".into(),
        target: "/y/a.txt".into(),
        replaced: Some(backup("/y/a.txt")),
    };
    assert_eq!(cmd.kind(), CommandKind::Copy);
    assert!(cmd.is_replace());
    assert_eq!(cmd.result_path(), PathBuf::from("/y/a.txt"));
    assert_eq!(cmd.backups().len(), 1);

    let cmd = Command::Delete {
        path: "/x/a.txt".into(),
        backup: backup("/x/a.txt"),
    };
    assert!(!cmd.is_replace());
    assert!(cmd.replaced().is_none());
    assert_eq!(cmd.backups().len(), 1);
    assert_eq!(cmd.description(), "Deleted 'a.txt'");
}

#[test]
fn test_command_kind_display() {
    assert_eq!(CommandKind::CreateFolder.to_string(), "Create folder");
    assert_eq!(CommandKind::Move.to_string(), "Move");
}

#[test]
fn test_entry_metadata_from_std() {
    let dir = tempfile::TempDir::new().unwrap();
    let file = dir.path().join("f.txt");
    std::fs::write(&file, "12345").unwrap();

    let meta = EntryMetadata::from(&std::fs::symlink_metadata(&file).unwrap());
    assert!(meta.is_file());
    assert_eq!(meta.len, 5);

    let meta = EntryMetadata::from(&std::fs::symlink_metadata(dir.path()).unwrap());
    assert!(meta.is_dir());
}

#[test]
fn test_config_toml_round_trip() {
    let config = EngineConfig::builder()
        .backup_root("/var/tmp/backtrack")
        .max_history(10usize)
        .purge_on_exit(false)
        .build()
        .unwrap();

    let text = config.to_toml().unwrap();
    assert!(text.contains("max_history = 10"));
    assert_eq!(toml::from_str::<EngineConfig>(&text).unwrap(), config);
}
