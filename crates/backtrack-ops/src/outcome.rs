//! Result values handed back to the UI.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::Display;

use backtrack_core::{CommandKind, OpError};

/// Which engine entry point produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum OutcomeKind {
    Apply,
    Undo,
    Redo,
}

/// How a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum OutcomeStatus {
    /// The filesystem changed and the stacks were updated.
    Completed,
    /// Undo or redo on an empty stack.
    #[strum(to_string = "Nothing to do")]
    NothingToDo,
    /// The user declined a confirmation.
    Cancelled,
    /// An error occurred; the stacks are unchanged.
    Failed,
}

/// Result of a single apply, undo or redo request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    /// The request that produced this outcome.
    pub kind: OutcomeKind,
    /// The command kind involved, if any.
    pub operation: Option<CommandKind>,
    /// How the request ended.
    pub status: OutcomeStatus,
    /// Description on success, error message on failure.
    pub message: Option<String>,
    /// The path most relevant to the user (new item, restored item).
    pub path: Option<PathBuf>,
}

impl OperationOutcome {
    /// A completed request.
    pub fn completed(
        kind: OutcomeKind,
        operation: CommandKind,
        message: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            kind,
            operation: Some(operation),
            status: OutcomeStatus::Completed,
            message: Some(message.into()),
            path: Some(path.into()),
        }
    }

    /// Undo or redo with an empty stack.
    pub fn nothing(kind: OutcomeKind) -> Self {
        Self {
            kind,
            operation: None,
            status: OutcomeStatus::NothingToDo,
            message: None,
            path: None,
        }
    }

    /// A failed or declined request.
    pub fn from_error(kind: OutcomeKind, operation: Option<CommandKind>, error: &OpError) -> Self {
        let status = if error.is_cancelled() {
            OutcomeStatus::Cancelled
        } else {
            OutcomeStatus::Failed
        };
        Self {
            kind,
            operation,
            status,
            message: Some(error.to_string()),
            path: None,
        }
    }

    /// Check if the request completed or had nothing to do.
    pub fn is_success(&self) -> bool {
        matches!(
            self.status,
            OutcomeStatus::Completed | OutcomeStatus::NothingToDo
        )
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == OutcomeStatus::Cancelled
    }

    /// The error message, if the request failed.
    pub fn error(&self) -> Option<&str> {
        match self.status {
            OutcomeStatus::Failed => self.message.as_deref(),
            _ => None,
        }
    }

    /// Get a human-readable summary of the outcome.
    pub fn summary(&self) -> String {
        let action = match self.kind {
            OutcomeKind::Apply => "",
            OutcomeKind::Undo => "Undo: ",
            OutcomeKind::Redo => "Redo: ",
        };

        match (self.status, &self.message) {
            (OutcomeStatus::NothingToDo, _) => match self.kind {
                OutcomeKind::Undo => "Nothing to undo".to_string(),
                OutcomeKind::Redo => "Nothing to redo".to_string(),
                OutcomeKind::Apply => "Nothing to do".to_string(),
            },
            (OutcomeStatus::Failed, Some(message)) => format!("{action}failed: {message}"),
            (_, Some(message)) => format!("{action}{message}"),
            (status, None) => format!("{action}{status}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backtrack_core::FsError;

    #[test]
    fn test_summary() {
        let outcome = OperationOutcome::completed(
            OutcomeKind::Undo,
            CommandKind::Rename,
            "Rename back to 'a.txt'",
            "/tmp/a.txt",
        );
        assert!(outcome.is_success());
        assert_eq!(outcome.summary(), "Undo: Rename back to 'a.txt'");

        assert_eq!(
            OperationOutcome::nothing(OutcomeKind::Redo).summary(),
            "Nothing to redo"
        );
    }

    #[test]
    fn test_from_error() {
        let cancelled = OperationOutcome::from_error(
            OutcomeKind::Apply,
            Some(CommandKind::Delete),
            &OpError::Cancelled,
        );
        assert!(cancelled.is_cancelled());
        assert!(!cancelled.is_success());
        assert!(cancelled.error().is_none());

        let failed = OperationOutcome::from_error(
            OutcomeKind::Apply,
            Some(CommandKind::Copy),
            &OpError::from(FsError::NotFound {
                path: "/tmp/missing".into(),
            }),
        );
        assert_eq!(failed.status, OutcomeStatus::Failed);
        assert!(failed.error().unwrap().contains("/tmp/missing"));
        assert!(failed.summary().starts_with("failed: "));
    }
}
