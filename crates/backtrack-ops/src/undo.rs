//! Undo and redo history for file operations.

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use backtrack_core::{Command, DEFAULT_MAX_HISTORY};

/// An entry in the operation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unique ID for this entry.
    pub id: u64,
    /// When the command was last executed.
    pub timestamp: DateTime<Local>,
    /// The executed command, holding everything needed to invert it.
    pub command: Command,
    /// Human-readable description.
    pub description: String,
}

impl LogEntry {
    /// Create a new log entry.
    pub fn new(id: u64, command: Command) -> Self {
        let description = command.description();
        Self {
            id,
            timestamp: Local::now(),
            command,
            description,
        }
    }

    /// Get a description of how to undo this entry.
    pub fn undo_description(&self) -> String {
        self.command.undo_description()
    }
}

/// Undo and redo stacks with a bounded undo depth.
///
/// The log never touches the filesystem. Entries it drops are handed back to
/// the caller so their backups can be discarded.
#[derive(Debug)]
pub struct OperationLog {
    undo: VecDeque<LogEntry>,
    redo: Vec<LogEntry>,
    max_entries: usize,
    next_id: u64,
}

impl Default for OperationLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl OperationLog {
    /// Create a new log with the specified maximum undo depth.
    pub fn new(max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            undo: VecDeque::with_capacity(max_entries.min(1000)),
            redo: Vec::new(),
            max_entries,
            next_id: 0,
        }
    }

    /// Maximum number of undoable entries.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Record a freshly applied command.
    ///
    /// Clears the redo stack. Returns the new entry ID and every entry that
    /// fell out of the history.
    pub fn record(&mut self, command: Command) -> (u64, Vec<LogEntry>) {
        let id = self.next_id;
        self.next_id += 1;

        let mut dropped: Vec<LogEntry> = self.redo.drain(..).collect();
        dropped.extend(self.push_undo(LogEntry::new(id, command)));

        (id, dropped)
    }

    /// Push onto the undo stack, returning the evicted oldest entry if full.
    pub fn push_undo(&mut self, entry: LogEntry) -> Option<LogEntry> {
        let evicted = if self.undo.len() >= self.max_entries {
            self.undo.pop_front()
        } else {
            None
        };
        self.undo.push_back(entry);
        evicted
    }

    /// Pop the most recent undoable entry.
    pub fn pop_undo(&mut self) -> Option<LogEntry> {
        self.undo.pop_back()
    }

    /// Pop the most recently undone entry.
    pub fn pop_redo(&mut self) -> Option<LogEntry> {
        self.redo.pop()
    }

    /// Push an undone entry onto the redo stack.
    pub fn push_redo(&mut self, entry: LogEntry) {
        self.redo.push(entry);
    }

    /// Put back an entry whose undo failed.
    pub fn restore_undo(&mut self, entry: LogEntry) {
        self.undo.push_back(entry);
    }

    /// Put back an entry whose redo failed.
    pub fn restore_redo(&mut self, entry: LogEntry) {
        self.redo.push(entry);
    }

    /// Peek at the next entry to undo.
    pub fn peek_undo(&self) -> Option<&LogEntry> {
        self.undo.back()
    }

    /// Peek at the next entry to redo.
    pub fn peek_redo(&self) -> Option<&LogEntry> {
        self.redo.last()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Check if both stacks are empty.
    pub fn is_empty(&self) -> bool {
        self.undo.is_empty() && self.redo.is_empty()
    }

    /// Iterate undoable entries, oldest first.
    pub fn iter_undo(&self) -> impl Iterator<Item = &LogEntry> {
        self.undo.iter()
    }

    /// Iterate redoable entries, next to redo last.
    pub fn iter_redo(&self) -> impl Iterator<Item = &LogEntry> {
        self.redo.iter()
    }

    /// Clear both stacks, returning the removed entries.
    pub fn clear(&mut self) -> Vec<LogEntry> {
        let mut removed: Vec<LogEntry> = self.undo.drain(..).collect();
        removed.append(&mut self.redo);
        removed
    }
}
