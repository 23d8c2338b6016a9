//! Confirmation capability supplied by the UI.

use crate::conflict::Conflict;

/// Synchronous decision point for overwrite, replace and delete prompts.
///
/// Called strictly before any mutation; returning `false` abandons the
/// operation.
pub trait Confirm: Send {
    /// Ask the user about `conflict`.
    fn confirm(&mut self, conflict: &Conflict) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&Conflict) -> bool + Send,
{
    fn confirm(&mut self, conflict: &Conflict) -> bool {
        self(conflict)
    }
}

/// Accepts every prompt.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&mut self, _conflict: &Conflict) -> bool {
        true
    }
}

/// Declines every prompt.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverConfirm;

impl Confirm for NeverConfirm {
    fn confirm(&mut self, _conflict: &Conflict) -> bool {
        false
    }
}
