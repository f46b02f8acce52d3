//! Input manipulation actions.

use std::mem::discriminant;

/// An editing action dispatched to the input state.
///
/// Navigation actions carry a `select` flag (extend the selection instead of
/// resetting it); insertions carry the text to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Move cursor one position to the left
    Left { select: bool },
    /// Move cursor one position to the right
    Right { select: bool },
    /// Move backward one word
    LeftWord { select: bool },
    /// Move forward one word
    RightWord { select: bool },
    /// Move to the beginning of the line
    Home { select: bool },
    /// Move to the end of the line
    End { select: bool },
    /// Enter (or advance) incremental search to the right
    SearchRight,
    /// Enter (or advance) incremental search to the left
    SearchLeft,
    /// Extend the selection lexically
    SelectUp,
    /// Shrink the selection, reversing the last extension step
    SelectDown,
    /// Copy the selection to the clipboard
    Copy,
    /// Cut the selection to the clipboard
    Cut,
    /// Paste the clipboard at the cursor
    Paste,
    /// History previous
    Prev,
    /// History next
    Next,
    /// Insert text at the cursor
    Insert(String),
    /// Replace the text before the cursor with a completion
    Complete(String),
    /// Delete the character (or selection) at the cursor
    Delete,
    /// Delete the word after the cursor
    DeleteWord,
    /// Delete the character (or selection) before the cursor
    Backspace,
    /// Delete the word before the cursor
    BackspaceWord,
    /// Kill to the end of the line
    KillEol,
    /// Clear selection, search, filter or line, in that order
    Escape,
    /// Undo the last group of changes
    Undo,
    /// Redo the last undone group of changes
    Redo,
    /// Emacs-style undo (rotates through a single history)
    UndoEmacs,
    /// Dynamic abbreviation expansion from the command history
    Expand,
    /// Toggle overwrite mode
    ToggleOverwrite,
}

impl Action {
    /// Actions that insert text.
    pub fn is_insert(&self) -> bool {
        matches!(self, Action::Insert(_) | Action::Complete(_) | Action::Expand)
    }

    /// Actions that remove text.
    pub fn is_delete(&self) -> bool {
        matches!(
            self,
            Action::Delete
                | Action::DeleteWord
                | Action::Backspace
                | Action::BackspaceWord
                | Action::KillEol
        )
    }

    /// Actions that always open a new undo group.
    pub fn is_batch(&self) -> bool {
        matches!(
            self,
            Action::DeleteWord
                | Action::BackspaceWord
                | Action::KillEol
                | Action::Cut
                | Action::Copy
                | Action::Paste
                | Action::Escape
        )
    }

    /// Whether two actions are of the same kind, ignoring payloads.
    pub fn same_kind(&self, other: &Action) -> bool {
        discriminant(self) == discriminant(other)
    }
}
