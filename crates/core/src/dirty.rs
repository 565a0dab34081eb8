//! Dirty-state tracking for the open form.
//!
//! The tracker never navigates. It only answers whether leaving the current
//! view is safe, and the navigation layer decides what to do with that.

/// Answer to "may I leave the current view?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationCheck {
    Proceed,
    /// Unsaved edits exist; the unsaved-changes prompt must be shown.
    ConfirmRequired,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtyTracker {
    dirty: bool,
    ignore_next: bool,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Raised by any edit or structural change.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    pub fn discard(&mut self) {
        self.dirty = false;
    }

    /// Let exactly the next [`check_navigation`](Self::check_navigation)
    /// through, for programmatic transitions such as opening the logs after
    /// starting a run.
    pub fn ignore_next_check(&mut self) {
        self.ignore_next = true;
    }

    pub fn check_navigation(&mut self) -> NavigationCheck {
        if std::mem::take(&mut self.ignore_next) || !self.dirty {
            NavigationCheck::Proceed
        } else {
            NavigationCheck::ConfirmRequired
        }
    }
}
