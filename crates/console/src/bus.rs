//! Feedback channel from the console loop to whatever shell embeds it.
//!
//! [`EventBus`] fans [`UiEvent`]s out over a `tokio::sync::broadcast`
//! channel. The loop never waits on subscribers.

use serde::Serialize;
use tokio::sync::broadcast;

use daps_core::form::PendingRemoval;
use daps_core::save::SaveState;

use crate::view::View;

// ---------------------------------------------------------------------------
// Toast
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastLevel {
    Success,
    Info,
    Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Error,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// UiEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UiEvent {
    ViewChanged { view: View },
    /// The config document was (re)fetched for `view`.
    DocumentLoaded { view: View },
    /// A form was (re)assembled; edits must carry this generation.
    FormReady { module: String, generation: u64 },
    /// Libraries for a selected Plex instance arrived.
    FormUpdated { module: String, generation: u64 },
    DirtyChanged { dirty: bool },
    SaveState { state: SaveState },
    ScrollTo { field: String },
    ConfirmUnsaved { target: View },
    ConfirmRemoval { removal: PendingRemoval },
    Toast { toast: Toast },
    ApplyTheme { theme: String },
    RunState { module: String, running: bool },
    /// The update badge. Published when the backend's answer changes.
    Version {
        current: String,
        latest: Option<String>,
        update_available: bool,
    },
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<UiEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: UiEvent) {
        // Zero receivers is not an error.
        let _ = self.sender.send(event);
    }

    pub fn toast(&self, toast: Toast) {
        self.publish(UiEvent::Toast { toast });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
