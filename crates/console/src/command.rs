//! Messages into the console loop.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::oneshot;

use daps_client::{ApiError, InstanceTest, NotificationTestResult, VersionInfo};
use daps_core::form::{FieldEdit, FormSurface};
use daps_core::notifications::{NotificationEntry, NotificationUpdate};
use daps_core::save::SaveState;
use daps_core::state::{SaveRequest, UnsavedChoice};

use crate::view::View;

/// A user intent. This is what a shell sends for clicks and keystrokes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Navigate { view: View },
    ResolveUnsaved { choice: UnsavedChoice },
    Edit { generation: u64, edit: FieldEdit },
    Save,
    Discard,
    TestInstance { test: InstanceTest },
    SaveInstances { instances: Map<String, Value> },
    TestNotification { entry: NotificationEntry },
    UpdateNotification { update: NotificationUpdate },
    RunModule { module: String, open_logs: bool },
    CancelRun { module: String },
    Shutdown,
}

/// An action that can be in flight. Repeats are ignored until it settles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Save,
    SaveInstances,
    SaveNotifications,
    TestInstance { name: String },
    TestNotification { module: String, kind: String },
    Run { module: String },
    Cancel { module: String },
    LoadLibraries { instance: String },
}

/// Read-only view of the console state.
#[derive(Debug, Clone, Serialize)]
pub struct ConsoleSnapshot {
    pub view: Option<View>,
    pub dirty: bool,
    pub save_state: SaveState,
    pub form: Option<FormSurface>,
    pub document: Value,
    pub in_flight: Vec<Action>,
    pub polling: Vec<String>,
}

pub(crate) enum Request {
    Command(Command),
    Inspect(oneshot::Sender<ConsoleSnapshot>),
}

/// Results of spawned work, routed back into the loop.
pub(crate) enum Internal {
    ConfigLoaded {
        view: View,
        document: Value,
    },
    Saved {
        request: SaveRequest,
        result: Result<Value, Option<String>>,
    },
    DocumentSaved {
        action: Action,
        body: Value,
        result: Result<(), ApiError>,
    },
    InstanceTested {
        name: String,
        result: Result<(), ApiError>,
    },
    NotificationTested {
        module: String,
        kind: String,
        result: Result<NotificationTestResult, ApiError>,
    },
    RunStarted {
        module: String,
        open_logs: bool,
        result: Result<(), ApiError>,
    },
    RunCancelled {
        module: String,
        result: Result<(), ApiError>,
    },
    LibrariesLoaded {
        generation: u64,
        key: String,
        instance: String,
        result: Result<Vec<String>, ApiError>,
    },
    RunStatus {
        module: String,
        running: bool,
    },
    VersionChecked {
        info: VersionInfo,
    },
}
