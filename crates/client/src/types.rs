//! Wire types for the backend API.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/config` responses.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `POST /api/test-instance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceTest {
    pub service: String,
    pub name: String,
    pub url: String,
    pub api: String,
}

/// Raw `POST /api/test-notification` response. Older backends answer with
/// `success`/`error`, newer ones with `ok`/`message`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NotificationTestResponse {
    #[serde(default, alias = "success")]
    pub ok: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationTestResult {
    pub ok: bool,
    pub message: Option<String>,
}

impl From<NotificationTestResponse> for NotificationTestResult {
    fn from(raw: NotificationTestResponse) -> Self {
        Self {
            ok: raw.ok,
            message: raw.message.or(raw.error),
        }
    }
}

/// Body of `GET /api/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    #[serde(default)]
    pub running: bool,
}

/// Body of `GET /api/version`: the running backend release and, when the
/// backend knows it, the newest published one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    #[serde(default)]
    pub latest: Option<String>,
}
