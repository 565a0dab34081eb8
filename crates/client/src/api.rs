//! REST client for the backend configuration and run-control endpoints.

use std::time::Duration;

use serde_json::{Map, Value};

use crate::types::{
    InstanceTest, NotificationTestResponse, NotificationTestResult, RunStatus, SaveResponse,
    VersionInfo,
};

/// Errors from the backend API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code. `message` is the body's
    /// `error` field when present, otherwise the raw body.
    #[error("Backend error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The backend answered 2xx but reported `success: false`.
    #[error("Backend rejected the request: {}", .message.as_deref().unwrap_or("no reason given"))]
    Rejected { message: Option<String> },
}

impl ApiError {
    /// The message the backend itself supplied, if any.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } if !message.trim().is_empty() => Some(message.as_str()),
            Self::Rejected { message } => message.as_deref().filter(|m| !m.trim().is_empty()),
            _ => None,
        }
    }
}

/// HTTP client for one backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// * `base_url` - e.g. `http://127.0.0.1:8000`, without the `/api` suffix.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{path}", self.base_url)
    }

    /// `GET /api/config`.
    pub async fn get_config(&self) -> Result<Value, ApiError> {
        let response = self.client.get(self.url("config")).send().await?;
        Self::parse_response(response).await
    }

    /// `GET /api/config`, degrading to an empty document on any failure.
    pub async fn fetch_config(&self) -> Value {
        match self.get_config().await {
            Ok(document @ Value::Object(_)) => document,
            Ok(other) => {
                tracing::warn!(kind = json_kind(&other), "Config document is not an object, using empty config");
                Value::Object(Map::new())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch config, using empty config");
                Value::Object(Map::new())
            }
        }
    }

    /// `POST /api/config` with a `{ key: value, .. }` body.
    pub async fn save_config(&self, body: &Value) -> Result<(), ApiError> {
        let response = self.client.post(self.url("config")).json(body).send().await?;
        let saved: SaveResponse = Self::parse_response(response).await?;
        if saved.success {
            Ok(())
        } else {
            Err(ApiError::Rejected {
                message: saved.error,
            })
        }
    }

    /// `POST /api/test-instance`.
    pub async fn test_instance(&self, test: &InstanceTest) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("test-instance"))
            .json(test)
            .send()
            .await?;
        Self::check_status(response).await
    }

    /// `POST /api/test-notification`. A non-2xx answer still carries a result
    /// body, so it is decoded rather than turned into an error when possible.
    pub async fn test_notification(&self, body: &Value) -> Result<NotificationTestResult, ApiError> {
        let response = self
            .client
            .post(self.url("test-notification"))
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        match serde_json::from_str::<NotificationTestResponse>(&text) {
            Ok(raw) => {
                let mut result = NotificationTestResult::from(raw);
                result.ok &= status.is_success();
                Ok(result)
            }
            Err(_) if !status.is_success() => Err(ApiError::Api {
                status: status.as_u16(),
                message: error_message(&text),
            }),
            Err(_) => Ok(NotificationTestResult {
                ok: true,
                message: None,
            }),
        }
    }

    /// `GET /api/status?module=<name>`.
    pub async fn status(&self, module: &str) -> Result<RunStatus, ApiError> {
        let response = self
            .client
            .get(self.url("status"))
            .query(&[("module", module)])
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `POST /api/run`.
    pub async fn run(&self, module: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("run"))
            .json(&serde_json::json!({ "module": module }))
            .send()
            .await?;
        Self::check_status(response).await
    }

    /// `POST /api/cancel`.
    pub async fn cancel(&self, module: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("cancel"))
            .json(&serde_json::json!({ "module": module }))
            .send()
            .await?;
        Self::check_status(response).await
    }

    /// `GET /api/plex/libraries?instance=<name>`.
    pub async fn plex_libraries(&self, instance: &str) -> Result<Vec<String>, ApiError> {
        let response = self
            .client
            .get(self.url("plex/libraries"))
            .query(&[("instance", instance)])
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `GET /api/version`.
    pub async fn version(&self) -> Result<VersionInfo, ApiError> {
        let response = self.client.get(self.url("version")).send().await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Turn a non-2xx response into [`ApiError::Api`], keeping the body's
    /// `error` field as the message.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::debug!(status = status.as_u16(), body = %body, "Backend returned an error status");
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        Ok(response)
    }

    /// Check the status, then decode the JSON body as `T`.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Check the status and drop the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

/// The `error` field of a JSON error body, or the body itself.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
