//! HTTP client for the DAPS backend API.
//!
//! - [`ApiClient`] wraps every endpoint the console talks to.
//! - [`types`] holds the request and response bodies.

pub mod api;
pub mod types;

pub use api::{ApiClient, ApiError};
pub use types::{InstanceTest, NotificationTestResult, RunStatus, VersionInfo};
