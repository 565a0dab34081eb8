use daps_client::ApiError;
use daps_core::payload::PayloadError;
use daps_core::CoreError;

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Console loop has shut down")]
    Closed,
}

impl ConsoleError {
    /// Text for an error toast. Backend failures show the backend's own
    /// message when it sent one.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(e) => e
                .backend_message()
                .map(str::to_string)
                .unwrap_or_else(|| e.to_string()),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_message_wins_over_status_text() {
        let err = ConsoleError::from(ApiError::Api {
            status: 400,
            message: "bad url".into(),
        });
        assert_eq!(err.user_message(), "bad url");

        let rejected = ConsoleError::from(ApiError::Rejected { message: None });
        assert_eq!(rejected.user_message(), "Backend rejected the request: no reason given");
    }

    #[test]
    fn wrapped_errors_keep_their_text() {
        let err = ConsoleError::from(CoreError::UnknownModule("nope".into()));
        assert_eq!(err.user_message(), CoreError::UnknownModule("nope".into()).to_string());

        let err = ConsoleError::from(ConfigError::Invalid {
            var: "DAPS_API_URL",
            value: "daps".into(),
        });
        assert_eq!(err.user_message(), "Invalid value for DAPS_API_URL: 'daps'");
    }
}
