use std::str::FromStr;
use std::time::Duration;

use daps_core::payload::ConflictPolicy;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Console configuration loaded from environment variables.
///
/// All fields have defaults suitable for a backend running locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    /// Backend base URL, without the `/api` suffix.
    pub api_url: String,
    pub request_timeout: Duration,
    /// How often a running module's status is polled.
    pub status_poll_interval: Duration,
    pub conflict_policy: ConflictPolicy,
    /// How often the backend version is checked for the update badge.
    /// `None` disables the check.
    pub version_check_interval: Option<Duration>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8000".to_string(),
            request_timeout: Duration::from_secs(30),
            status_poll_interval: Duration::from_millis(2000),
            conflict_policy: ConflictPolicy::LastWriteWins,
            version_check_interval: Some(Duration::from_secs(3600)),
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                 |
    /// |-------------------------------|-------------------------|
    /// | `DAPS_API_URL`                | `http://127.0.0.1:8000` |
    /// | `REQUEST_TIMEOUT_SECS`        | `30`                    |
    /// | `STATUS_POLL_INTERVAL_MS`     | `2000`                  |
    /// | `SCHEDULE_CONFLICT_POLICY`    | `last_write_wins`       |
    /// | `VERSION_CHECK_INTERVAL_SECS` | `3600` (`0` disables)   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let api_url = lookup("DAPS_API_URL")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.api_url);
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                var: "DAPS_API_URL",
                value: api_url,
            });
        }

        let request_timeout = parse_var::<u64>(&lookup, "REQUEST_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let status_poll_interval = parse_var::<u64>(&lookup, "STATUS_POLL_INTERVAL_MS")?
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.status_poll_interval);

        let conflict_policy = match lookup("SCHEDULE_CONFLICT_POLICY") {
            None => defaults.conflict_policy,
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "last_write_wins" => ConflictPolicy::LastWriteWins,
                "reject_stale" => ConflictPolicy::RejectStale,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "SCHEDULE_CONFLICT_POLICY",
                        value: raw,
                    })
                }
            },
        };

        let version_check_interval = match parse_var::<u64>(&lookup, "VERSION_CHECK_INTERVAL_SECS")? {
            None => defaults.version_check_interval,
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
        };

        Ok(Self {
            api_url,
            request_timeout,
            status_poll_interval,
            conflict_policy,
            version_check_interval,
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ConsoleConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ConsoleConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        assert_eq!(load(&[]).unwrap(), ConsoleConfig::default());
    }

    #[test]
    fn values_are_read_and_normalized() {
        let config = load(&[
            ("DAPS_API_URL", "http://daps:8000/"),
            ("REQUEST_TIMEOUT_SECS", "5"),
            ("STATUS_POLL_INTERVAL_MS", "250"),
            ("SCHEDULE_CONFLICT_POLICY", "Reject_Stale"),
        ])
        .unwrap();
        assert_eq!(config.api_url, "http://daps:8000");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.status_poll_interval, Duration::from_millis(250));
        assert_eq!(config.conflict_policy, ConflictPolicy::RejectStale);
        assert_eq!(config.version_check_interval, Some(Duration::from_secs(3600)));
    }

    #[test]
    fn zero_version_interval_disables_the_check() {
        let config = load(&[("VERSION_CHECK_INTERVAL_SECS", "0")]).unwrap();
        assert_eq!(config.version_check_interval, None);
        let config = load(&[("VERSION_CHECK_INTERVAL_SECS", "60")]).unwrap();
        assert_eq!(config.version_check_interval, Some(Duration::from_secs(60)));
    }

    #[test]
    fn invalid_values_name_the_variable() {
        assert_matches!(
            load(&[("REQUEST_TIMEOUT_SECS", "soon")]),
            Err(ConfigError::Invalid { var: "REQUEST_TIMEOUT_SECS", value }) if value == "soon"
        );
        assert_matches!(
            load(&[("SCHEDULE_CONFLICT_POLICY", "merge")]),
            Err(ConfigError::Invalid { var: "SCHEDULE_CONFLICT_POLICY", .. })
        );
        assert_matches!(
            load(&[("DAPS_API_URL", "daps:8000")]),
            Err(ConfigError::Invalid { var: "DAPS_API_URL", .. })
        );
    }
}
