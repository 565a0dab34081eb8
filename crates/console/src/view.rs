use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A top-level screen of the console.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum View {
    /// Settings form for one module, including `schedule`.
    Module { key: String },
    Instances,
    Notifications,
    Logs { module: Option<String> },
}

impl View {
    pub fn module(key: impl Into<String>) -> Self {
        Self::Module { key: key.into() }
    }

    /// Module whose form this view shows.
    pub fn module_key(&self) -> Option<&str> {
        match self {
            Self::Module { key } => Some(key.as_str()),
            _ => None,
        }
    }

    /// Whether entering this view reloads the config document.
    pub fn needs_config(&self) -> bool {
        !matches!(self, Self::Logs { .. })
    }
}

/// Route-style rendering, e.g. `module/nohl` or `logs/nohl`.
impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module { key } => write!(f, "module/{key}"),
            Self::Instances => f.write_str("instances"),
            Self::Notifications => f.write_str("notifications"),
            Self::Logs { module: None } => f.write_str("logs"),
            Self::Logs { module: Some(m) } => write!(f, "logs/{m}"),
        }
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some(("module", key)) if !key.is_empty() => Ok(Self::module(key)),
            Some(("logs", module)) if !module.is_empty() => Ok(Self::Logs {
                module: Some(module.to_string()),
            }),
            None if s == "instances" => Ok(Self::Instances),
            None if s == "notifications" => Ok(Self::Notifications),
            None if s == "logs" => Ok(Self::Logs { module: None }),
            _ => Err(format!("Unknown view '{s}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_strings_parse_back() {
        for view in [
            View::module("nohl"),
            View::Instances,
            View::Notifications,
            View::Logs { module: None },
            View::Logs { module: Some("jduparr".into()) },
        ] {
            assert_eq!(view.to_string().parse::<View>().unwrap(), view);
        }
        assert!("module/".parse::<View>().is_err());
        assert!("settings".parse::<View>().is_err());
    }
}
