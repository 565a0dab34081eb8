//! Payload builder: turns edited module state into the exact JSON body that
//! `POST /api/config` expects.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::notifications::NotificationType;
use crate::schema::ServiceKind;

// ---------------------------------------------------------------------------
// Module kinds
// ---------------------------------------------------------------------------

pub const SCHEDULE_KEY: &str = "schedule";
pub const NOTIFICATIONS_KEY: &str = "notifications";
pub const INSTANCES_KEY: &str = "instances";

/// How a module's config is shaped on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleKind {
    /// `{ key: config }` verbatim.
    Flat(String),
    Schedule,
    Notifications,
    Instances,
}

impl ModuleKind {
    pub fn of(key: &str) -> Self {
        match key {
            SCHEDULE_KEY => Self::Schedule,
            NOTIFICATIONS_KEY => Self::Notifications,
            INSTANCES_KEY => Self::Instances,
            other => Self::Flat(other.to_string()),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Self::Flat(key) => key,
            Self::Schedule => SCHEDULE_KEY,
            Self::Notifications => NOTIFICATIONS_KEY,
            Self::Instances => INSTANCES_KEY,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// Linkage data needed to place the edit in the document is absent or
    /// malformed. `missing` names each piece.
    #[error("Missing or malformed: {}", .missing.join(", "))]
    MissingLinkage { missing: Vec<String> },

    /// The server value of an edited schedule changed since it was loaded.
    #[error("Schedule changed on the server since it was loaded: {}", .modules.join(", "))]
    StaleSchedule { modules: Vec<String> },
}

/// What to do when the server schedule changed underneath an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// The edit overwrites the server value for that module.
    #[default]
    LastWriteWins,
    /// Refuse to save; the user must reload.
    RejectStale,
}

/// Extra state some module kinds need to build their payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadContext<'a> {
    /// Config as it was when the form was loaded.
    pub snapshot: Option<&'a Map<String, Value>>,
    /// Server schedule fetched immediately before saving.
    pub latest_schedule: Option<&'a Map<String, Value>>,
    pub conflict_policy: ConflictPolicy,
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Build the `POST /api/config` body for `kind`.
pub fn build(kind: &ModuleKind, edited: &Map<String, Value>, ctx: &PayloadContext<'_>) -> Result<Value, PayloadError> {
    match kind {
        ModuleKind::Flat(key) => Ok(wrap(key, Value::Object(edited.clone()))),
        ModuleKind::Schedule => {
            let mut missing = Vec::new();
            if ctx.latest_schedule.is_none() {
                missing.push("latest server schedule".to_string());
            }
            if ctx.snapshot.is_none() {
                missing.push("loaded schedule snapshot".to_string());
            }
            match (ctx.latest_schedule, ctx.snapshot) {
                (Some(latest), Some(snapshot)) => {
                    let merged = merge_schedule(latest, snapshot, edited, ctx.conflict_policy)?;
                    Ok(wrap(SCHEDULE_KEY, Value::Object(merged)))
                }
                _ => Err(PayloadError::MissingLinkage { missing }),
            }
        }
        ModuleKind::Notifications => {
            check_notifications(edited)?;
            Ok(wrap(NOTIFICATIONS_KEY, Value::Object(edited.clone())))
        }
        ModuleKind::Instances => {
            check_instances(edited)?;
            Ok(wrap(INSTANCES_KEY, Value::Object(edited.clone())))
        }
    }
}

fn wrap(key: &str, value: Value) -> Value {
    let mut body = Map::new();
    body.insert(key.to_string(), value);
    Value::Object(body)
}

/// Overlay the modules edited since `snapshot` onto `latest`.
///
/// Only keys whose edited value differs from the snapshot are written, so
/// schedule changes saved elsewhere for other modules survive.
pub fn merge_schedule(
    latest: &Map<String, Value>,
    snapshot: &Map<String, Value>,
    edited: &Map<String, Value>,
    policy: ConflictPolicy,
) -> Result<Map<String, Value>, PayloadError> {
    let normalize = |v: Option<&Value>| match v {
        None | Some(Value::Null) => Value::Null,
        Some(Value::String(s)) if s.trim().is_empty() => Value::Null,
        Some(Value::String(s)) => Value::String(s.trim().to_string()),
        Some(other) => other.clone(),
    };

    let changed: Vec<(&String, Value)> = edited
        .iter()
        .map(|(k, v)| (k, normalize(Some(v))))
        .filter(|(k, v)| *v != normalize(snapshot.get(k.as_str())))
        .collect();

    if policy == ConflictPolicy::RejectStale {
        let stale: Vec<String> = changed
            .iter()
            .filter(|(k, v)| {
                let server = normalize(latest.get(k.as_str()));
                server != normalize(snapshot.get(k.as_str())) && server != *v
            })
            .map(|(k, _)| k.to_string())
            .collect();
        if !stale.is_empty() {
            return Err(PayloadError::StaleSchedule { modules: stale });
        }
    }

    let mut merged = latest.clone();
    for (key, value) in changed {
        merged.insert(key.clone(), value);
    }
    Ok(merged)
}

/// Every module entry must be an object of known notification types, each
/// holding an object of settings.
fn check_notifications(map: &Map<String, Value>) -> Result<(), PayloadError> {
    let mut missing = Vec::new();
    for (module, types) in map {
        let Some(types) = types.as_object() else {
            missing.push(format!("notifications.{module} (not an object)"));
            continue;
        };
        for (kind, settings) in types {
            if NotificationType::parse(kind).is_none() {
                missing.push(format!("notifications.{module}.{kind} (unknown type)"));
            } else if !settings.is_object() {
                missing.push(format!("notifications.{module}.{kind} (not an object)"));
            }
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PayloadError::MissingLinkage { missing })
    }
}

/// Every registered instance needs a `url` and an `api` key.
fn check_instances(map: &Map<String, Value>) -> Result<(), PayloadError> {
    let mut missing = Vec::new();
    for (service, instances) in map {
        if ServiceKind::parse(service).is_none() {
            missing.push(format!("instances.{service} (unknown service)"));
            continue;
        }
        let Some(instances) = instances.as_object() else {
            missing.push(format!("instances.{service} (not an object)"));
            continue;
        };
        for (name, instance) in instances {
            for field in ["url", "api"] {
                let present = instance
                    .get(field)
                    .and_then(Value::as_str)
                    .is_some_and(|s| !s.trim().is_empty());
                if !present {
                    missing.push(format!("instances.{service}.{name}.{field}"));
                }
            }
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PayloadError::MissingLinkage { missing })
    }
}
