//! Notification settings: per-type field lists, entry validation, and the
//! atomic update of the `notifications` document.
//!
//! The document is keyed by module, then by notification type:
//!
//! ```json
//! { "poster_renamerr": { "discord": { "webhook": "https://..." } } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::payload::PayloadError;
use crate::schema::{FieldDescriptor, FieldKind};
use crate::validation::FieldError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Email,
    Discord,
    Notifiarr,
}

impl NotificationType {
    pub const ALL: [NotificationType; 3] = [Self::Email, Self::Discord, Self::Notifiarr];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Discord => "discord",
            Self::Notifiarr => "notifiarr",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }

    /// Settings fields for this type, in display order.
    pub fn fields(self) -> Vec<FieldDescriptor> {
        match self {
            Self::Email => vec![
                FieldDescriptor::new("smtp_server", "SMTP Server", FieldKind::Text).required(),
                FieldDescriptor::new("smtp_port", "SMTP Port", FieldKind::Number).required(),
                FieldDescriptor::new("use_tls", "Use TLS", FieldKind::Slider),
                FieldDescriptor::new("username", "Username", FieldKind::Text),
                FieldDescriptor::new("password", "Password", FieldKind::Password),
                FieldDescriptor::new("from", "From", FieldKind::Text).required(),
                FieldDescriptor::new("to", "To", FieldKind::Text)
                    .required()
                    .with_placeholder("Comma separated addresses"),
            ],
            Self::Discord => vec![
                FieldDescriptor::new("webhook", "Webhook URL", FieldKind::Text).required(),
            ],
            Self::Notifiarr => vec![
                FieldDescriptor::new("webhook", "Passthrough Webhook URL", FieldKind::Text)
                    .required(),
                FieldDescriptor::new("channel_id", "Channel ID", FieldKind::Text).required(),
            ],
        }
    }
}

/// One configured notification target of a module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEntry {
    pub module: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub settings: Value,
}

impl NotificationEntry {
    pub fn new(module: impl Into<String>, kind: NotificationType, settings: Value) -> Self {
        Self {
            module: module.into(),
            kind: kind.as_str().to_string(),
            settings,
        }
    }

    /// Check the settings against the per-type field list.
    pub fn validate(&self) -> Vec<FieldError> {
        let Some(kind) = NotificationType::parse(&self.kind) else {
            return vec![FieldError::new("type", format!("Unknown notification type '{}'", self.kind))];
        };
        let Some(settings) = self.settings.as_object() else {
            return vec![FieldError::new("settings", "Settings must be an object")];
        };

        kind.fields()
            .into_iter()
            .filter_map(|field| {
                let value = settings.get(&field.key);
                let blank = match value {
                    None | Some(Value::Null) => true,
                    Some(Value::String(s)) => s.trim().is_empty(),
                    _ => false,
                };
                if field.required && blank {
                    return Some(FieldError::new(field.key, format!("{} is required", field.label)));
                }
                if field.kind == FieldKind::Number && !blank {
                    let numeric = match value {
                        Some(Value::Number(_)) => true,
                        Some(Value::String(s)) => s.trim().parse::<f64>().is_ok(),
                        _ => false,
                    };
                    if !numeric {
                        return Some(FieldError::new(field.key, format!("{} must be a number", field.label)));
                    }
                }
                None
            })
            .collect()
    }

    /// Body of `POST /api/test-notification`: module and type plus every
    /// settings field at the top level.
    pub fn test_request_body(&self) -> Value {
        let mut body = self.settings.as_object().cloned().unwrap_or_default();
        body.insert("module".to_string(), Value::String(self.module.clone()));
        body.insert("type".to_string(), Value::String(self.kind.clone()));
        Value::Object(body)
    }
}

/// A change to one `(module, type)` slot of the notifications document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum NotificationUpdate {
    Upsert(NotificationEntry),
    Delete { module: String, kind: String },
}

/// Apply `update` to a copy of `current`, replacing the `(module, type)` slot
/// atomically.
///
/// Deleting the last type of a module keeps the module key with an empty
/// object.
pub fn apply_update(current: &Value, update: &NotificationUpdate) -> Result<Map<String, Value>, PayloadError> {
    let (module, kind, settings) = match update {
        NotificationUpdate::Upsert(entry) => (&entry.module, &entry.kind, Some(&entry.settings)),
        NotificationUpdate::Delete { module, kind } => (module, kind, None),
    };

    let mut missing = Vec::new();
    if module.trim().is_empty() {
        missing.push("module".to_string());
    }
    if kind.trim().is_empty() {
        missing.push("type".to_string());
    } else if NotificationType::parse(kind).is_none() {
        missing.push(format!("type '{kind}' (unknown)"));
    }
    if let Some(settings) = settings {
        if !settings.is_object() {
            missing.push("settings (not an object)".to_string());
        }
    }
    let mut map = match current {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        _ => {
            missing.push("notifications (not an object)".to_string());
            Map::new()
        }
    };
    if let Some(existing) = map.get(module.as_str()) {
        if !existing.is_object() {
            missing.push(format!("notifications.{module} (not an object)"));
        }
    }
    if !missing.is_empty() {
        return Err(PayloadError::MissingLinkage { missing });
    }

    let slot = map
        .entry(module.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(types) = slot {
        match settings {
            Some(settings) => {
                types.insert(kind.clone(), settings.clone());
            }
            None => {
                types.remove(kind.as_str());
            }
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn deleting_last_type_keeps_empty_module() {
        let current = json!({ "poster_renamerr": { "discord": { "webhook": "https://x" } } });
        let map = apply_update(
            &current,
            &NotificationUpdate::Delete {
                module: "poster_renamerr".into(),
                kind: "discord".into(),
            },
        )
        .unwrap();
        assert_eq!(Value::Object(map), json!({ "poster_renamerr": {} }));
    }

    #[test]
    fn upsert_replaces_only_its_slot() {
        let current = json!({
            "nohl": { "discord": { "webhook": "old" }, "email": { "smtp_server": "mail" } }
        });
        let entry = NotificationEntry::new("nohl", NotificationType::Discord, json!({ "webhook": "new" }));
        let map = apply_update(&current, &NotificationUpdate::Upsert(entry)).unwrap();
        assert_eq!(
            Value::Object(map),
            json!({ "nohl": { "discord": { "webhook": "new" }, "email": { "smtp_server": "mail" } } })
        );
    }

    #[test]
    fn upsert_creates_module_and_tolerates_null_document() {
        let entry = NotificationEntry::new("jduparr", NotificationType::Discord, json!({ "webhook": "w" }));
        let map = apply_update(&Value::Null, &NotificationUpdate::Upsert(entry)).unwrap();
        assert_eq!(Value::Object(map), json!({ "jduparr": { "discord": { "webhook": "w" } } }));
    }

    #[test]
    fn missing_linkage_lists_every_piece() {
        let entry = NotificationEntry {
            module: String::new(),
            kind: String::new(),
            settings: json!("nope"),
        };
        assert_matches!(
            apply_update(&json!({}), &NotificationUpdate::Upsert(entry)),
            Err(PayloadError::MissingLinkage { missing })
                if missing == vec!["module", "type", "settings (not an object)"]
        );
    }

    #[test]
    fn non_object_module_entry_is_reported() {
        let current = json!({ "nohl": ["discord"] });
        assert_matches!(
            apply_update(
                &current,
                &NotificationUpdate::Delete { module: "nohl".into(), kind: "discord".into() }
            ),
            Err(PayloadError::MissingLinkage { missing })
                if missing == vec!["notifications.nohl (not an object)"]
        );
    }

    #[test]
    fn entry_validation_uses_type_fields() {
        let entry = NotificationEntry::new(
            "nohl",
            NotificationType::Email,
            json!({ "smtp_server": "mail", "smtp_port": "abc", "from": "a@b" }),
        );
        let fields: Vec<String> = entry.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["smtp_port", "to"]);

        let ok = NotificationEntry::new(
            "nohl",
            NotificationType::Notifiarr,
            json!({ "webhook": "https://n", "channel_id": "123" }),
        );
        assert!(ok.validate().is_empty());
    }

    #[test]
    fn test_body_flattens_settings() {
        let entry = NotificationEntry::new("nohl", NotificationType::Discord, json!({ "webhook": "w" }));
        assert_eq!(
            entry.test_request_body(),
            json!({ "webhook": "w", "module": "nohl", "type": "discord" })
        );
    }
}
