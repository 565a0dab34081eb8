//! Client-side pre-save validation.
//!
//! Purely in-memory and synchronous: checks required-field presence and the
//! few formats the console can verify on its own. Anything deeper belongs to
//! the backend.

use serde::{Deserialize, Serialize};

use crate::form::{Control, FieldUnit, FormSurface, InputKind};
use crate::payload::ModuleKind;
use crate::schedule::Schedule;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate every unit of `surface`, returning failures in display order.
pub fn validate_form(surface: &FormSurface) -> Vec<FieldError> {
    let schedule = ModuleKind::of(surface.module()) == ModuleKind::Schedule;
    surface
        .all_units()
        .filter_map(|unit| validate_unit(unit, schedule))
        .collect()
}

fn validate_unit(unit: &FieldUnit, schedule: bool) -> Option<FieldError> {
    let fail = |message: String| Some(FieldError::new(unit.name.clone(), message));

    match &unit.control {
        Control::Input { input, text, .. } => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return if unit.required {
                    fail(format!("{} is required", unit.label))
                } else {
                    None
                };
            }
            match input {
                InputKind::Number if !unit.value().is_number() => {
                    fail(format!("{} must be a number", unit.label))
                }
                InputKind::Json if serde_json::from_str::<serde_json::Value>(trimmed).is_err() => {
                    fail(format!("{} must be valid JSON", unit.label))
                }
                _ if schedule => Schedule::parse(trimmed).err().and_then(|e| fail(e.to_string())),
                _ => None,
            }
        }
        Control::Toggle { .. } => None,
        Control::Select { selected, .. } => {
            if unit.required && selected.is_none() {
                fail(format!("{} is required", unit.label))
            } else {
                None
            }
        }
        Control::PathList(list) => {
            if unit.required && list.is_blank() {
                fail(format!("{} needs at least one directory", unit.label))
            } else {
                None
            }
        }
        Control::ColorList(list) => {
            if unit.required && list.colors().is_empty() {
                fail(format!("{} needs at least one color", unit.label))
            } else {
                None
            }
        }
        Control::ComplexList(list) => {
            if unit.required && list.entries().is_empty() {
                fail(format!("{} needs at least one entry", unit.label))
            } else {
                None
            }
        }
        Control::Instances(selector) => {
            if unit.required && selector.selections().is_empty() {
                return fail("Select at least one instance".to_string());
            }
            let missing = selector.missing();
            if !missing.is_empty() {
                return fail(format!("No longer registered: {}", missing.join(", ")));
            }
            let without = selector.plex_without_libraries();
            if without.is_empty() {
                None
            } else {
                fail(format!(
                    "Select at least one library for: {}",
                    without.join(", ")
                ))
            }
        }
    }
}
