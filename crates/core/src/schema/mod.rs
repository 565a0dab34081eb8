//! Schema registry: the static description of every configurable module.
//!
//! This module is pure data. Rendering lives in [`crate::form`].

pub mod field;
pub mod modules;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::payload::ModuleKind;

pub use field::{FieldDescriptor, FieldKind, ServiceKind};

/// Placeholder shown on every schedule input.
pub const SCHEDULE_PLACEHOLDER: &str = "daily(03:00)";

// ---------------------------------------------------------------------------
// ModuleSchema
// ---------------------------------------------------------------------------

/// Ordered field descriptors for one module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSchema {
    pub key: String,
    pub label: String,
    pub fields: Vec<FieldDescriptor>,
    /// Keys rendered by a dedicated block instead of the generic field list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub handled_elsewhere: Vec<String>,
}

impl ModuleSchema {
    pub fn new(key: impl Into<String>, label: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            fields,
            handled_elsewhere: Vec::new(),
        }
    }

    pub fn handled_elsewhere(mut self, keys: &[&str]) -> Self {
        self.handled_elsewhere = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn field(&self, key: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn is_handled_elsewhere(&self, key: &str) -> bool {
        self.handled_elsewhere.iter().any(|k| k == key)
    }
}

// ---------------------------------------------------------------------------
// SchemaRegistry
// ---------------------------------------------------------------------------

/// Lookup table of module schemas, in navigation order.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    modules: Vec<ModuleSchema>,
    schedule: ModuleSchema,
}

impl SchemaRegistry {
    /// Registry populated with [`modules::standard_modules`].
    pub fn standard() -> Self {
        // The standard table is covered by `standard_registry_is_consistent`.
        Self::build(modules::standard_modules())
    }

    /// Build a registry from caller-supplied schemas, rejecting duplicate
    /// module keys and duplicate field keys within a module.
    pub fn from_modules(modules: Vec<ModuleSchema>) -> Result<Self, CoreError> {
        let mut seen = HashSet::new();
        for module in &modules {
            if !seen.insert(module.key.as_str()) {
                return Err(CoreError::Validation(format!(
                    "Duplicate module key '{}'",
                    module.key
                )));
            }
            if !matches!(ModuleKind::of(&module.key), ModuleKind::Flat(_)) {
                return Err(CoreError::Validation(format!(
                    "Module key '{}' is reserved",
                    module.key
                )));
            }
            check_unique_keys(&module.key, &module.fields)?;
        }
        Ok(Self::build(modules))
    }

    fn build(modules: Vec<ModuleSchema>) -> Self {
        let schedule = schedule_schema(&modules);
        Self { modules, schedule }
    }

    /// All generic modules, in declaration order.
    pub fn modules(&self) -> &[ModuleSchema] {
        &self.modules
    }

    /// Look up a schema by module key. `schedule` resolves to the generated
    /// schedule schema.
    pub fn get(&self, key: &str) -> Option<&ModuleSchema> {
        if key == self.schedule.key {
            return Some(&self.schedule);
        }
        self.modules.iter().find(|m| m.key == key)
    }

    pub fn module(&self, key: &str) -> Result<&ModuleSchema, CoreError> {
        self.get(key)
            .ok_or_else(|| CoreError::UnknownModule(key.to_string()))
    }

    /// Keys of modules that can be run and scheduled.
    pub fn schedulable_modules(&self) -> impl Iterator<Item = &str> {
        self.modules
            .iter()
            .map(|m| m.key.as_str())
            .filter(|k| *k != "main")
    }
}

fn check_unique_keys(module: &str, fields: &[FieldDescriptor]) -> Result<(), CoreError> {
    let mut seen = HashSet::new();
    for field in fields {
        if !seen.insert(field.key.as_str()) {
            return Err(CoreError::Validation(format!(
                "Duplicate field key '{}' in module '{module}'",
                field.key
            )));
        }
        if let FieldKind::ComplexList { fields: nested } = &field.kind {
            check_unique_keys(&format!("{module}.{}", field.key), nested)?;
        }
    }
    Ok(())
}

/// One schedule text field per schedulable module.
fn schedule_schema(modules: &[ModuleSchema]) -> ModuleSchema {
    let fields = modules
        .iter()
        .filter(|m| m.key != "main")
        .map(|m| {
            FieldDescriptor::new(m.key.clone(), m.label.clone(), FieldKind::Text)
                .with_placeholder(SCHEDULE_PLACEHOLDER)
        })
        .collect();
    ModuleSchema::new("schedule", "Schedule", fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn standard_registry_is_consistent() {
        let modules = modules::standard_modules();
        assert!(SchemaRegistry::from_modules(modules).is_ok());
    }

    #[test]
    fn lookup_by_key() {
        let registry = SchemaRegistry::standard();
        let schema = registry.module("poster_renamerr").unwrap();
        assert_eq!(schema.fields[0].key, "log_level");
        assert!(schema.is_handled_elsewhere("instances"));
        assert_matches!(registry.module("nope"), Err(CoreError::UnknownModule(k)) if k == "nope");
    }

    #[test]
    fn schedule_schema_lists_every_schedulable_module() {
        let registry = SchemaRegistry::standard();
        let schedule = registry.module("schedule").unwrap();
        let keys: Vec<&str> = schedule.fields.iter().map(|f| f.key.as_str()).collect();
        let expected: Vec<&str> = registry.schedulable_modules().collect();
        assert_eq!(keys, expected);
        assert!(!keys.contains(&"main"));
        assert!(schedule
            .fields
            .iter()
            .all(|f| f.placeholder.as_deref() == Some(SCHEDULE_PLACEHOLDER)));
    }

    #[test]
    fn duplicate_field_keys_are_rejected() {
        let module = ModuleSchema::new(
            "dupes",
            "Dupes",
            vec![
                FieldDescriptor::new("a", "A", FieldKind::Text),
                FieldDescriptor::new("a", "A again", FieldKind::Number),
            ],
        );
        assert_matches!(
            SchemaRegistry::from_modules(vec![module]),
            Err(CoreError::Validation(msg)) if msg.contains("'a'")
        );
    }

    #[test]
    fn duplicate_nested_keys_are_rejected() {
        let module = ModuleSchema::new(
            "nested",
            "Nested",
            vec![FieldDescriptor::new(
                "list",
                "List",
                FieldKind::complex_list(vec![
                    FieldDescriptor::new("x", "X", FieldKind::Text),
                    FieldDescriptor::new("x", "X", FieldKind::Text),
                ]),
            )],
        );
        assert_matches!(
            SchemaRegistry::from_modules(vec![module]),
            Err(CoreError::Validation(msg)) if msg.contains("nested.list")
        );
    }

    #[test]
    fn reserved_module_keys_are_rejected() {
        let module = ModuleSchema::new("notifications", "Notifications", vec![]);
        assert_matches!(
            SchemaRegistry::from_modules(vec![module]),
            Err(CoreError::Validation(msg)) if msg.contains("reserved")
        );
    }
}
