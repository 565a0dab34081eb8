//! Complex lists: ordered sequences of structured entries.
//!
//! Entries are created and edited by a modal editor that lives outside this
//! crate; the control only owns the summary list and removal.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::schema::{FieldDescriptor, FieldKind};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplexList {
    #[serde(skip)]
    fields: Vec<FieldDescriptor>,
    entries: Vec<Map<String, Value>>,
}

impl ComplexList {
    pub fn from_value(fields: Vec<FieldDescriptor>, value: Option<&Value>) -> Self {
        let entries = value
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(|v| v.as_object().cloned()).collect())
            .unwrap_or_default();
        Self { fields, entries }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn entries(&self) -> &[Map<String, Value>] {
        &self.entries
    }

    /// One-line label per entry: the first non-empty text field, falling back
    /// to a positional label.
    pub fn summaries(&self) -> Vec<String> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                self.fields
                    .iter()
                    .filter(|f| matches!(f.kind, FieldKind::Text | FieldKind::Dir))
                    .find_map(|f| {
                        entry
                            .get(&f.key)
                            .and_then(Value::as_str)
                            .filter(|s| !s.trim().is_empty())
                            .map(str::to_string)
                    })
                    .unwrap_or_else(|| format!("Entry {}", i + 1))
            })
            .collect()
    }

    /// Insert a new entry (`index == None`) or replace an existing one.
    pub fn upsert(&mut self, index: Option<usize>, entry: Map<String, Value>) -> Result<(), CoreError> {
        let missing: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required && is_missing(entry.get(&f.key)))
            .map(|f| f.label.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(CoreError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        match index {
            None => self.entries.push(entry),
            Some(i) => {
                let slot = self.entries.get_mut(i).ok_or_else(|| {
                    CoreError::Validation(format!("Entry index {i} out of range"))
                })?;
                *slot = entry;
            }
        }
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Map<String, Value>, CoreError> {
        if index >= self.entries.len() {
            return Err(CoreError::Validation(format!(
                "Entry index {index} out of range"
            )));
        }
        Ok(self.entries.remove(index))
    }

    pub fn value(&self) -> Value {
        Value::Array(self.entries.iter().cloned().map(Value::Object).collect())
    }
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        _ => false,
    }
}
