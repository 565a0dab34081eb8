//! Ordered list controls: directory lists and color lists.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::CoreError;

static HEX_COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid regex"));

/// Color appended by "add color".
pub const DEFAULT_COLOR: &str = "#ffffff";

// ---------------------------------------------------------------------------
// Directory lists
// ---------------------------------------------------------------------------

/// Which flavor of directory list a field declares.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum PathListKind {
    Plain,
    /// Entries can be reordered by dragging.
    Reorderable,
    /// Every entry carries a mode from the declared set.
    WithMode { modes: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathEntry {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Stored as a plain path string on a mode list; kept that way until the
    /// mode is edited.
    #[serde(skip)]
    bare: bool,
}

/// An ordered, never-empty list of directory entries.
///
/// The list always shows at least one (possibly blank) entry, and the
/// remove control is disabled while exactly one entry remains. Blank
/// entries are not part of the value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathList {
    pub kind: PathListKind,
    entries: Vec<PathEntry>,
}

impl PathList {
    pub fn from_value(kind: PathListKind, value: Option<&Value>) -> Self {
        let default_mode = match &kind {
            PathListKind::WithMode { modes } => modes.first().cloned(),
            _ => None,
        };

        let mut entries: Vec<PathEntry> = value
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| match item {
                        Value::String(path) => Some(PathEntry {
                            path: path.clone(),
                            mode: default_mode.clone(),
                            bare: true,
                        }),
                        Value::Object(obj) => Some(PathEntry {
                            path: obj.get("path").and_then(Value::as_str)?.to_string(),
                            mode: obj
                                .get("mode")
                                .and_then(Value::as_str)
                                .map(str::to_string)
                                .or_else(|| default_mode.clone()),
                            bare: false,
                        }),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        if entries.is_empty() {
            entries.push(PathEntry {
                path: String::new(),
                mode: default_mode,
                bare: false,
            });
        }

        Self { kind, entries }
    }

    pub fn entries(&self) -> &[PathEntry] {
        &self.entries
    }

    pub fn can_remove(&self) -> bool {
        self.entries.len() > 1
    }

    pub fn can_reorder(&self) -> bool {
        matches!(self.kind, PathListKind::Reorderable)
    }

    /// Append a blank entry carrying the first declared mode.
    pub fn add(&mut self) {
        let mode = match &self.kind {
            PathListKind::WithMode { modes } => modes.first().cloned(),
            _ => None,
        };
        self.entries.push(PathEntry {
            path: String::new(),
            mode,
            bare: false,
        });
    }

    /// Remove entry `index`; the last remaining entry cannot be removed.
    pub fn remove(&mut self, index: usize) -> Result<(), CoreError> {
        self.check_index(index)?;
        if !self.can_remove() {
            return Err(CoreError::Validation(
                "At least one entry must remain".to_string(),
            ));
        }
        self.entries.remove(index);
        Ok(())
    }

    /// Replace the path of entry `index`.
    pub fn set_path(&mut self, index: usize, path: String) -> Result<(), CoreError> {
        self.check_index(index)?;
        self.entries[index].path = path;
        Ok(())
    }

    pub fn set_mode(&mut self, index: usize, mode: String) -> Result<(), CoreError> {
        self.check_index(index)?;
        let PathListKind::WithMode { modes } = &self.kind else {
            return Err(CoreError::Validation(
                "This list does not support per-entry modes".to_string(),
            ));
        };
        if !modes.contains(&mode) {
            return Err(CoreError::Validation(format!(
                "Invalid mode '{mode}'. Must be one of: {}",
                modes.join(", ")
            )));
        }
        let entry = &mut self.entries[index];
        entry.bare = false;
        entry.mode = Some(mode);
        Ok(())
    }

    /// Move entry `from` to position `to`. Drag-and-drop lists only.
    pub fn move_entry(&mut self, from: usize, to: usize) -> Result<(), CoreError> {
        if !self.can_reorder() {
            return Err(CoreError::Validation(
                "This list does not support reordering".to_string(),
            ));
        }
        self.check_index(from)?;
        self.check_index(to)?;
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        Ok(())
    }

    /// Non-blank entries as the config value.
    pub fn value(&self) -> Value {
        let items = self
            .entries
            .iter()
            .filter(|e| !e.path.trim().is_empty())
            .map(|e| match (&self.kind, &e.mode) {
                (PathListKind::WithMode { .. }, _) if e.bare => Value::String(e.path.clone()),
                (PathListKind::WithMode { .. }, Some(mode)) => json!({ "path": e.path, "mode": mode }),
                (PathListKind::WithMode { .. }, None) => json!({ "path": e.path }),
                _ => Value::String(e.path.clone()),
            })
            .collect();
        Value::Array(items)
    }

    pub fn is_blank(&self) -> bool {
        self.entries.iter().all(|e| e.path.trim().is_empty())
    }

    fn check_index(&self, index: usize) -> Result<(), CoreError> {
        if index < self.entries.len() {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "Entry index {index} out of range (list has {} entries)",
                self.entries.len()
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// Color lists
// ---------------------------------------------------------------------------

/// `#RRGGBB`, either case.
pub fn is_hex_color(value: &str) -> bool {
    HEX_COLOR_RE.is_match(value)
}

/// An ordered list of `#RRGGBB` colors. May be empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorList {
    colors: Vec<String>,
}

impl ColorList {
    /// Non-string items are dropped.
    pub fn from_value(value: Option<&Value>) -> Self {
        let colors = value
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self { colors }
    }

    /// Current colors, in display order.
    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    /// Append [`DEFAULT_COLOR`].
    pub fn add(&mut self) {
        self.colors.push(DEFAULT_COLOR.to_string());
    }

    /// Remove color `index`. The list may become empty.
    pub fn remove(&mut self, index: usize) -> Result<(), CoreError> {
        if index >= self.colors.len() {
            return Err(CoreError::Validation(format!(
                "Color index {index} out of range"
            )));
        }
        self.colors.remove(index);
        Ok(())
    }

    /// Replace color `index`. The new color must be `#RRGGBB`.
    pub fn set(&mut self, index: usize, color: String) -> Result<(), CoreError> {
        if !is_hex_color(&color) {
            return Err(CoreError::Validation(format!(
                "'{color}' is not a #RRGGBB color"
            )));
        }
        let slot = self
            .colors
            .get_mut(index)
            .ok_or_else(|| CoreError::Validation(format!("Color index {index} out of range")))?;
        *slot = color;
        Ok(())
    }

    /// The colors in order, as the config value.
    pub fn value(&self) -> Value {
        Value::Array(self.colors.iter().cloned().map(Value::String).collect())
    }
}
