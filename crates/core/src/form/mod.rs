//! Field renderer: turns one field descriptor plus its current value into a
//! self-contained, editable UI unit.
//!
//! Units are plain data. A shell draws them however it likes and feeds user
//! input back as [`FieldEdit`]s through [`FormSurface::apply`], which writes
//! the new value into the module config synchronously.

pub mod complex;
pub mod instances;
pub mod list;
pub mod surface;

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::schema::{FieldDescriptor, FieldKind};

pub use complex::ComplexList;
pub use instances::{InstanceGroup, InstanceSelector, LibraryPicker, Selection};
pub use list::{ColorList, PathEntry, PathList, PathListKind};
pub use surface::{assemble, EditOutcome, FieldEdit, FormSurface, PendingRemoval};

// ---------------------------------------------------------------------------
// Controls
// ---------------------------------------------------------------------------

/// Flavor of a single-value text input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Text,
    Password,
    Number,
    Textarea,
    /// Textarea over a list of strings, one item per line.
    Lines,
    Json,
    Dir,
}

/// The editable control of a unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "control", rename_all = "snake_case")]
pub enum Control {
    Input {
        input: InputKind,
        text: String,
        placeholder: Option<String>,
        /// The stored value was `null`; empty text reads back as `null`.
        #[serde(skip)]
        null_when_empty: bool,
    },
    Toggle {
        checked: bool,
    },
    Select {
        options: Vec<String>,
        /// `None` shows the placeholder entry.
        selected: Option<String>,
        placeholder: String,
    },
    PathList(PathList),
    ColorList(ColorList),
    ComplexList(ComplexList),
    Instances(InstanceSelector),
}

impl Control {
    /// The value currently displayed, as it would be written to the config.
    pub fn value(&self) -> Value {
        match self {
            Self::Input {
                input,
                text,
                null_when_empty,
                ..
            } => match input {
                _ if *null_when_empty && text.is_empty() => Value::Null,
                InputKind::Number => parse_number(text),
                InputKind::Json => parse_json(text),
                InputKind::Lines => parse_lines(text),
                _ => Value::String(text.clone()),
            },
            Self::Toggle { checked } => Value::Bool(*checked),
            Self::Select { selected, .. } => selected.clone().map(Value::String).unwrap_or(Value::Null),
            Self::PathList(list) => list.value(),
            Self::ColorList(list) => list.value(),
            Self::ComplexList(list) => list.value(),
            Self::Instances(selector) => selector.value(),
        }
    }
}

/// A labeled control bound by name to one field key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldUnit {
    /// Control name; equals the field key.
    pub name: String,
    pub label: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub control: Control,
    /// Validation message shown next to the control.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FieldUnit {
    /// Value of the control, as written back to the config.
    pub fn value(&self) -> Value {
        self.control.value()
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Placeholder label of dropdowns with no selection.
pub const SELECT_PLACEHOLDER: &str = "Select an option";

/// Render one field of `module_config`.
///
/// `root_config` is the whole config document; instance selectors read the
/// service registry from it.
pub fn render(descriptor: &FieldDescriptor, module_config: &Map<String, Value>, root_config: &Value) -> FieldUnit {
    let stored = module_config.get(&descriptor.key);
    let current = stored.filter(|v| !v.is_null());
    let placeholder = descriptor.placeholder.clone();

    let input = |input: InputKind, text: String| Control::Input {
        input,
        text,
        placeholder: placeholder.clone(),
        null_when_empty: matches!(stored, Some(Value::Null)),
    };

    let control = match &descriptor.kind {
        FieldKind::Text | FieldKind::Unknown => input(InputKind::Text, display_text(current)),
        FieldKind::Password => input(InputKind::Password, display_text(current)),
        FieldKind::Number => input(InputKind::Number, display_text(current)),
        // A stored array always stays an array; a stored string stays a string.
        FieldKind::Textarea => match current {
            Some(Value::Array(items)) => input(InputKind::Lines, display_lines(items)),
            None if descriptor.one_per_line => input(InputKind::Lines, String::new()),
            _ => input(InputKind::Textarea, display_text(current)),
        },
        FieldKind::Dir => input(InputKind::Dir, display_text(current)),
        FieldKind::Json => input(InputKind::Json, display_json(current)),
        FieldKind::Slider => Control::Toggle {
            checked: current.and_then(Value::as_bool).unwrap_or(false),
        },
        FieldKind::Dropdown { options } => Control::Select {
            options: options.clone(),
            selected: current
                .and_then(Value::as_str)
                .filter(|v| options.iter().any(|o| o == v))
                .map(str::to_string),
            placeholder: placeholder.clone().unwrap_or_else(|| SELECT_PLACEHOLDER.to_string()),
        },
        FieldKind::DirList => Control::PathList(PathList::from_value(PathListKind::Plain, current)),
        FieldKind::DirListDragDrop => {
            Control::PathList(PathList::from_value(PathListKind::Reorderable, current))
        }
        FieldKind::ModeDirList { modes } => Control::PathList(PathList::from_value(
            PathListKind::WithMode {
                modes: modes.clone(),
            },
            current,
        )),
        FieldKind::ColorList => Control::ColorList(ColorList::from_value(current)),
        FieldKind::ComplexList { fields } => {
            Control::ComplexList(ComplexList::from_value(fields.clone(), current))
        }
        FieldKind::Instances { services } => {
            Control::Instances(InstanceSelector::from_value(services, current, root_config))
        }
    };

    FieldUnit {
        name: descriptor.key.clone(),
        label: descriptor.label.clone(),
        required: descriptor.required,
        description: descriptor.description.clone(),
        control,
        error: None,
    }
}

fn display_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn display_lines(items: &[Value]) -> String {
    items
        .iter()
        .map(|item| display_text(Some(item)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn display_json(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(v) => serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string()),
    }
}

/// Empty text reads back as `null`; text that is not a number is kept as a
/// string so validation can report it.
pub(crate) fn parse_number(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(u) = trimmed.parse::<u64>() {
        return Value::Number(u.into());
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(text.to_string()))
}

/// One string per non-blank line.
pub(crate) fn parse_lines(text: &str) -> Value {
    Value::Array(
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| Value::String(line.to_string()))
            .collect(),
    )
}

pub(crate) fn parse_json(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
