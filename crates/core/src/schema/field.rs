//! Field descriptors: the declarative unit the schema registry is built from.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Service kinds
// ---------------------------------------------------------------------------

/// A backend service kind that instances can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Radarr,
    Sonarr,
    Plex,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 3] = [Self::Radarr, Self::Sonarr, Self::Plex];

    /// Key of this service in the root `instances` registry.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Radarr => "radarr",
            Self::Sonarr => "sonarr",
            Self::Plex => "plex",
        }
    }

    /// Display name, e.g. `Radarr`.
    pub fn label(self) -> &'static str {
        match self {
            Self::Radarr => "Radarr",
            Self::Sonarr => "Sonarr",
            Self::Plex => "Plex",
        }
    }

    /// Inverse of [`as_str`](Self::as_str).
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    /// Plex selections carry a per-instance library list.
    pub fn has_libraries(self) -> bool {
        matches!(self, Self::Plex)
    }
}

// ---------------------------------------------------------------------------
// Field kinds
// ---------------------------------------------------------------------------

/// The closed set of field types a descriptor can declare.
///
/// Serialized with a `type` tag so schemas can be loaded from JSON. A tag
/// this build does not know deserializes to [`FieldKind::Unknown`], which
/// renders as a plain text input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Password,
    Number,
    /// Boolean toggle.
    Slider,
    Dropdown {
        #[serde(default)]
        options: Vec<String>,
    },
    Textarea,
    Json,
    Dir,
    DirList,
    DirListDragDrop,
    ModeDirList {
        #[serde(default)]
        modes: Vec<String>,
    },
    ColorList,
    ComplexList {
        #[serde(default)]
        fields: Vec<FieldDescriptor>,
    },
    Instances {
        #[serde(default)]
        services: Vec<ServiceKind>,
    },
    #[serde(other)]
    Unknown,
}

impl FieldKind {
    pub fn dropdown(options: &[&str]) -> Self {
        Self::Dropdown {
            options: options.iter().map(|o| o.to_string()).collect(),
        }
    }

    pub fn mode_dir_list(modes: &[&str]) -> Self {
        Self::ModeDirList {
            modes: modes.iter().map(|m| m.to_string()).collect(),
        }
    }

    pub fn complex_list(fields: Vec<FieldDescriptor>) -> Self {
        Self::ComplexList { fields }
    }

    pub fn instances(services: &[ServiceKind]) -> Self {
        Self::Instances {
            services: services.to_vec(),
        }
    }

    /// The `type` tag as written in a serialized schema.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Password => "password",
            Self::Number => "number",
            Self::Slider => "slider",
            Self::Dropdown { .. } => "dropdown",
            Self::Textarea => "textarea",
            Self::Json => "json",
            Self::Dir => "dir",
            Self::DirList => "dir_list",
            Self::DirListDragDrop => "dir_list_drag_drop",
            Self::ModeDirList { .. } => "mode_dir_list",
            Self::ColorList => "color_list",
            Self::ComplexList { .. } => "complex_list",
            Self::Instances { .. } => "instances",
            Self::Unknown => "unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// Definition of a single configurable field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Key of the value in the owning module config.
    pub key: String,
    /// Human-readable display label.
    pub label: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// A textarea holding a list of strings, edited one item per line.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub one_per_line: bool,
}

impl FieldDescriptor {
    pub fn new(key: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            kind,
            required: false,
            placeholder: None,
            description: None,
            one_per_line: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Store the textarea's lines as an array of strings.
    pub fn one_per_line(mut self) -> Self {
        self.one_per_line = true;
        self
    }
}
