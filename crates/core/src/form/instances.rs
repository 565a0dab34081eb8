//! Instance selector: picks service instances from the root registry.
//!
//! The module value is an ordered array. Radarr/Sonarr selections are plain
//! instance names; Plex selections are single-key objects carrying the chosen
//! libraries:
//!
//! ```json
//! ["radarr_1", "sonarr_1", { "plex_1": { "library_names": ["Movies"] } }]
//! ```
//!
//! A Plex instance stored as a bare name stays a bare name until one of its
//! libraries is toggled.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::CoreError;
use crate::schema::ServiceKind;

/// Root config key holding the instance registry.
pub const INSTANCES_KEY: &str = "instances";

const LIBRARY_NAMES_KEY: &str = "library_names";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub name: String,
    /// `None` when the name is not present in the registry.
    pub service: Option<ServiceKind>,
    pub libraries: Vec<String>,
    #[serde(skip)]
    bare: bool,
}

/// View of one registry instance inside a service group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceOption {
    pub name: String,
    pub selected: bool,
    /// Present for selected Plex instances.
    pub libraries: Option<LibraryPicker>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryPicker {
    /// `None` until the library list has been fetched from the backend.
    pub available: Option<Vec<String>>,
    pub selected: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceGroup {
    pub service: ServiceKind,
    pub options: Vec<InstanceOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceSelector {
    registry: Vec<(ServiceKind, Vec<String>)>,
    selections: Vec<Selection>,
    available_libraries: HashMap<String, Vec<String>>,
}

/// Names registered under `service` in the root config, in registry order.
pub fn registered_names(root: &Value, service: ServiceKind) -> Vec<String> {
    root.get(INSTANCES_KEY)
        .and_then(|i| i.get(service.as_str()))
        .and_then(Value::as_object)
        .map(|m| m.keys().cloned().collect())
        .unwrap_or_default()
}

impl InstanceSelector {
    pub fn from_value(services: &[ServiceKind], value: Option<&Value>, root: &Value) -> Self {
        let registry: Vec<(ServiceKind, Vec<String>)> = services
            .iter()
            .map(|s| (*s, registered_names(root, *s)))
            .collect();

        let lookup = |name: &str| {
            registry
                .iter()
                .find(|(_, names)| names.iter().any(|n| n == name))
                .map(|(service, _)| *service)
        };

        let selections = value
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| match item {
                        Value::String(name) => Some(Selection {
                            name: name.clone(),
                            service: lookup(name.as_str()),
                            libraries: Vec::new(),
                            bare: true,
                        }),
                        Value::Object(obj) => {
                            let (name, settings) = obj.iter().next()?;
                            Some(Selection {
                                name: name.clone(),
                                service: lookup(name.as_str()).or(Some(ServiceKind::Plex)),
                                libraries: settings
                                    .get(LIBRARY_NAMES_KEY)
                                    .and_then(Value::as_array)
                                    .map(|libs| {
                                        libs.iter()
                                            .filter_map(Value::as_str)
                                            .map(str::to_string)
                                            .collect()
                                    })
                                    .unwrap_or_default(),
                                bare: false,
                            })
                        }
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            registry,
            selections,
            available_libraries: HashMap::new(),
        }
    }

    /// One group per allowed service kind, in declaration order.
    pub fn groups(&self) -> Vec<InstanceGroup> {
        self.registry
            .iter()
            .map(|(service, names)| InstanceGroup {
                service: *service,
                options: names
                    .iter()
                    .map(|name| {
                        let selection = self.selection(name);
                        InstanceOption {
                            name: name.clone(),
                            selected: selection.is_some(),
                            libraries: selection.filter(|_| service.has_libraries()).map(|s| {
                                LibraryPicker {
                                    available: self.available_libraries.get(name).cloned(),
                                    selected: s.libraries.clone(),
                                }
                            }),
                        }
                    })
                    .collect(),
            })
            .collect()
    }

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    /// Selected names that no longer exist in the registry.
    pub fn missing(&self) -> Vec<&str> {
        self.selections
            .iter()
            .filter(|s| {
                !self
                    .registry
                    .iter()
                    .any(|(_, names)| names.iter().any(|n| *n == s.name))
            })
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Selected Plex instances whose library list has not been fetched yet.
    pub fn needs_libraries(&self) -> Vec<String> {
        self.selections
            .iter()
            .filter(|s| s.service == Some(ServiceKind::Plex))
            .filter(|s| !self.available_libraries.contains_key(&s.name))
            .map(|s| s.name.clone())
            .collect()
    }

    /// Selected Plex instances with no library chosen.
    pub fn plex_without_libraries(&self) -> Vec<&str> {
        self.selections
            .iter()
            .filter(|s| s.service == Some(ServiceKind::Plex) && s.libraries.is_empty())
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Select or deselect a registry instance. Returns whether the value changed.
    pub fn toggle(&mut self, service: ServiceKind, name: &str, selected: bool) -> Result<bool, CoreError> {
        let known = self
            .registry
            .iter()
            .find(|(s, _)| *s == service)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "{} instances are not used by this module",
                    service.label()
                ))
            })?
            .1
            .iter()
            .any(|n| n == name);

        let position = self.selections.iter().position(|s| s.name == name);
        match (selected, position) {
            (true, Some(_)) | (false, None) => Ok(false),
            (true, None) => {
                if !known {
                    return Err(CoreError::Validation(format!(
                        "No {} instance named '{name}'",
                        service.label()
                    )));
                }
                self.selections.push(Selection {
                    name: name.to_string(),
                    service: Some(service),
                    libraries: Vec::new(),
                    bare: false,
                });
                Ok(true)
            }
            (false, Some(i)) => {
                self.selections.remove(i);
                Ok(true)
            }
        }
    }

    /// Record the libraries the backend reported for a Plex instance.
    pub fn set_available_libraries(&mut self, instance: &str, libraries: Vec<String>) {
        self.available_libraries.insert(instance.to_string(), libraries);
    }

    /// Check or uncheck one library of a selected Plex instance.
    pub fn toggle_library(&mut self, instance: &str, library: &str, selected: bool) -> Result<bool, CoreError> {
        if let Some(available) = self.available_libraries.get(instance) {
            if selected && !available.iter().any(|l| l == library) {
                return Err(CoreError::Validation(format!(
                    "Plex instance '{instance}' has no library named '{library}'"
                )));
            }
        }

        let selection = self
            .selections
            .iter_mut()
            .find(|s| s.name == instance && s.service == Some(ServiceKind::Plex))
            .ok_or_else(|| {
                CoreError::Validation(format!("Plex instance '{instance}' is not selected"))
            })?;

        let position = selection.libraries.iter().position(|l| l == library);
        match (selected, position) {
            (true, Some(_)) | (false, None) => Ok(false),
            (true, None) => {
                selection.bare = false;
                selection.libraries.push(library.to_string());
                Ok(true)
            }
            (false, Some(i)) => {
                selection.bare = false;
                selection.libraries.remove(i);
                Ok(true)
            }
        }
    }

    pub fn value(&self) -> Value {
        let items = self
            .selections
            .iter()
            .map(|s| match s.service {
                Some(ServiceKind::Plex) if !s.bare => {
                    let mut obj = Map::new();
                    obj.insert(s.name.clone(), json!({ "library_names": s.libraries }));
                    Value::Object(obj)
                }
                _ => Value::String(s.name.clone()),
            })
            .collect();
        Value::Array(items)
    }

    fn selection(&self, name: &str) -> Option<&Selection> {
        self.selections.iter().find(|s| s.name == name)
    }
}
