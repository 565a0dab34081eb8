//! Form assembler: composes rendered units into one form bound to a module
//! config.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{render, Control, FieldUnit};
use crate::error::CoreError;
use crate::schema::{ModuleSchema, ServiceKind};
use crate::validation::FieldError;

// ---------------------------------------------------------------------------
// Edits
// ---------------------------------------------------------------------------

/// A user edit addressed to one control of the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "edit", rename_all = "snake_case")]
pub enum FieldEdit {
    SetText { key: String, text: String },
    SetToggle { key: String, checked: bool },
    Select { key: String, value: Option<String> },
    AddEntry { key: String },
    /// On complex lists this only requests removal; see [`FieldEdit::ConfirmRemoval`].
    RemoveEntry { key: String, index: usize },
    SetEntry { key: String, index: usize, value: String },
    SetEntryMode { key: String, index: usize, mode: String },
    MoveEntry { key: String, from: usize, to: usize },
    /// Result of the complex-list modal editor. `index == None` appends.
    UpsertEntry {
        key: String,
        index: Option<usize>,
        entry: Map<String, Value>,
    },
    ToggleInstance {
        key: String,
        service: ServiceKind,
        name: String,
        selected: bool,
    },
    LibrariesLoaded {
        key: String,
        instance: String,
        libraries: Vec<String>,
    },
    ToggleLibrary {
        key: String,
        instance: String,
        library: String,
        selected: bool,
    },
    ConfirmRemoval,
    CancelRemoval,
}

impl FieldEdit {
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::SetText { key, .. }
            | Self::SetToggle { key, .. }
            | Self::Select { key, .. }
            | Self::AddEntry { key }
            | Self::RemoveEntry { key, .. }
            | Self::SetEntry { key, .. }
            | Self::SetEntryMode { key, .. }
            | Self::MoveEntry { key, .. }
            | Self::UpsertEntry { key, .. }
            | Self::ToggleInstance { key, .. }
            | Self::LibrariesLoaded { key, .. }
            | Self::ToggleLibrary { key, .. } => Some(key),
            Self::ConfirmRemoval | Self::CancelRemoval => None,
        }
    }
}

/// A complex-list entry awaiting the discard confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingRemoval {
    pub key: String,
    pub index: usize,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// The module config changed; the dirty flag must be raised.
    Changed,
    Unchanged,
    ConfirmationRequired(PendingRemoval),
}

// ---------------------------------------------------------------------------
// FormSurface
// ---------------------------------------------------------------------------

/// Every control of one module, bound to its working config.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormSurface {
    module: String,
    generation: u64,
    config: Map<String, Value>,
    /// Units for keys the schema routes to a dedicated block.
    blocks: Vec<FieldUnit>,
    units: Vec<FieldUnit>,
    pending_removal: Option<PendingRemoval>,
}

/// Render every field of `schema` in declaration order.
///
/// Each call builds fresh units; `generation` identifies this assembly so
/// edits issued against an earlier one can be rejected.
pub fn assemble(schema: &ModuleSchema, config: Map<String, Value>, root_config: &Value, generation: u64) -> FormSurface {
    let mut blocks = Vec::new();
    let mut units = Vec::new();
    for descriptor in &schema.fields {
        let unit = render(descriptor, &config, root_config);
        if schema.is_handled_elsewhere(&descriptor.key) {
            blocks.push(unit);
        } else {
            units.push(unit);
        }
    }

    FormSurface {
        module: schema.key.clone(),
        generation,
        config,
        blocks,
        units,
        pending_removal: None,
    }
}

impl FormSurface {
    /// Key of the module this form edits.
    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Working config with every applied edit written back.
    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    /// Units drawn outside the generic field list, such as the instance
    /// selector of `poster_renamerr`.
    pub fn blocks(&self) -> &[FieldUnit] {
        &self.blocks
    }

    pub fn units(&self) -> &[FieldUnit] {
        &self.units
    }

    /// Dedicated blocks first, then the generic units: display order.
    pub fn all_units(&self) -> impl Iterator<Item = &FieldUnit> {
        self.blocks.iter().chain(self.units.iter())
    }

    pub fn unit(&self, key: &str) -> Option<&FieldUnit> {
        self.all_units().find(|u| u.name == key)
    }

    /// Displayed value of every control, keyed by field.
    pub fn read_back(&self) -> Map<String, Value> {
        self.all_units()
            .map(|u| (u.name.clone(), u.value()))
            .collect()
    }

    pub fn pending_removal(&self) -> Option<&PendingRemoval> {
        self.pending_removal.as_ref()
    }

    /// Plex instances selected in any instance selector whose libraries have
    /// not been fetched, as `(field key, instance)` pairs.
    pub fn pending_library_fetches(&self) -> Vec<(String, String)> {
        self.all_units()
            .filter_map(|u| match &u.control {
                Control::Instances(selector) => Some(
                    selector
                        .needs_libraries()
                        .into_iter()
                        .map(|instance| (u.name.clone(), instance))
                        .collect::<Vec<_>>(),
                ),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Attach validation messages; clears messages on every other unit.
    pub fn mark_invalid(&mut self, errors: &[FieldError]) {
        for unit in self.blocks.iter_mut().chain(self.units.iter_mut()) {
            unit.error = errors
                .iter()
                .find(|e| e.field == unit.name)
                .map(|e| e.message.clone());
        }
    }

    /// First unit in display order carrying an error.
    pub fn first_invalid(&self) -> Option<&str> {
        self.all_units()
            .find(|u| u.error.is_some())
            .map(|u| u.name.as_str())
    }

    pub fn into_config(self) -> Map<String, Value> {
        self.config
    }

    /// Apply one edit and write the control's value back into the config.
    pub fn apply(&mut self, edit: FieldEdit) -> Result<EditOutcome, CoreError> {
        match edit {
            FieldEdit::ConfirmRemoval => {
                let pending = self.pending_removal.take().ok_or_else(|| {
                    CoreError::Validation("No removal awaiting confirmation".to_string())
                })?;
                let unit = self.unit_mut(&pending.key)?;
                match &mut unit.control {
                    Control::ComplexList(list) => list.remove(pending.index)?,
                    _ => return Err(mismatch(&pending.key)),
                };
                self.write_back(&pending.key);
                Ok(EditOutcome::Changed)
            }
            FieldEdit::CancelRemoval => {
                self.pending_removal = None;
                Ok(EditOutcome::Unchanged)
            }
            FieldEdit::RemoveEntry { key, index } if self.is_complex_list(&key) => {
                let unit = self.unit_mut(&key)?;
                let Control::ComplexList(list) = &unit.control else {
                    return Err(mismatch(&key));
                };
                let summary = list.summaries().get(index).cloned().ok_or_else(|| {
                    CoreError::Validation(format!("Entry index {index} out of range"))
                })?;
                let pending = PendingRemoval {
                    key,
                    index,
                    summary,
                };
                self.pending_removal = Some(pending.clone());
                Ok(EditOutcome::ConfirmationRequired(pending))
            }
            FieldEdit::LibrariesLoaded {
                key,
                instance,
                libraries,
            } => {
                let unit = self.unit_mut(&key)?;
                let Control::Instances(selector) = &mut unit.control else {
                    return Err(mismatch(&key));
                };
                selector.set_available_libraries(&instance, libraries);
                Ok(EditOutcome::Unchanged)
            }
            edit => {
                let key = edit
                    .key()
                    .map(str::to_string)
                    .ok_or_else(|| CoreError::Validation("Edit has no target field".to_string()))?;
                let unit = self.unit_mut(&key)?;
                let before = unit.control.value();
                let structural = apply_to_control(&mut unit.control, edit, &key)?;
                let changed = structural || unit.control.value() != before;
                if changed {
                    unit.error = None;
                    self.write_back(&key);
                    Ok(EditOutcome::Changed)
                } else {
                    Ok(EditOutcome::Unchanged)
                }
            }
        }
    }

    fn is_complex_list(&self, key: &str) -> bool {
        matches!(
            self.unit(key).map(|u| &u.control),
            Some(Control::ComplexList(_))
        )
    }

    fn unit_mut(&mut self, key: &str) -> Result<&mut FieldUnit, CoreError> {
        let module = self.module.clone();
        self.blocks
            .iter_mut()
            .chain(self.units.iter_mut())
            .find(|u| u.name == key)
            .ok_or_else(|| CoreError::UnknownField {
                module,
                field: key.to_string(),
            })
    }

    fn write_back(&mut self, key: &str) {
        if let Some(value) = self.unit(key).map(FieldUnit::value) {
            self.config.insert(key.to_string(), value);
        }
    }
}

/// Mutate `control` according to `edit`. Returns `true` for structural edits
/// (entries added or removed), which count as changes even when the value
/// does not differ.
fn apply_to_control(control: &mut Control, edit: FieldEdit, key: &str) -> Result<bool, CoreError> {
    match (control, edit) {
        (Control::Input { text, .. }, FieldEdit::SetText { text: new, .. }) => {
            *text = new;
            Ok(false)
        }
        (Control::Toggle { checked }, FieldEdit::SetToggle { checked: new, .. }) => {
            *checked = new;
            Ok(false)
        }
        (Control::Select { options, selected, .. }, FieldEdit::Select { value, .. }) => {
            if let Some(v) = &value {
                if !options.contains(v) {
                    return Err(CoreError::Validation(format!(
                        "'{v}' is not a valid option for '{key}'. Must be one of: {}",
                        options.join(", ")
                    )));
                }
            }
            *selected = value;
            Ok(false)
        }
        (Control::PathList(list), FieldEdit::AddEntry { .. }) => {
            list.add();
            Ok(true)
        }
        (Control::PathList(list), FieldEdit::RemoveEntry { index, .. }) => {
            list.remove(index)?;
            Ok(true)
        }
        (Control::PathList(list), FieldEdit::SetEntry { index, value, .. }) => {
            list.set_path(index, value)?;
            Ok(false)
        }
        (Control::PathList(list), FieldEdit::SetEntryMode { index, mode, .. }) => {
            list.set_mode(index, mode)?;
            Ok(false)
        }
        (Control::PathList(list), FieldEdit::MoveEntry { from, to, .. }) => {
            list.move_entry(from, to)?;
            Ok(false)
        }
        (Control::ColorList(list), FieldEdit::AddEntry { .. }) => {
            list.add();
            Ok(true)
        }
        (Control::ColorList(list), FieldEdit::RemoveEntry { index, .. }) => {
            list.remove(index)?;
            Ok(true)
        }
        (Control::ColorList(list), FieldEdit::SetEntry { index, value, .. }) => {
            list.set(index, value)?;
            Ok(false)
        }
        (Control::ComplexList(list), FieldEdit::UpsertEntry { index, entry, .. }) => {
            list.upsert(index, entry)?;
            Ok(index.is_none())
        }
        (
            Control::Instances(selector),
            FieldEdit::ToggleInstance {
                service,
                name,
                selected,
                ..
            },
        ) => selector.toggle(service, &name, selected).map(|_| false),
        (
            Control::Instances(selector),
            FieldEdit::ToggleLibrary {
                instance,
                library,
                selected,
                ..
            },
        ) => selector
            .toggle_library(&instance, &library, selected)
            .map(|_| false),
        _ => Err(mismatch(key)),
    }
}

fn mismatch(key: &str) -> CoreError {
    CoreError::Validation(format!("Field '{key}' does not accept this edit"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRegistry;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn root() -> Value {
        json!({
            "instances": {
                "radarr": { "radarr_1": { "url": "http://r", "api": "k" } },
                "sonarr": { "sonarr_1": { "url": "http://s", "api": "k" } },
                "plex": { "plex_1": { "url": "http://p", "api": "k" } }
            }
        })
    }

    fn renamerr_config() -> Map<String, Value> {
        json!({
            "log_level": "info",
            "dry_run": true,
            "sync_posters": false,
            "action_type": "copy",
            "asset_folders": false,
            "print_only_renames": false,
            "run_border_replacerr": true,
            "incremental_border_replacerr": false,
            "source_dirs": ["/posters/a", "/posters/b"],
            "destination_dir": "/assets",
            "instances": ["radarr_1", { "plex_1": { "library_names": ["Movies"] } }]
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    fn renamerr_form() -> FormSurface {
        let registry = SchemaRegistry::standard();
        let schema = registry.module("poster_renamerr").unwrap();
        assemble(schema, renamerr_config(), &root(), 1)
    }

    #[test]
    fn units_follow_schema_order() {
        let form = renamerr_form();
        let names: Vec<&str> = form.units().iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names[0], "log_level");
        assert_eq!(names[1], "dry_run");
        assert_eq!(*names.last().unwrap(), "destination_dir");
    }

    #[test]
    fn handled_elsewhere_keys_go_to_dedicated_blocks() {
        let form = renamerr_form();
        assert!(form.units().iter().all(|u| u.name != "instances"));
        assert_eq!(form.blocks().len(), 1);
        assert_eq!(form.blocks()[0].name, "instances");
        assert_eq!(form.all_units().next().unwrap().name, "instances");
    }

    #[test]
    fn unedited_form_reads_back_its_config() {
        let form = renamerr_form();
        assert_eq!(form.read_back(), renamerr_config());
    }

    /// One config per module holding every field of its schema.
    fn full_config(registry: &SchemaRegistry, module: &str) -> Value {
        match module {
            "main" => json!({ "log_level": "info", "theme": "dark" }),
            "sync_gdrive" => json!({
                "log_level": "debug",
                "client_id": "abc.apps.googleusercontent.com",
                "client_secret": "s3cret",
                "token": { "access_token": "ya29", "expiry": "2025-01-01T00:00:00Z" },
                "gdrive_sa_location": null,
                "gdrive_list": [
                    { "name": "Movies", "id": "1AbC", "location": "/posters/movies" },
                    { "id": "2DeF", "location": "/posters/tv", "extra": true }
                ]
            }),
            "poster_renamerr" => Value::Object(renamerr_config()),
            "poster_cleanarr" => json!({
                "log_level": "info",
                "dry_run": true,
                "mode": "report",
                "plex_path": "/plex",
                "ignore_media": ["Movie A (2001)", "Show B"],
                "instances": ["plex_1"]
            }),
            "border_replacerr" => json!({
                "log_level": "info",
                "dry_run": false,
                "source_dirs": ["/posters"],
                "destination_dir": "/bordered",
                "border_width": 26,
                "skip": false,
                "border_colors": ["#FF0000", "#00ff00"],
                "exclusion_list": []
            }),
            "unmatched_assets" => json!({
                "log_level": "warning",
                "source_dirs": ["/posters", "/kometa"],
                "ignore_root_folders": ["/media/anime"],
                "instances": ["radarr_1", "sonarr_1", "plex_1"]
            }),
            "nohl" => json!({
                "log_level": "info",
                "dry_run": true,
                "searches": 10000,
                "print_files": true,
                "source_dirs": ["/media/movies", { "path": "/media/tv", "mode": "resolve" }],
                "exclude_profiles": ["Remux"],
                "instances": ["radarr_1", "sonarr_1"]
            }),
            "labelarr" => json!({
                "log_level": "info",
                "dry_run": false,
                "mappings": [
                    { "app_instance": "sonarr_1", "labels": "kids", "plex_instances": "plex_1" }
                ]
            }),
            "upgradinatorr" => json!({
                "log_level": "info",
                "dry_run": false,
                "instances_list": [{
                    "instance": "radarr_1",
                    "count": 3,
                    "tag_name": "checked",
                    "ignore_tag": "ignore",
                    "unattended": true
                }]
            }),
            "renameinatorr" => json!({
                "log_level": "error",
                "dry_run": false,
                "rename_folders": true,
                "count": 1.5,
                "tag_name": "renamed",
                "instances": ["sonarr_1"]
            }),
            "health_checkarr" => json!({
                "log_level": "critical",
                "dry_run": true,
                "instances": ["radarr_1"]
            }),
            "jduparr" => json!({ "log_level": "info", "dry_run": false, "source_dirs": ["/media"] }),
            "schedule" => Value::Object(
                registry
                    .schedulable_modules()
                    .enumerate()
                    .map(|(i, key)| {
                        let value = if i % 2 == 0 { json!("daily(03:00)") } else { Value::Null };
                        (key.to_string(), value)
                    })
                    .collect(),
            ),
            other => panic!("no fixture for module '{other}'"),
        }
    }

    #[test]
    fn every_unedited_module_reads_back_its_config() {
        let registry = SchemaRegistry::standard();
        let keys = registry
            .modules()
            .iter()
            .map(|m| m.key.as_str())
            .chain(["schedule"]);
        for key in keys {
            let schema = registry.module(key).unwrap();
            let config = full_config(&registry, key).as_object().cloned().unwrap();
            let mut fixture_keys: Vec<&str> = config.keys().map(String::as_str).collect();
            let mut schema_keys: Vec<&str> = schema.fields.iter().map(|f| f.key.as_str()).collect();
            fixture_keys.sort_unstable();
            schema_keys.sort_unstable();
            assert_eq!(fixture_keys, schema_keys, "fixture for '{key}' must cover every field");

            let form = assemble(schema, config.clone(), &root(), 1);
            assert_eq!(form.read_back(), config, "read-back of '{key}'");
        }
    }

    #[test]
    fn list_textarea_edit_keeps_a_list() {
        let registry = SchemaRegistry::standard();
        let schema = registry.module("poster_cleanarr").unwrap();
        let config = full_config(&registry, "poster_cleanarr").as_object().cloned().unwrap();
        let mut form = assemble(schema, config, &root(), 1);
        assert_matches!(
            form.unit("ignore_media").map(|u| &u.control),
            Some(Control::Input { text, .. }) if text == "Movie A (2001)\nShow B"
        );

        let outcome = form
            .apply(FieldEdit::SetText {
                key: "ignore_media".into(),
                text: "Movie A (2001)\nShow B\nShow C\n".into(),
            })
            .unwrap();
        assert_eq!(outcome, EditOutcome::Changed);
        assert_eq!(
            form.config()["ignore_media"],
            json!(["Movie A (2001)", "Show B", "Show C"])
        );
    }

    #[test]
    fn edits_write_back_synchronously() {
        let mut form = renamerr_form();
        let outcome = form
            .apply(FieldEdit::SetText {
                key: "destination_dir".into(),
                text: "/new".into(),
            })
            .unwrap();
        assert_eq!(outcome, EditOutcome::Changed);
        assert_eq!(form.config()["destination_dir"], json!("/new"));
    }

    #[test]
    fn same_value_is_unchanged() {
        let mut form = renamerr_form();
        let outcome = form
            .apply(FieldEdit::SetToggle {
                key: "dry_run".into(),
                checked: true,
            })
            .unwrap();
        assert_eq!(outcome, EditOutcome::Unchanged);
    }

    #[test]
    fn adding_blank_entry_is_a_structural_change() {
        let mut form = renamerr_form();
        let outcome = form
            .apply(FieldEdit::AddEntry {
                key: "source_dirs".into(),
            })
            .unwrap();
        assert_eq!(outcome, EditOutcome::Changed);
        assert_eq!(form.config()["source_dirs"], json!(["/posters/a", "/posters/b"]));
    }

    #[test]
    fn dropdown_rejects_values_outside_options() {
        let mut form = renamerr_form();
        assert_matches!(
            form.apply(FieldEdit::Select {
                key: "action_type".into(),
                value: Some("teleport".into()),
            }),
            Err(CoreError::Validation(_))
        );
        assert_eq!(form.config()["action_type"], json!("copy"));
    }

    #[test]
    fn mismatched_edit_is_rejected() {
        let mut form = renamerr_form();
        assert_matches!(
            form.apply(FieldEdit::SetToggle {
                key: "destination_dir".into(),
                checked: true,
            }),
            Err(CoreError::Validation(msg)) if msg.contains("destination_dir")
        );
        assert_matches!(
            form.apply(FieldEdit::SetText {
                key: "nope".into(),
                text: String::new(),
            }),
            Err(CoreError::UnknownField { .. })
        );
    }

    #[test]
    fn complex_list_removal_requires_confirmation() {
        let registry = SchemaRegistry::standard();
        let schema = registry.module("labelarr").unwrap();
        let config = json!({
            "log_level": "info",
            "dry_run": false,
            "mappings": [
                { "app_instance": "radarr_1", "labels": "kids" },
                { "app_instance": "sonarr_1", "labels": "anime" }
            ]
        });
        let mut form = assemble(schema, config.as_object().cloned().unwrap(), &root(), 1);

        let outcome = form
            .apply(FieldEdit::RemoveEntry {
                key: "mappings".into(),
                index: 1,
            })
            .unwrap();
        assert_matches!(outcome, EditOutcome::ConfirmationRequired(p) if p.summary == "sonarr_1");
        assert_eq!(form.config()["mappings"].as_array().unwrap().len(), 2);

        assert_eq!(form.apply(FieldEdit::CancelRemoval).unwrap(), EditOutcome::Unchanged);
        assert!(form.pending_removal().is_none());
        assert_matches!(form.apply(FieldEdit::ConfirmRemoval), Err(CoreError::Validation(_)));

        form.apply(FieldEdit::RemoveEntry {
            key: "mappings".into(),
            index: 1,
        })
        .unwrap();
        assert_eq!(form.apply(FieldEdit::ConfirmRemoval).unwrap(), EditOutcome::Changed);
        assert_eq!(
            form.config()["mappings"],
            json!([{ "app_instance": "radarr_1", "labels": "kids" }])
        );
    }

    #[test]
    fn library_loading_does_not_change_the_value() {
        let mut form = renamerr_form();
        assert_eq!(
            form.pending_library_fetches(),
            vec![("instances".to_string(), "plex_1".to_string())]
        );
        let outcome = form
            .apply(FieldEdit::LibrariesLoaded {
                key: "instances".into(),
                instance: "plex_1".into(),
                libraries: vec!["Movies".into(), "TV".into()],
            })
            .unwrap();
        assert_eq!(outcome, EditOutcome::Unchanged);
        assert!(form.pending_library_fetches().is_empty());
    }

    #[test]
    fn mark_invalid_and_first_invalid_follow_display_order() {
        let mut form = renamerr_form();
        form.mark_invalid(&[
            FieldError::new("destination_dir", "required"),
            FieldError::new("instances", "required"),
        ]);
        assert_eq!(form.first_invalid(), Some("instances"));
        assert_eq!(form.unit("destination_dir").unwrap().error.as_deref(), Some("required"));

        form.mark_invalid(&[]);
        assert_eq!(form.first_invalid(), None);
    }
}
