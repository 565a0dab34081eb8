//! Explicit application state.
//!
//! Owns the config document, the open form, its load-time snapshot, the
//! dirty flag and the save state machine. Every mutation goes through a
//! method here so the console loop never touches the pieces directly.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dirty::{DirtyTracker, NavigationCheck};
use crate::error::CoreError;
use crate::form::{assemble, EditOutcome, FieldEdit, FormSurface};
use crate::payload::{self, ConflictPolicy, ModuleKind, PayloadContext, PayloadError};
use crate::save::{SaveEvent, SaveState};
use crate::schema::SchemaRegistry;
use crate::validation::{validate_form, FieldError};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Answer to the unsaved-changes prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsavedChoice {
    Discard,
    Stay,
}

/// Side effects to run after a module saved successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "hook", rename_all = "snake_case")]
pub enum PostSaveHook {
    ApplyTheme { theme: String },
}

/// Everything the network layer needs to persist one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub kind: ModuleKind,
    pub generation: u64,
    /// Module config at submit time.
    pub edited: Map<String, Value>,
    pub snapshot: Map<String, Value>,
}

impl SaveRequest {
    pub fn module(&self) -> &str {
        self.kind.key()
    }

    /// The schedule payload needs the server's current schedule; other kinds
    /// ignore `latest_schedule`.
    pub fn payload(
        &self,
        latest_schedule: Option<&Map<String, Value>>,
        conflict_policy: ConflictPolicy,
    ) -> Result<Value, PayloadError> {
        let ctx = PayloadContext {
            snapshot: Some(&self.snapshot),
            latest_schedule,
            conflict_policy,
        };
        payload::build(&self.kind, &self.edited, &ctx)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// A save is already underway.
    Ignored,
    Invalid {
        errors: Vec<FieldError>,
        first: String,
    },
    Ready(SaveRequest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { hooks: Vec<PostSaveHook> },
    Failed { message: String },
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AppState {
    registry: SchemaRegistry,
    root: Value,
    form: Option<FormSurface>,
    snapshot: Map<String, Value>,
    dirty: DirtyTracker,
    save: SaveState,
    generation: u64,
    pending_navigation: Option<String>,
}

impl AppState {
    pub fn new(registry: SchemaRegistry) -> Self {
        Self {
            registry,
            root: Value::Object(Map::new()),
            form: None,
            snapshot: Map::new(),
            dirty: DirtyTracker::new(),
            save: SaveState::Idle,
            generation: 0,
            pending_navigation: None,
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// The full config document as last fetched or saved.
    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn form(&self) -> Option<&FormSurface> {
        self.form.as_ref()
    }

    pub fn snapshot(&self) -> &Map<String, Value> {
        &self.snapshot
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_dirty()
    }

    pub fn save_state(&self) -> &SaveState {
        &self.save
    }

    pub fn pending_navigation(&self) -> Option<&str> {
        self.pending_navigation.as_deref()
    }

    /// Replace the config document. Anything other than an object is
    /// treated as empty.
    pub fn load_root(&mut self, document: Value) {
        self.root = match document {
            Value::Object(map) => Value::Object(map),
            _ => Value::Object(Map::new()),
        };
    }

    /// Overwrite one top-level key of the document after it was persisted.
    pub fn set_root_entry(&mut self, key: &str, value: Value) {
        if let Value::Object(map) = &mut self.root {
            map.insert(key.to_string(), value);
        }
    }

    /// Assemble a fresh form for `key` from the document. Any earlier form is
    /// dropped along with its generation.
    pub fn open_module(&mut self, key: &str) -> Result<&FormSurface, CoreError> {
        let schema = self.registry.module(key)?;
        let config = self
            .root
            .get(key)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        self.generation += 1;
        let form = assemble(schema, config.clone(), &self.root, self.generation);
        self.snapshot = config;
        self.dirty = DirtyTracker::new();
        self.save = SaveState::Idle;
        Ok(self.form.insert(form))
    }

    /// Drop the open form, for views that have no module form. Edits and
    /// saves addressed to it are rejected afterwards.
    pub fn close_module(&mut self) {
        self.generation += 1;
        self.form = None;
        self.snapshot = Map::new();
        self.dirty = DirtyTracker::new();
        self.save = SaveState::Idle;
    }

    /// Apply an edit addressed to form `generation`.
    pub fn apply(&mut self, generation: u64, edit: FieldEdit) -> Result<EditOutcome, CoreError> {
        let form = self.open_form_mut()?;
        if form.generation() != generation {
            return Err(CoreError::StaleForm {
                edit: generation,
                current: form.generation(),
            });
        }
        let outcome = form.apply(edit)?;
        if outcome == EditOutcome::Changed {
            self.dirty.mark_dirty();
        }
        Ok(outcome)
    }

    /// Rebuild the open form from the snapshot and clear the dirty flag.
    pub fn discard(&mut self) -> Result<&FormSurface, CoreError> {
        let module = self.open_form_mut()?.module().to_string();
        let schema = self.registry.module(&module)?;

        self.generation += 1;
        let form = assemble(schema, self.snapshot.clone(), &self.root, self.generation);
        self.dirty.discard();
        self.save = SaveState::Idle;
        Ok(self.form.insert(form))
    }

    /// Let the next navigation through regardless of unsaved edits.
    pub fn ignore_next_navigation_check(&mut self) {
        self.dirty.ignore_next_check();
    }

    /// Ask to leave for `view`. On `ConfirmRequired` the target is held until
    /// [`resolve_unsaved`](Self::resolve_unsaved).
    pub fn request_navigation(&mut self, view: impl Into<String>) -> NavigationCheck {
        let check = self.dirty.check_navigation();
        self.pending_navigation = match check {
            NavigationCheck::Proceed => None,
            NavigationCheck::ConfirmRequired => Some(view.into()),
        };
        check
    }

    /// Returns the view to navigate to, if any.
    pub fn resolve_unsaved(&mut self, choice: UnsavedChoice) -> Result<Option<String>, CoreError> {
        let Some(view) = self.pending_navigation.take() else {
            return Ok(None);
        };
        match choice {
            UnsavedChoice::Stay => Ok(None),
            UnsavedChoice::Discard => {
                if self.form.is_some() {
                    self.discard()?;
                }
                Ok(Some(view))
            }
        }
    }

    /// Run client-side validation and move the save machine forward.
    pub fn submit(&mut self) -> Result<Submission, CoreError> {
        if !self.save.accepts_submit() {
            return Ok(Submission::Ignored);
        }
        let form = self
            .form
            .as_mut()
            .ok_or_else(|| CoreError::Validation("No module is open".to_string()))?;

        self.save = self.save.transition(SaveEvent::Submit)?;
        let errors = validate_form(form);
        if !errors.is_empty() {
            form.mark_invalid(&errors);
            let first = form
                .first_invalid()
                .map(str::to_string)
                .unwrap_or_else(|| errors[0].field.clone());
            self.save = self.save.transition(SaveEvent::Invalid(errors.clone()))?;
            return Ok(Submission::Invalid { errors, first });
        }

        form.mark_invalid(&[]);
        self.save = self.save.transition(SaveEvent::Valid)?;
        Ok(Submission::Ready(SaveRequest {
            kind: ModuleKind::of(form.module()),
            generation: form.generation(),
            edited: form.config().clone(),
            snapshot: self.snapshot.clone(),
        }))
    }

    /// Record the backend's answer to `request`. `result` carries the body
    /// that was posted on success, or the backend message on failure.
    ///
    /// If the form was replaced or discarded while the request was in
    /// flight, the document is still updated but the new form's save state,
    /// snapshot and dirty flag are left alone.
    pub fn complete_save(
        &mut self,
        request: &SaveRequest,
        result: Result<Value, Option<String>>,
    ) -> Result<SaveOutcome, CoreError> {
        let current = self
            .form
            .as_ref()
            .is_some_and(|f| f.generation() == request.generation);
        let machine = if current {
            self.save.clone()
        } else {
            SaveState::Saving
        };

        let body = match result {
            Ok(body) => body,
            Err(message) => {
                let next = machine.transition(SaveEvent::Failed(message))?;
                let message = match &next {
                    SaveState::IdleWithError { message } => message.clone(),
                    _ => String::new(),
                };
                if current {
                    self.save = next;
                }
                return Ok(SaveOutcome::Failed { message });
            }
        };

        let next = machine.transition(SaveEvent::Succeeded)?;
        if let Value::Object(entries) = body {
            for (key, value) in entries {
                self.set_root_entry(&key, value);
            }
        }

        if current {
            self.save = next;
            self.snapshot = request.edited.clone();
            // Edits made while the request was in flight stay unsaved.
            if self.form.as_ref().map(FormSurface::config) == Some(&request.edited) {
                self.dirty.mark_saved();
            }
        }

        let mut hooks = Vec::new();
        if request.module() == "main" {
            if let Some(theme) = request.edited.get("theme").and_then(Value::as_str) {
                hooks.push(PostSaveHook::ApplyTheme {
                    theme: theme.to_string(),
                });
            }
        }
        Ok(SaveOutcome::Saved { hooks })
    }

    fn open_form_mut(&mut self) -> Result<&mut FormSurface, CoreError> {
        self.form
            .as_mut()
            .ok_or_else(|| CoreError::Validation("No module is open".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn state() -> AppState {
        let mut state = AppState::new(SchemaRegistry::standard());
        state.load_root(json!({
            "main": { "log_level": "info", "theme": "dark" },
            "nohl": {
                "log_level": "info",
                "dry_run": true,
                "source_dirs": [{ "path": "/media/movies", "mode": "scan" }],
                "instances": ["radarr_1"]
            },
            "health_checkarr": { "log_level": "info", "dry_run": false, "instances": [] },
            "instances": {
                "radarr": { "radarr_1": { "url": "http://r", "api": "k" } },
                "plex": { "plex_1": { "url": "http://p", "api": "k" } }
            }
        }));
        state
    }

    fn edit_dry_run(state: &mut AppState, checked: bool) -> EditOutcome {
        let generation = state.form().unwrap().generation();
        state
            .apply(
                generation,
                FieldEdit::SetToggle {
                    key: "dry_run".into(),
                    checked,
                },
            )
            .unwrap()
    }

    #[test]
    fn edits_raise_dirty_flag() {
        let mut state = state();
        state.open_module("nohl").unwrap();
        assert!(!state.is_dirty());
        assert_eq!(edit_dry_run(&mut state, false), EditOutcome::Changed);
        assert!(state.is_dirty());
        assert_eq!(state.form().unwrap().config()["dry_run"], json!(false));
    }

    #[test]
    fn stale_generation_is_rejected() {
        let mut state = state();
        let old = state.open_module("nohl").unwrap().generation();
        state.open_module("nohl").unwrap();
        assert_matches!(
            state.apply(old, FieldEdit::SetToggle { key: "dry_run".into(), checked: false }),
            Err(CoreError::StaleForm { edit, current }) if edit == old && current == old + 1
        );
        assert!(!state.is_dirty());
    }

    #[test]
    fn discard_restores_snapshot_and_clears_dirty() {
        let mut state = state();
        state.open_module("nohl").unwrap();
        let snapshot = state.snapshot().clone();
        edit_dry_run(&mut state, false);

        state.discard().unwrap();
        assert!(!state.is_dirty());
        assert_eq!(state.form().unwrap().config(), &snapshot);
        assert_eq!(state.form().unwrap().unit("dry_run").unwrap().value(), json!(true));
    }

    #[test]
    fn navigation_guard_holds_target_until_resolved() {
        let mut state = state();
        state.open_module("nohl").unwrap();
        assert_eq!(state.request_navigation("main"), NavigationCheck::Proceed);

        edit_dry_run(&mut state, false);
        assert_eq!(state.request_navigation("main"), NavigationCheck::ConfirmRequired);
        assert_eq!(state.pending_navigation(), Some("main"));

        assert_eq!(state.resolve_unsaved(UnsavedChoice::Stay).unwrap(), None);
        assert!(state.is_dirty());

        state.request_navigation("main");
        assert_eq!(
            state.resolve_unsaved(UnsavedChoice::Discard).unwrap(),
            Some("main".to_string())
        );
        assert!(!state.is_dirty());
    }

    #[test]
    fn invalid_submission_marks_fields_and_skips_saving() {
        let mut state = state();
        state.open_module("health_checkarr").unwrap();
        let submission = state.submit().unwrap();
        assert_matches!(submission, Submission::Invalid { ref first, .. } if first == "instances");
        assert_matches!(state.save_state(), SaveState::IdleWithErrors { .. });
        assert!(state.form().unwrap().unit("instances").unwrap().error.is_some());
    }

    #[test]
    fn submit_is_ignored_while_saving() {
        let mut state = state();
        state.open_module("main").unwrap();
        assert_matches!(state.submit().unwrap(), Submission::Ready(_));
        assert_eq!(state.save_state(), &SaveState::Saving);
        assert_eq!(state.submit().unwrap(), Submission::Ignored);
    }

    #[test]
    fn failed_save_keeps_dirty_and_reports_message() {
        let mut state = state();
        state.open_module("nohl").unwrap();
        edit_dry_run(&mut state, false);
        let Submission::Ready(request) = state.submit().unwrap() else {
            panic!("expected a save request");
        };
        let outcome = state
            .complete_save(&request, Err(Some("bad url".into())))
            .unwrap();
        assert_eq!(outcome, SaveOutcome::Failed { message: "bad url".into() });
        assert!(state.is_dirty());
        assert!(state.save_state().accepts_submit());
    }

    #[test]
    fn successful_save_updates_snapshot_document_and_hooks() {
        let mut state = state();
        state.open_module("main").unwrap();
        let generation = state.form().unwrap().generation();
        state
            .apply(
                generation,
                FieldEdit::Select {
                    key: "theme".into(),
                    value: Some("light".into()),
                },
            )
            .unwrap();
        let Submission::Ready(request) = state.submit().unwrap() else {
            panic!("expected a save request");
        };
        let body = request.payload(None, ConflictPolicy::default()).unwrap();
        let outcome = state.complete_save(&request, Ok(body)).unwrap();

        assert_eq!(
            outcome,
            SaveOutcome::Saved {
                hooks: vec![PostSaveHook::ApplyTheme { theme: "light".into() }]
            }
        );
        assert!(!state.is_dirty());
        assert_eq!(state.snapshot()["theme"], json!("light"));
        assert_eq!(state.root()["main"]["theme"], json!("light"));
    }

    #[test]
    fn edits_during_flight_stay_dirty() {
        let mut state = state();
        state.open_module("nohl").unwrap();
        edit_dry_run(&mut state, false);
        let Submission::Ready(request) = state.submit().unwrap() else {
            panic!("expected a save request");
        };
        edit_dry_run(&mut state, true);
        let body = request.payload(None, ConflictPolicy::default()).unwrap();
        state.complete_save(&request, Ok(body)).unwrap();
        assert!(state.is_dirty());
        assert_eq!(state.snapshot()["dry_run"], json!(false));
    }

    #[test]
    fn save_completing_after_navigation_only_updates_document() {
        let mut state = state();
        state.open_module("nohl").unwrap();
        edit_dry_run(&mut state, false);
        let Submission::Ready(request) = state.submit().unwrap() else {
            panic!("expected a save request");
        };
        state.open_module("main").unwrap();
        let body = request.payload(None, ConflictPolicy::default()).unwrap();

        assert_matches!(state.complete_save(&request, Ok(body)), Ok(SaveOutcome::Saved { .. }));
        assert_eq!(state.root()["nohl"]["dry_run"], json!(false));
        assert_eq!(state.save_state(), &SaveState::Idle);
        assert_eq!(state.snapshot()["theme"], json!("dark"));
    }

    #[test]
    fn closing_the_module_drops_the_form() {
        let mut state = state();
        state.open_module("nohl").unwrap();
        let generation = state.form().unwrap().generation();
        edit_dry_run(&mut state, false);

        state.close_module();
        assert!(state.form().is_none());
        assert!(!state.is_dirty());
        assert!(state.snapshot().is_empty());
        assert_eq!(state.save_state(), &SaveState::Idle);
        assert_matches!(state.submit(), Err(CoreError::Validation(_)));
        assert_matches!(
            state.apply(
                generation,
                FieldEdit::SetToggle {
                    key: "dry_run".into(),
                    checked: true,
                },
            ),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn unknown_module_is_an_error() {
        let mut state = state();
        assert_matches!(state.open_module("nope"), Err(CoreError::UnknownModule(_)));
        assert_matches!(state.discard(), Err(CoreError::Validation(_)));
    }
}
