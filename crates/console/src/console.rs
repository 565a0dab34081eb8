//! The console loop.
//!
//! One task owns [`AppState`] and handles [`Command`]s one at a time. Network
//! work runs in spawned tasks whose results come back as internal messages,
//! so state is never touched concurrently. Feedback leaves through the
//! [`EventBus`].

use std::collections::{BTreeSet, HashMap};
use std::future::Future;

use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use daps_client::{ApiClient, InstanceTest, VersionInfo};
use daps_core::dirty::NavigationCheck;
use daps_core::form::{EditOutcome, FieldEdit};
use daps_core::notifications::{apply_update, NotificationEntry, NotificationUpdate};
use daps_core::payload::{self, ConflictPolicy, ModuleKind, PayloadContext, NOTIFICATIONS_KEY, SCHEDULE_KEY};
use daps_core::save::{SaveState, GENERIC_SAVE_ERROR};
use daps_core::schema::SchemaRegistry;
use daps_core::state::{PostSaveHook, SaveOutcome, SaveRequest, Submission, UnsavedChoice};
use daps_core::version::update_available;
use daps_core::{AppState, CoreError};

use crate::bus::{EventBus, Toast, UiEvent};
use crate::command::{Action, Command, ConsoleSnapshot, Internal, Request};
use crate::config::ConsoleConfig;
use crate::error::ConsoleError;
use crate::poller::{StatusPoller, VersionPoller};
use crate::view::View;

/// Command channel depth. Senders wait when the loop falls this far behind.
const COMMAND_BUFFER: usize = 64;

// ---------------------------------------------------------------------------
// ConsoleHandle
// ---------------------------------------------------------------------------

/// Owner-side handle to a running console loop.
pub struct ConsoleHandle {
    tx: mpsc::Sender<Request>,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl ConsoleHandle {
    pub async fn send(&self, command: Command) -> Result<(), ConsoleError> {
        self.tx
            .send(Request::Command(command))
            .await
            .map_err(|_| ConsoleError::Closed)
    }

    /// Snapshot the state after every command sent so far was handled.
    pub async fn inspect(&self) -> Result<ConsoleSnapshot, ConsoleError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Inspect(reply))
            .await
            .map_err(|_| ConsoleError::Closed)?;
        rx.await.map_err(|_| ConsoleError::Closed)
    }

    /// Stop the loop and every poller, then wait for it to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.join.await {
            tracing::error!(error = %e, "Console loop panicked");
        }
    }
}

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

pub struct Console {
    state: AppState,
    api: ApiClient,
    config: ConsoleConfig,
    bus: EventBus,
    view: Option<View>,
    in_flight: BTreeSet<Action>,
    pollers: HashMap<String, CancellationToken>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    last_dirty: bool,
    last_save: SaveState,
    last_version: Option<VersionInfo>,
}

impl Console {
    /// Read [`ConsoleConfig`] from the environment, build the client and start
    /// the loop.
    pub fn from_env(bus: EventBus) -> Result<ConsoleHandle, ConsoleError> {
        let config = ConsoleConfig::from_env()?;
        tracing::info!(
            api_url = %config.api_url,
            policy = ?config.conflict_policy,
            "Loaded console configuration"
        );
        let api = ApiClient::new(config.api_url.clone(), config.request_timeout)?;
        Ok(Self::spawn(config, api, bus))
    }

    /// Start the loop on the current runtime with the standard module schemas.
    pub fn spawn(config: ConsoleConfig, api: ApiClient, bus: EventBus) -> ConsoleHandle {
        Self::spawn_with_registry(config, api, bus, SchemaRegistry::standard())
    }

    pub fn spawn_with_registry(
        config: ConsoleConfig,
        api: ApiClient,
        bus: EventBus,
        registry: SchemaRegistry,
    ) -> ConsoleHandle {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let console = Self {
            state: AppState::new(registry),
            api,
            config,
            bus,
            view: None,
            in_flight: BTreeSet::new(),
            pollers: HashMap::new(),
            internal_tx,
            last_dirty: false,
            last_save: SaveState::Idle,
            last_version: None,
        };
        let join = tokio::spawn(console.run(rx, internal_rx, cancel.clone()));

        ConsoleHandle { tx, cancel, join }
    }

    async fn run(
        mut self,
        mut rx: mpsc::Receiver<Request>,
        mut internal_rx: mpsc::UnboundedReceiver<Internal>,
        cancel: CancellationToken,
    ) {
        tracing::info!(api_url = %self.api.base_url(), "Console loop started");

        let version_check = cancel.child_token();
        if let Some(interval) = self.config.version_check_interval {
            VersionPoller::new(self.api.clone(), interval)
                .spawn(version_check.clone(), self.internal_tx.clone());
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                request = rx.recv() => match request {
                    None | Some(Request::Command(Command::Shutdown)) => break,
                    Some(Request::Inspect(reply)) => {
                        let _ = reply.send(self.snapshot());
                    }
                    Some(Request::Command(command)) => self.handle_command(command),
                },
                Some(message) = internal_rx.recv() => self.handle_internal(message),
            }
            self.sync();
        }

        version_check.cancel();
        self.stop_polling();
        tracing::info!("Console loop stopped");
    }

    fn snapshot(&self) -> ConsoleSnapshot {
        let mut polling: Vec<String> = self.pollers.keys().cloned().collect();
        polling.sort();
        ConsoleSnapshot {
            view: self.view.clone(),
            dirty: self.state.is_dirty(),
            save_state: self.state.save_state().clone(),
            form: self.state.form().cloned(),
            document: self.state.root().clone(),
            in_flight: self.in_flight.iter().cloned().collect(),
            polling,
        }
    }

    /// Publish dirty-flag and save-state changes since the last message.
    fn sync(&mut self) {
        let dirty = self.state.is_dirty();
        if dirty != self.last_dirty {
            self.last_dirty = dirty;
            self.bus.publish(UiEvent::DirtyChanged { dirty });
        }
        if self.state.save_state() != &self.last_save {
            self.last_save = self.state.save_state().clone();
            self.bus.publish(UiEvent::SaveState {
                state: self.last_save.clone(),
            });
        }
    }

    // ---- in-flight bookkeeping ----

    /// Mark `action` in flight. Returns `false` if it already was.
    fn begin(&mut self, action: Action) -> bool {
        if self.in_flight.contains(&action) {
            tracing::debug!(?action, "Ignoring repeated command while in flight");
            return false;
        }
        self.in_flight.insert(action);
        true
    }

    fn finish(&mut self, action: &Action) {
        self.in_flight.remove(action);
    }

    /// Show `error` as an error toast.
    fn report(&self, error: impl Into<ConsoleError>) {
        let error = error.into();
        tracing::debug!(error = %error, "Reporting error to the user");
        self.bus.toast(Toast::error(error.user_message()));
    }

    fn spawn_work<F>(&self, work: F)
    where
        F: Future<Output = Internal> + Send + 'static,
    {
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            // The loop only drops its receiver on shutdown.
            let _ = tx.send(work.await);
        });
    }

    // ---- commands ----

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Navigate { view } => self.navigate(view),
            Command::ResolveUnsaved { choice } => self.resolve_unsaved(choice),
            Command::Edit { generation, edit } => self.edit(generation, edit),
            Command::Save => self.save(),
            Command::Discard => self.discard(),
            Command::TestInstance { test } => self.test_instance(test),
            Command::SaveInstances { instances } => self.save_instances(instances),
            Command::TestNotification { entry } => self.test_notification(entry),
            Command::UpdateNotification { update } => self.update_notification(update),
            Command::RunModule { module, open_logs } => self.run_module(module, open_logs),
            Command::CancelRun { module } => self.cancel_run(module),
            Command::Shutdown => {}
        }
    }

    fn navigate(&mut self, view: View) {
        match self.state.request_navigation(view.to_string()) {
            NavigationCheck::Proceed => self.enter(view),
            NavigationCheck::ConfirmRequired => {
                tracing::debug!(target_view = %view, "Unsaved changes, asking before leaving");
                self.bus.publish(UiEvent::ConfirmUnsaved { target: view });
            }
        }
    }

    fn resolve_unsaved(&mut self, choice: UnsavedChoice) {
        match self.state.resolve_unsaved(choice) {
            Ok(Some(target)) => match target.parse::<View>() {
                Ok(view) => self.enter(view),
                Err(e) => tracing::warn!(error = %e, "Pending navigation target is invalid"),
            },
            Ok(None) => {}
            Err(e) => self.report(e),
        }
    }

    /// Switch views unconditionally. Pollers belong to the view being left,
    /// and views without a module form close the open one.
    fn enter(&mut self, view: View) {
        self.stop_polling();
        if view.module_key().is_none() {
            self.state.close_module();
        }
        self.view = Some(view.clone());
        self.bus.publish(UiEvent::ViewChanged { view: view.clone() });

        if view.needs_config() {
            let api = self.api.clone();
            self.spawn_work(async move {
                let document = api.fetch_config().await;
                Internal::ConfigLoaded { view, document }
            });
        }
    }

    fn edit(&mut self, generation: u64, edit: FieldEdit) {
        match self.state.apply(generation, edit) {
            Ok(EditOutcome::ConfirmationRequired(removal)) => {
                self.bus.publish(UiEvent::ConfirmRemoval { removal });
            }
            Ok(_) => self.load_libraries(),
            Err(CoreError::StaleForm { edit, current }) => {
                tracing::debug!(edit, current, "Ignoring edit addressed to a replaced form");
            }
            Err(e) => self.report(e),
        }
    }

    fn save(&mut self) {
        if self.in_flight.contains(&Action::Save) {
            tracing::debug!("Ignoring save while a save is in flight");
            return;
        }
        match self.state.submit() {
            Ok(Submission::Ignored) => tracing::debug!("Ignoring save while a save is in flight"),
            Ok(Submission::Invalid { errors, first }) => {
                tracing::debug!(count = errors.len(), first = %first, "Validation failed, not saving");
                self.bus.publish(UiEvent::ScrollTo { field: first });
            }
            Ok(Submission::Ready(request)) => {
                self.begin(Action::Save);
                let api = self.api.clone();
                let policy = self.config.conflict_policy;
                self.spawn_work(async move {
                    let result = persist(&api, &request, policy).await;
                    Internal::Saved { request, result }
                });
            }
            Err(e) => self.report(e),
        }
    }

    fn discard(&mut self) {
        match self.state.discard() {
            Ok(form) => {
                self.bus.publish(UiEvent::FormReady {
                    module: form.module().to_string(),
                    generation: form.generation(),
                });
                self.load_libraries();
            }
            Err(e) => self.report(e),
        }
    }

    fn test_instance(&mut self, test: InstanceTest) {
        if !self.begin(Action::TestInstance {
            name: test.name.clone(),
        }) {
            return;
        }
        let api = self.api.clone();
        self.spawn_work(async move {
            let result = api.test_instance(&test).await;
            Internal::InstanceTested {
                name: test.name,
                result,
            }
        });
    }

    fn save_instances(&mut self, instances: Map<String, Value>) {
        if self.in_flight.contains(&Action::SaveInstances) {
            tracing::debug!("Ignoring instances save while one is in flight");
            return;
        }
        match payload::build(&ModuleKind::Instances, &instances, &PayloadContext::default()) {
            Ok(body) => self.save_document(Action::SaveInstances, body),
            Err(e) => self.report(e),
        }
    }

    fn update_notification(&mut self, update: NotificationUpdate) {
        if self.in_flight.contains(&Action::SaveNotifications) {
            tracing::debug!("Ignoring notification update while one is in flight");
            return;
        }
        if let NotificationUpdate::Upsert(entry) = &update {
            if let Some(message) = entry_errors(entry) {
                self.bus.toast(Toast::error(message));
                return;
            }
        }

        let current = self
            .state
            .root()
            .get(NOTIFICATIONS_KEY)
            .cloned()
            .unwrap_or(Value::Null);
        let body = apply_update(&current, &update).and_then(|map| {
            payload::build(&ModuleKind::Notifications, &map, &PayloadContext::default())
        });
        match body {
            Ok(body) => self.save_document(Action::SaveNotifications, body),
            Err(e) => self.report(e),
        }
    }

    fn save_document(&mut self, action: Action, body: Value) {
        if !self.begin(action.clone()) {
            return;
        }
        let api = self.api.clone();
        self.spawn_work(async move {
            let result = api.save_config(&body).await;
            Internal::DocumentSaved {
                action,
                body,
                result,
            }
        });
    }

    fn test_notification(&mut self, entry: NotificationEntry) {
        if let Some(message) = entry_errors(&entry) {
            self.bus.toast(Toast::error(message));
            return;
        }
        if !self.begin(Action::TestNotification {
            module: entry.module.clone(),
            kind: entry.kind.clone(),
        }) {
            return;
        }
        let api = self.api.clone();
        self.spawn_work(async move {
            let result = api.test_notification(&entry.test_request_body()).await;
            Internal::NotificationTested {
                module: entry.module,
                kind: entry.kind,
                result,
            }
        });
    }

    fn run_module(&mut self, module: String, open_logs: bool) {
        if !self.state.registry().schedulable_modules().any(|m| m == module) {
            self.bus.toast(Toast::error(format!("Unknown module: {module}")));
            return;
        }
        if !self.begin(Action::Run {
            module: module.clone(),
        }) {
            return;
        }
        let api = self.api.clone();
        self.spawn_work(async move {
            let result = api.run(&module).await;
            Internal::RunStarted {
                module,
                open_logs,
                result,
            }
        });
    }

    fn cancel_run(&mut self, module: String) {
        if !self.begin(Action::Cancel {
            module: module.clone(),
        }) {
            return;
        }
        let api = self.api.clone();
        self.spawn_work(async move {
            let result = api.cancel(&module).await;
            Internal::RunCancelled { module, result }
        });
    }

    /// Fetch libraries for every selected Plex instance that has none loaded.
    fn load_libraries(&mut self) {
        let Some(form) = self.state.form() else {
            return;
        };
        let generation = form.generation();
        for (key, instance) in form.pending_library_fetches() {
            if !self.begin(Action::LoadLibraries {
                instance: instance.clone(),
            }) {
                continue;
            }
            let api = self.api.clone();
            self.spawn_work(async move {
                let result = api.plex_libraries(&instance).await;
                Internal::LibrariesLoaded {
                    generation,
                    key,
                    instance,
                    result,
                }
            });
        }
    }

    // ---- results ----

    fn handle_internal(&mut self, message: Internal) {
        match message {
            Internal::ConfigLoaded { view, document } => self.config_loaded(view, document),
            Internal::Saved { request, result } => self.saved(request, result),
            Internal::DocumentSaved {
                action,
                body,
                result,
            } => {
                self.finish(&action);
                let what = match action {
                    Action::SaveInstances => "Instances",
                    _ => "Notifications",
                };
                match result {
                    Ok(()) => {
                        if let Value::Object(entries) = body {
                            for (key, value) in entries {
                                self.state.set_root_entry(&key, value);
                            }
                        }
                        tracing::info!(what, "Saved settings document");
                        self.bus.toast(Toast::success(format!("{what} saved")));
                    }
                    Err(e) => {
                        tracing::warn!(what, error = %e, "Failed to save settings document");
                        let message = e.backend_message().unwrap_or(GENERIC_SAVE_ERROR);
                        self.bus.toast(Toast::error(message));
                    }
                }
            }
            Internal::InstanceTested { name, result } => {
                self.finish(&Action::TestInstance { name: name.clone() });
                match result {
                    Ok(()) => self.bus.toast(Toast::success(format!("Connected to {name}"))),
                    Err(e) => self.bus.toast(Toast::error(format!(
                        "Connection to {name} failed: {}",
                        ConsoleError::from(e).user_message()
                    ))),
                }
            }
            Internal::NotificationTested {
                module,
                kind,
                result,
            } => {
                self.finish(&Action::TestNotification {
                    module,
                    kind: kind.clone(),
                });
                match result {
                    Ok(r) if r.ok => self.bus.toast(Toast::success(
                        r.message
                            .unwrap_or_else(|| format!("Test {kind} notification sent")),
                    )),
                    Ok(r) => self.bus.toast(Toast::error(
                        r.message
                            .unwrap_or_else(|| format!("Test {kind} notification failed")),
                    )),
                    Err(e) => self.report(e),
                }
            }
            Internal::RunStarted {
                module,
                open_logs,
                result,
            } => {
                self.finish(&Action::Run {
                    module: module.clone(),
                });
                match result {
                    Ok(()) => {
                        tracing::info!(module = %module, "Module run started");
                        self.bus.toast(Toast::info(format!("{module} started")));
                        if open_logs {
                            self.state.ignore_next_navigation_check();
                            self.navigate(View::Logs {
                                module: Some(module.clone()),
                            });
                        }
                        self.start_polling(module);
                    }
                    Err(e) => self.report(e),
                }
            }
            Internal::RunCancelled { module, result } => {
                self.finish(&Action::Cancel {
                    module: module.clone(),
                });
                match result {
                    Ok(()) => self.bus.toast(Toast::info(format!("{module} cancelled"))),
                    Err(e) => self.report(e),
                }
            }
            Internal::LibrariesLoaded {
                generation,
                key,
                instance,
                result,
            } => {
                self.finish(&Action::LoadLibraries {
                    instance: instance.clone(),
                });
                let libraries = match result {
                    Ok(libraries) => libraries,
                    Err(e) => {
                        self.bus.toast(Toast::error(format!(
                            "Failed to load libraries for {instance}: {}",
                            ConsoleError::from(e).user_message()
                        )));
                        return;
                    }
                };
                let edit = FieldEdit::LibrariesLoaded {
                    key,
                    instance,
                    libraries,
                };
                match self.state.apply(generation, edit) {
                    Ok(_) => {
                        if let Some(form) = self.state.form() {
                            self.bus.publish(UiEvent::FormUpdated {
                                module: form.module().to_string(),
                                generation,
                            });
                        }
                    }
                    Err(CoreError::StaleForm { .. }) => {
                        tracing::debug!(generation, "Dropping libraries for a replaced form");
                    }
                    Err(e) => tracing::warn!(error = %e, "Failed to apply loaded libraries"),
                }
            }
            Internal::RunStatus { module, running } => {
                if !self.pollers.contains_key(&module) {
                    return;
                }
                self.bus.publish(UiEvent::RunState {
                    module: module.clone(),
                    running,
                });
                if !running {
                    if let Some(token) = self.pollers.remove(&module) {
                        token.cancel();
                    }
                    tracing::info!(module = %module, "Module run finished");
                }
            }
            Internal::VersionChecked { info } => self.version_checked(info),
        }
    }

    fn config_loaded(&mut self, view: View, document: Value) {
        if self.view.as_ref() != Some(&view) {
            tracing::debug!(view = %view, "Dropping config for a view that was left");
            return;
        }
        self.state.load_root(document);
        self.bus.publish(UiEvent::DocumentLoaded { view: view.clone() });

        let Some(key) = view.module_key() else {
            return;
        };
        match self.state.open_module(key) {
            Ok(form) => {
                tracing::debug!(module = %key, generation = form.generation(), "Form assembled");
                self.bus.publish(UiEvent::FormReady {
                    module: form.module().to_string(),
                    generation: form.generation(),
                });
                self.load_libraries();
            }
            Err(e) => self.report(e),
        }
    }

    fn version_checked(&mut self, info: VersionInfo) {
        if self.last_version.as_ref() == Some(&info) {
            return;
        }
        let update = info
            .latest
            .as_deref()
            .is_some_and(|latest| update_available(&info.version, latest));
        if update {
            tracing::info!(current = %info.version, latest = ?info.latest, "Update available");
        }
        self.bus.publish(UiEvent::Version {
            current: info.version.clone(),
            latest: info.latest.clone(),
            update_available: update,
        });
        self.last_version = Some(info);
    }

    fn saved(&mut self, request: SaveRequest, result: Result<Value, Option<String>>) {
        self.finish(&Action::Save);
        match self.state.complete_save(&request, result) {
            Ok(SaveOutcome::Saved { hooks }) => {
                tracing::info!(module = %request.module(), "Saved module config");
                self.bus.toast(Toast::success("Settings saved"));
                for hook in hooks {
                    match hook {
                        PostSaveHook::ApplyTheme { theme } => {
                            self.bus.publish(UiEvent::ApplyTheme { theme });
                        }
                    }
                }
            }
            Ok(SaveOutcome::Failed { message }) => {
                tracing::warn!(module = %request.module(), message = %message, "Save failed");
                self.bus.toast(Toast::error(message));
            }
            Err(e) => tracing::error!(error = %e, "Save result arrived in an unexpected state"),
        }
    }

    // ---- polling ----

    fn start_polling(&mut self, module: String) {
        if self.pollers.contains_key(&module) {
            return;
        }
        let token = CancellationToken::new();
        StatusPoller::new(self.api.clone(), module.clone(), self.config.status_poll_interval)
            .spawn(token.clone(), self.internal_tx.clone());
        self.pollers.insert(module, token);
    }

    fn stop_polling(&mut self) {
        for (module, token) in self.pollers.drain() {
            tracing::debug!(module = %module, "Stopping status poller");
            token.cancel();
        }
    }
}

/// Build and post the payload for `request`. Errors carry the message to
/// show, or `None` for the generic fallback.
async fn persist(
    api: &ApiClient,
    request: &SaveRequest,
    policy: ConflictPolicy,
) -> Result<Value, Option<String>> {
    let latest = if request.kind == ModuleKind::Schedule {
        let document = api.get_config().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to re-fetch schedule before saving");
            Some(format!(
                "Failed to load the current schedule: {}",
                ConsoleError::from(e).user_message()
            ))
        })?;
        Some(
            document
                .get(SCHEDULE_KEY)
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        )
    } else {
        None
    };

    let body = request
        .payload(latest.as_ref(), policy)
        .map_err(|e| Some(ConsoleError::from(e).user_message()))?;

    api.save_config(&body).await.map_err(|e| {
        tracing::warn!(module = %request.module(), error = %e, "Backend rejected save");
        e.backend_message().map(str::to_string)
    })?;
    Ok(body)
}

fn entry_errors(entry: &NotificationEntry) -> Option<String> {
    let errors = entry.validate();
    if errors.is_empty() {
        return None;
    }
    Some(
        errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; "),
    )
}
