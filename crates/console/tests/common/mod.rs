#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::broadcast;

use daps_client::ApiClient;
use daps_console::{Console, ConsoleConfig, ConsoleHandle, EventBus, UiEvent};

/// How long a test waits for an expected event.
const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Mock backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Recorded {
    pub route: &'static str,
    pub query: HashMap<String, String>,
    pub body: Value,
}

/// A backend holding one config document. Saves merge into it unless a
/// canned response overrides the route.
#[derive(Default)]
pub struct MockState {
    document: Mutex<Value>,
    requests: Mutex<Vec<Recorded>>,
    overrides: Mutex<HashMap<&'static str, (StatusCode, Value)>>,
    statuses: Mutex<VecDeque<bool>>,
    save_delay: Mutex<Option<Duration>>,
}

impl MockState {
    fn record(&self, route: &'static str, query: HashMap<String, String>, body: Value) {
        self.requests.lock().unwrap().push(Recorded { route, query, body });
    }

    fn canned(&self, route: &'static str) -> Option<(StatusCode, Json<Value>)> {
        self.overrides
            .lock()
            .unwrap()
            .get(route)
            .cloned()
            .map(|(status, body)| (status, Json(body)))
    }

    fn answer(&self, route: &'static str, query: HashMap<String, String>, body: Value, default: Value) -> (StatusCode, Json<Value>) {
        self.record(route, query, body);
        self.canned(route).unwrap_or((StatusCode::OK, Json(default)))
    }
}

pub struct MockBackend {
    pub base_url: String,
    state: Arc<MockState>,
}

impl MockBackend {
    pub fn set_document(&self, document: Value) {
        *self.state.document.lock().unwrap() = document;
    }

    pub fn document(&self) -> Value {
        self.state.document.lock().unwrap().clone()
    }

    /// Change one top-level key, as another client saving would.
    pub fn set_entry(&self, key: &str, value: Value) {
        if let Value::Object(map) = &mut *self.state.document.lock().unwrap() {
            map.insert(key.to_string(), value);
        }
    }

    pub fn respond(&self, route: &'static str, status: StatusCode, body: Value) {
        self.state.overrides.lock().unwrap().insert(route, (status, body));
    }

    /// Answers for successive `GET /api/status` calls. `running: false` once
    /// exhausted.
    pub fn statuses(&self, running: &[bool]) {
        self.state.statuses.lock().unwrap().extend(running.iter().copied());
    }

    pub fn delay_saves(&self, delay: Duration) {
        *self.state.save_delay.lock().unwrap() = Some(delay);
    }

    pub fn requests(&self, route: &str) -> Vec<Recorded> {
        self.state
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.route == route)
            .cloned()
            .collect()
    }
}

type Shared = State<Arc<MockState>>;
type Params = Query<HashMap<String, String>>;

async fn get_config(State(s): Shared) -> (StatusCode, Json<Value>) {
    let document = s.document.lock().unwrap().clone();
    s.answer("get_config", HashMap::new(), Value::Null, document)
}

async fn post_config(State(s): Shared, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let delay = *s.save_delay.lock().unwrap();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    s.record("post_config", HashMap::new(), body.clone());
    if let Some(canned) = s.canned("post_config") {
        return canned;
    }
    if let (Value::Object(document), Value::Object(entries)) = (&mut *s.document.lock().unwrap(), body) {
        document.extend(entries);
    }
    (StatusCode::OK, Json(json!({ "success": true })))
}

async fn status(State(s): Shared, Query(q): Params) -> (StatusCode, Json<Value>) {
    let running = s.statuses.lock().unwrap().pop_front().unwrap_or(false);
    s.answer("status", q, Value::Null, json!({ "running": running }))
}

async fn plex_libraries(State(s): Shared, Query(q): Params) -> (StatusCode, Json<Value>) {
    s.answer("plex_libraries", q, Value::Null, json!(["Movies", "TV Shows"]))
}

async fn test_instance(State(s): Shared, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    s.answer("test_instance", HashMap::new(), body, json!({}))
}

async fn test_notification(State(s): Shared, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    s.answer("test_notification", HashMap::new(), body, json!({ "ok": true }))
}

async fn run(State(s): Shared, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    s.answer("run", HashMap::new(), body, json!({}))
}

async fn version(State(s): Shared) -> (StatusCode, Json<Value>) {
    s.answer("version", HashMap::new(), Value::Null, json!({ "version": "v1.0.0" }))
}

async fn cancel(State(s): Shared, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    s.answer("cancel", HashMap::new(), body, json!({}))
}

/// Start a mock backend serving `document` on an ephemeral port.
pub async fn spawn_backend(document: Value) -> MockBackend {
    let state = Arc::new(MockState::default());
    *state.document.lock().unwrap() = document;

    let app = Router::new()
        .route("/api/config", get(get_config).post(post_config))
        .route("/api/status", get(status))
        .route("/api/plex/libraries", get(plex_libraries))
        .route("/api/test-instance", post(test_instance))
        .route("/api/test-notification", post(test_notification))
        .route("/api/run", post(run))
        .route("/api/cancel", post(cancel))
        .route("/api/version", get(version))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend {
        base_url: format!("http://{addr}"),
        state,
    }
}

// ---------------------------------------------------------------------------
// Console harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub backend: MockBackend,
    pub console: ConsoleHandle,
    pub events: broadcast::Receiver<UiEvent>,
}

/// Console settings pointed at `backend`, with a fast poll interval.
pub fn test_config(backend: &MockBackend) -> ConsoleConfig {
    ConsoleConfig {
        api_url: backend.base_url.clone(),
        request_timeout: Duration::from_secs(5),
        status_poll_interval: Duration::from_millis(20),
        ..ConsoleConfig::default()
    }
}

/// Backend plus a console pointed at it.
pub async fn start(document: Value) -> Harness {
    let backend = spawn_backend(document).await;
    let config = test_config(&backend);
    start_with(backend, config)
}

pub fn start_with(backend: MockBackend, config: ConsoleConfig) -> Harness {
    let api = ApiClient::new(config.api_url.clone(), config.request_timeout).unwrap();
    let bus = EventBus::default();
    let events = bus.subscribe();
    let console = Console::spawn(config, api, bus);
    Harness {
        backend,
        console,
        events,
    }
}

/// Receive events until one matches, returning it.
pub async fn wait_for(
    events: &mut broadcast::Receiver<UiEvent>,
    mut matches: impl FnMut(&UiEvent) -> bool,
) -> UiEvent {
    tokio::time::timeout(EVENT_TIMEOUT, async {
        loop {
            let event = events.recv().await.expect("event bus closed");
            if matches(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Navigate to a module form and return its generation.
pub async fn open_module(harness: &mut Harness, key: &str) -> u64 {
    harness
        .console
        .send(daps_console::Command::Navigate {
            view: daps_console::View::module(key),
        })
        .await
        .unwrap();
    let module = key.to_string();
    match wait_for(&mut harness.events, |e| {
        matches!(e, UiEvent::FormReady { module: m, .. } if *m == module)
    })
    .await
    {
        UiEvent::FormReady { generation, .. } => generation,
        other => panic!("unexpected event {other:?}"),
    }
}
