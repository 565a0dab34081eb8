#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

/// One request the mock backend received.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub route: &'static str,
    pub query: HashMap<String, String>,
    pub body: Value,
}

/// Canned answers and request log shared with the handlers.
#[derive(Default)]
pub struct MockState {
    pub requests: Mutex<Vec<Recorded>>,
    responses: Mutex<HashMap<&'static str, (StatusCode, Value)>>,
}

impl MockState {
    fn answer(&self, route: &'static str, query: HashMap<String, String>, body: Value) -> (StatusCode, Json<Value>) {
        self.requests.lock().unwrap().push(Recorded { route, query, body });
        let (status, body) = self
            .responses
            .lock()
            .unwrap()
            .get(route)
            .cloned()
            .unwrap_or((StatusCode::OK, json!({})));
        (status, Json(body))
    }
}

pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<MockState>,
}

impl MockBackend {
    /// Set the status and JSON body returned for `route`.
    pub fn respond(&self, route: &'static str, status: StatusCode, body: Value) {
        self.state.responses.lock().unwrap().insert(route, (status, body));
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

type Params = Query<HashMap<String, String>>;

/// Start a mock backend on an ephemeral port.
pub async fn spawn_backend() -> MockBackend {
    let state = Arc::new(MockState::default());

    let app = Router::new()
        .route(
            "/api/config",
            get(|State(s): State<Arc<MockState>>| async move {
                s.answer("get_config", HashMap::new(), Value::Null)
            })
            .post(|State(s): State<Arc<MockState>>, Json(body): Json<Value>| async move {
                s.answer("post_config", HashMap::new(), body)
            }),
        )
        .route(
            "/api/test-instance",
            post(|State(s): State<Arc<MockState>>, Json(body): Json<Value>| async move {
                s.answer("test_instance", HashMap::new(), body)
            }),
        )
        .route(
            "/api/test-notification",
            post(|State(s): State<Arc<MockState>>, Json(body): Json<Value>| async move {
                s.answer("test_notification", HashMap::new(), body)
            }),
        )
        .route(
            "/api/status",
            get(|State(s): State<Arc<MockState>>, Query(q): Params| async move {
                s.answer("status", q, Value::Null)
            }),
        )
        .route(
            "/api/run",
            post(|State(s): State<Arc<MockState>>, Json(body): Json<Value>| async move {
                s.answer("run", HashMap::new(), body)
            }),
        )
        .route(
            "/api/cancel",
            post(|State(s): State<Arc<MockState>>, Json(body): Json<Value>| async move {
                s.answer("cancel", HashMap::new(), body)
            }),
        )
        .route(
            "/api/plex/libraries",
            get(|State(s): State<Arc<MockState>>, Query(q): Params| async move {
                s.answer("plex_libraries", q, Value::Null)
            }),
        )
        .route(
            "/api/version",
            get(|State(s): State<Arc<MockState>>| async move {
                s.answer("version", HashMap::new(), Value::Null)
            }),
        )
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
