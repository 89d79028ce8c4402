//! Mock pipeline-execution cluster for integration tests
//!
//! Serves the same surface the real cluster exposes to the client: a
//! redirecting landing page, a form login issuing the session cookie, run
//! submission, and run status with a configurable number of `Running`
//! polls before a configurable terminal status.

// Each test binary uses a different slice of this module.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

/// Cookie the mock auth service issues
pub const SESSION_VALUE: &str = "test-session-token";

/// Behaviour knobs for one mock cluster
#[derive(Debug, Clone)]
pub struct MockOptions {
    /// Terminal status every run eventually reports
    pub terminal_status: String,

    /// Number of `Running` polls before the terminal status appears
    pub pending_polls: u64,

    /// Whether the login endpoint issues the session cookie
    pub issue_cookie: bool,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            terminal_status: "Succeeded".to_string(),
            pending_polls: 0,
            issue_cookie: true,
        }
    }
}

struct RunSim {
    polls_left: u64,
    terminal: String,
}

struct MockInner {
    options: MockOptions,
    next_run: AtomicU64,
    runs: Mutex<HashMap<String, RunSim>>,
    submitted: Mutex<Vec<Value>>,
}

type MockState = Arc<MockInner>;

/// A running mock cluster
pub struct MockCluster {
    /// Base URL clients should use as the cluster host
    pub base_url: String,

    state: MockState,
    handle: JoinHandle<()>,
}

impl MockCluster {
    /// Spawn a mock cluster with default options (immediate success)
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(MockOptions::default()).await
    }

    /// Spawn a mock cluster with explicit options
    pub async fn spawn_with(options: MockOptions) -> Result<Self> {
        let state: MockState = Arc::new(MockInner {
            options,
            next_run: AtomicU64::new(1),
            runs: Mutex::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/", get(landing))
            .route("/login", get(login_form).post(login))
            .route("/apis/v1/runs", post(create_run))
            .route("/apis/v1/runs/:id", get(run_status))
            .with_state(Arc::clone(&state));

        let port = portpicker::pick_unused_port().expect("no ports free");
        let addr = SocketAddr::from_str(&format!("127.0.0.1:{}", port))?;
        let listener = tokio::net::TcpListener::bind(addr).await?;

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Ok(Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
            handle,
        })
    }

    /// Bodies of every submitted run, in submission order
    pub fn submitted(&self) -> Vec<Value> {
        self.state.submitted.lock().unwrap().clone()
    }
}

impl Drop for MockCluster {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn landing() -> Redirect {
    Redirect::to("/login")
}

async fn login_form() -> &'static str {
    "login form"
}

async fn login(State(state): State<MockState>) -> impl IntoResponse {
    if state.options.issue_cookie {
        let cookie = format!("gantry_session={}; Path=/; HttpOnly", SESSION_VALUE);
        ([(header::SET_COOKIE, cookie)], "ok").into_response()
    } else {
        "ok".into_response()
    }
}

fn has_session(headers: &HeaderMap) -> bool {
    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(|raw| raw.contains(&format!("gantry_session={}", SESSION_VALUE)))
        .unwrap_or(false)
}

async fn create_run(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if !has_session(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "missing session"})),
        )
            .into_response();
    }

    let run_id = format!("run-{}", state.next_run.fetch_add(1, Ordering::SeqCst));
    state.runs.lock().unwrap().insert(
        run_id.clone(),
        RunSim {
            polls_left: state.options.pending_polls,
            terminal: state.options.terminal_status.clone(),
        },
    );
    state.submitted.lock().unwrap().push(body);

    Json(json!({ "run_id": run_id })).into_response()
}

async fn run_status(
    State(state): State<MockState>,
    Path(run_id): Path<String>,
) -> impl IntoResponse {
    let mut runs = state.runs.lock().unwrap();
    match runs.get_mut(&run_id) {
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "unknown run"})),
        )
            .into_response(),
        Some(sim) => {
            let status = if sim.polls_left > 0 {
                sim.polls_left -= 1;
                "Running".to_string()
            } else {
                sim.terminal.clone()
            };
            Json(json!({ "status": status })).into_response()
        }
    }
}
