use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

const WORKER_ID: &str = "127.0.0.1:8083";

/// Request body of `POST /connectors`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewConnector {
    pub name: String,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskId {
    pub connector: String,
    pub task: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectorInfo {
    pub name: String,
    pub config: BTreeMap<String, String>,
    pub tasks: Vec<TaskId>,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub config: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkerState {
    pub state: String,
    pub worker_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskStatus {
    pub id: u32,
    pub state: String,
    pub worker_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectorStatus {
    pub name: String,
    pub connector: WorkerState,
    pub tasks: Vec<TaskStatus>,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectorPlugin {
    pub class: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub version: String,
}

/// Error body used by Kafka Connect.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub error_code: u16,
    pub message: String,
}

/// One request as seen by the server, before routing.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Shared log of every request the server received.
#[derive(Clone, Debug, Default)]
pub struct Recorder(Arc<Mutex<Vec<RecordedRequest>>>);

impl Recorder {
    fn push(&self, request: RecordedRequest) {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).push(request);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last(&self) -> Option<RecordedRequest> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).last().cloned()
    }
}

#[derive(Clone, Debug)]
struct Connector {
    config: BTreeMap<String, String>,
    paused: bool,
}

impl Connector {
    fn task_count(&self) -> u32 {
        self.config
            .get("tasks.max")
            .and_then(|v| v.parse().ok())
            .unwrap_or(1)
    }

    fn kind(&self) -> &'static str {
        match self.config.get("connector.class") {
            Some(class) if class.contains("Sink") => "sink",
            _ => "source",
        }
    }

    fn info(&self, name: &str) -> ConnectorInfo {
        ConnectorInfo {
            name: name.to_string(),
            config: self.config.clone(),
            tasks: (0..self.task_count())
                .map(|task| TaskId {
                    connector: name.to_string(),
                    task,
                })
                .collect(),
            kind: self.kind().to_string(),
        }
    }

    fn state(&self) -> &'static str {
        if self.paused {
            "PAUSED"
        } else {
            "RUNNING"
        }
    }
}

type Db = Arc<RwLock<BTreeMap<String, Connector>>>;

/// Server state: connectors, the request log and optional credentials.
#[derive(Clone, Debug, Default)]
pub struct AppState {
    db: Db,
    recorder: Recorder,
    basic_auth: Option<String>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with connectors already deployed.
    pub fn with_connectors(mut self, connectors: impl IntoIterator<Item = NewConnector>) -> Self {
        let db = connectors
            .into_iter()
            .map(|c| {
                (
                    c.name,
                    Connector {
                        config: c.config,
                        paused: false,
                    },
                )
            })
            .collect();
        self.db = Arc::new(RwLock::new(db));
        self
    }

    /// Reject requests without these basic credentials.
    pub fn with_basic_auth(mut self, username: &str, password: &str) -> Self {
        let token = base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
        self.basic_auth = Some(format!("Basic {token}"));
        self
    }

    pub fn recorder(&self) -> Recorder {
        self.recorder.clone()
    }
}

pub fn app() -> Router {
    app_with_state(AppState::new())
}

pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/connectors", get(list_connectors).post(create_connector))
        .route("/connectors/{name}", get(get_connector).delete(delete_connector))
        .route(
            "/connectors/{name}/config",
            get(get_connector_config).put(update_connector_config),
        )
        .route("/connectors/{name}/status", get(get_connector_status))
        .route("/connectors/{name}/restart", post(restart_connector))
        .route("/connectors/{name}/pause", put(pause_connector))
        .route("/connectors/{name}/resume", put(resume_connector))
        .route("/connectors/{name}/tasks", get(get_connector_tasks))
        .route("/connectors/{name}/tasks/{task}/status", get(get_task_status))
        .route("/connectors/{name}/tasks/{task}/restart", post(restart_task))
        .route("/connector-plugins", get(list_plugins))
        .layer(middleware::from_fn_with_state(state.clone(), require_basic_auth))
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, AppState::new()).await
}

pub async fn run_with_state(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

async fn record(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };
    state.recorder.push(RecordedRequest {
        method: parts.method.to_string(),
        uri: parts.uri.to_string(),
        headers: parts
            .headers
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect(),
        body: String::from_utf8_lossy(&bytes).into_owned(),
    });
    tracing::debug!(method = %parts.method, uri = %parts.uri, "request");
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

async fn require_basic_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(expected) = state.basic_auth.as_deref() else {
        return next.run(request).await;
    };
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if presented == Some(expected) {
        return next.run(request).await;
    }
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"connect\"")],
        Json(ErrorMessage {
            error_code: 401,
            message: "Unauthorized".to_string(),
        }),
    )
        .into_response()
}

type ApiError = (StatusCode, Json<ErrorMessage>);

fn not_found(name: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorMessage {
            error_code: 404,
            message: format!("Connector {name} not found"),
        }),
    )
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "version": "3.7.0",
        "commit": "mock",
        "kafka_cluster_id": "mock-cluster"
    }))
}

async fn list_connectors(State(state): State<AppState>) -> Json<Vec<String>> {
    let db = state.db.read().await;
    Json(db.keys().cloned().collect())
}

async fn create_connector(
    State(state): State<AppState>,
    Json(input): Json<NewConnector>,
) -> Result<(StatusCode, Json<ConnectorInfo>), ApiError> {
    let mut db = state.db.write().await;
    if db.contains_key(&input.name) {
        return Err((
            StatusCode::CONFLICT,
            Json(ErrorMessage {
                error_code: 409,
                message: format!("Connector {} already exists", input.name),
            }),
        ));
    }
    let connector = Connector {
        config: input.config,
        paused: false,
    };
    let info = connector.info(&input.name);
    db.insert(input.name, connector);
    Ok((StatusCode::CREATED, Json(info)))
}

async fn get_connector(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ConnectorInfo>, ApiError> {
    let db = state.db.read().await;
    db.get(&name)
        .map(|c| Json(c.info(&name)))
        .ok_or_else(|| not_found(&name))
}

async fn delete_connector(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut db = state.db.write().await;
    db.remove(&name)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| not_found(&name))
}

async fn get_connector_config(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<BTreeMap<String, String>>, ApiError> {
    let db = state.db.read().await;
    db.get(&name)
        .map(|c| Json(c.config.clone()))
        .ok_or_else(|| not_found(&name))
}

async fn update_connector_config(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(config): Json<BTreeMap<String, String>>,
) -> (StatusCode, Json<ConnectorInfo>) {
    let mut db = state.db.write().await;
    let status = if db.contains_key(&name) {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    let connector = db.entry(name.clone()).or_insert(Connector {
        config: BTreeMap::new(),
        paused: false,
    });
    connector.config = config;
    (status, Json(connector.info(&name)))
}

async fn get_connector_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ConnectorStatus>, ApiError> {
    let db = state.db.read().await;
    let connector = db.get(&name).ok_or_else(|| not_found(&name))?;
    Ok(Json(ConnectorStatus {
        name: name.clone(),
        connector: WorkerState {
            state: connector.state().to_string(),
            worker_id: WORKER_ID.to_string(),
        },
        tasks: (0..connector.task_count())
            .map(|id| TaskStatus {
                id,
                state: connector.state().to_string(),
                worker_id: WORKER_ID.to_string(),
            })
            .collect(),
        kind: connector.kind().to_string(),
    }))
}

async fn restart_connector(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    let db = state.db.read().await;
    db.get(&name)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| not_found(&name))
}

async fn set_paused(state: &AppState, name: &str, paused: bool) -> Result<StatusCode, ApiError> {
    let mut db = state.db.write().await;
    let connector = db.get_mut(name).ok_or_else(|| not_found(name))?;
    connector.paused = paused;
    Ok(StatusCode::ACCEPTED)
}

async fn pause_connector(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    set_paused(&state, &name, true).await
}

async fn resume_connector(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    set_paused(&state, &name, false).await
}

async fn get_connector_tasks(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let db = state.db.read().await;
    let connector = db.get(&name).ok_or_else(|| not_found(&name))?;
    Ok(Json(
        (0..connector.task_count())
            .map(|task| Task {
                id: TaskId {
                    connector: name.clone(),
                    task,
                },
                config: connector.config.clone(),
            })
            .collect(),
    ))
}

fn task_not_found(name: &str, task: u32) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorMessage {
            error_code: 404,
            message: format!("Task {name}-{task} not found"),
        }),
    )
}

async fn get_task_status(
    State(state): State<AppState>,
    Path((name, task)): Path<(String, u32)>,
) -> Result<Json<TaskStatus>, ApiError> {
    let db = state.db.read().await;
    let connector = db.get(&name).ok_or_else(|| not_found(&name))?;
    if task >= connector.task_count() {
        return Err(task_not_found(&name, task));
    }
    Ok(Json(TaskStatus {
        id: task,
        state: connector.state().to_string(),
        worker_id: WORKER_ID.to_string(),
    }))
}

async fn restart_task(
    State(state): State<AppState>,
    Path((name, task)): Path<(String, u32)>,
) -> Result<StatusCode, ApiError> {
    let db = state.db.read().await;
    let connector = db.get(&name).ok_or_else(|| not_found(&name))?;
    if task >= connector.task_count() {
        return Err(task_not_found(&name, task));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_plugins() -> Json<Vec<ConnectorPlugin>> {
    Json(vec![
        ConnectorPlugin {
            class: "org.apache.kafka.connect.file.FileStreamSinkConnector".to_string(),
            kind: "sink".to_string(),
            version: "3.7.0".to_string(),
        },
        ConnectorPlugin {
            class: "org.apache.kafka.connect.file.FileStreamSourceConnector".to_string(),
            kind: "source".to_string(),
            version: "3.7.0".to_string(),
        },
    ])
}
