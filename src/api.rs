//! REST API Server for the market agent
//!
//! Exposes the orchestrator via HTTP endpoints. Each session id gets its
//! own conversation memory; collaborators are shared across sessions.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use uuid::Uuid;

use crate::agent::Orchestrator;
use crate::config::{AgentConfig, DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_IDLE_SECS};
use crate::models::ToolParams;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: Uuid,
    pub answer: String,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

type Session = Arc<Mutex<Orchestrator>>;

/// Bounds on the live session map.
#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    pub max_sessions: usize,
    pub idle_ttl: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: DEFAULT_MAX_SESSIONS,
            idle_ttl: Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
        }
    }
}

impl From<&AgentConfig> for SessionLimits {
    fn from(config: &AgentConfig) -> Self {
        Self {
            max_sessions: config.max_sessions,
            idle_ttl: config.session_idle,
        }
    }
}

struct SessionEntry {
    orchestrator: Session,
    last_used: Instant,
}

#[derive(Clone)]
pub struct ApiState {
    /// Sessions are forked from this one; it never chats itself.
    template: Arc<Orchestrator>,
    sessions: Arc<Mutex<HashMap<Uuid, SessionEntry>>>,
    limits: SessionLimits,
}

impl ApiState {
    pub fn new(template: Orchestrator) -> Self {
        Self::with_limits(template, SessionLimits::default())
    }

    pub fn with_limits(template: Orchestrator, limits: SessionLimits) -> Self {
        Self {
            template: Arc::new(template),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            limits,
        }
    }

    async fn session(&self, id: Uuid) -> Session {
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();

        if let Some(entry) = sessions.get_mut(&id) {
            entry.last_used = now;
            return entry.orchestrator.clone();
        }

        self.evict(&mut sessions, now);

        info!(session_id = %id, "Session created");
        let orchestrator = Arc::new(Mutex::new(self.template.fork()));
        sessions.insert(
            id,
            SessionEntry {
                orchestrator: orchestrator.clone(),
                last_used: now,
            },
        );
        orchestrator
    }

    /// Drop idle sessions, then the least recently used until one more fits.
    fn evict(&self, sessions: &mut HashMap<Uuid, SessionEntry>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_used) < self.limits.idle_ttl);

        while sessions.len() >= self.limits.max_sessions.max(1) {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| *id)
            else {
                break;
            };
            sessions.remove(&oldest);
        }

        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, remaining = sessions.len(), "Sessions evicted");
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Turns recorded for a session, if it exists.
    pub async fn session_turns(&self, id: Uuid) -> Option<usize> {
        let session = self
            .sessions
            .lock()
            .await
            .get(&id)
            .map(|entry| entry.orchestrator.clone())?;
        let orchestrator = session.lock().await;
        Some(orchestrator.memory().len())
    }
}

/// =============================
/// Helpers: Session Ids
/// =============================

fn stable_uuid_from_string(input: &str) -> Uuid {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}

/// UUIDs pass through, other strings hash to a stable UUID.
pub fn normalize_session_id(value: &str) -> Uuid {
    let value = value.trim();
    Uuid::parse_str(value).unwrap_or_else(|_| stable_uuid_from_string(value))
}

/// =============================
/// Health & Tool Listing
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn list_tools(State(state): State<ApiState>) -> Json<ApiResponse> {
    let registry = state.template.tools();

    let tools: Vec<Value> = registry
        .names()
        .into_iter()
        .filter_map(|name| registry.resolve(name))
        .map(|tool| {
            let actions: Vec<Value> = tool
                .actions()
                .iter()
                .map(|a| json!({ "name": a.name, "description": a.description }))
                .collect();
            json!({
                "name": tool.name(),
                "description": tool.description(),
                "actions": actions,
            })
        })
        .collect();

    Json(ApiResponse::success(tools))
}

/// =============================
/// Chat Endpoint
/// =============================

async fn chat_handler(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let message = req.message.trim();
    if message.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Message must not be empty".into())),
        );
    }

    let session_id = match req.session_id.as_deref() {
        Some(value) if !value.trim().is_empty() => normalize_session_id(value),
        _ => Uuid::new_v4(),
    };
    info!(session_id = %session_id, "Chat request");

    let session = state.session(session_id).await;
    let answer = session.lock().await.chat(message).await;

    (
        StatusCode::OK,
        Json(ApiResponse::success(ChatResponse { session_id, answer })),
    )
}

async fn clear_session(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Json<ApiResponse> {
    let session_id = normalize_session_id(&id);
    let removed = state.sessions.lock().await.remove(&session_id);

    let cleared = match removed {
        Some(entry) => {
            entry.orchestrator.lock().await.clear_memory();
            true
        }
        None => false,
    };

    info!(session_id = %session_id, cleared, "Session cleared");
    Json(ApiResponse::success(json!({
        "session_id": session_id,
        "cleared": cleared,
    })))
}

/// =============================
/// Direct Tool Endpoint
/// =============================

async fn call_tool(
    State(state): State<ApiState>,
    Path((tool, action)): Path<(String, String)>,
    body: Option<Json<Value>>,
) -> (StatusCode, Json<ApiResponse>) {
    let params: ToolParams = match body.map(|Json(value)| value) {
        None | Some(Value::Null) => ToolParams::new(),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error("Tool params must be a JSON object".into())),
            )
        }
    };

    let output = state.template.direct_tool_call(&tool, &action, params).await;

    if output.success {
        (StatusCode::OK, Json(ApiResponse::success(output.data)))
    } else {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse::error(output.error.unwrap_or_default())),
        )
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(orchestrator: Orchestrator, limits: SessionLimits) -> Router {
    router(ApiState::with_limits(orchestrator, limits))
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/tools", get(list_tools))
        .route("/api/tools/:tool/:action", post(call_tool))
        .route("/api/chat", post(chat_handler))
        .route("/api/sessions/:id", delete(clear_session))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    orchestrator: Orchestrator,
    config: &AgentConfig,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let port = config.port;
    let router = create_router(orchestrator, SessionLimits::from(config));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::GREETING_RESPONSE;
    use crate::test_support::{ScriptedLlm, StaticTool};
    use crate::tools::ToolRegistry;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn state() -> ApiState {
        state_with(SessionLimits::default())
    }

    fn state_with(limits: SessionLimits) -> ApiState {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(StaticTool::new("market_overview", json!({ "vnindex": 1250 }))));
        registry.register(Arc::new(StaticTool::failing("news_aggregator")));

        let orchestrator = Orchestrator::from_config(
            &AgentConfig::default(),
            Arc::new(ScriptedLlm::new()),
            Arc::new(registry),
        );
        ApiState::with_limits(orchestrator, limits)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(state())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_tool_listing() {
        let response = router(state())
            .oneshot(Request::builder().uri("/api/tools").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = read_json(response).await;
        let names: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|t| t["name"].as_str())
            .collect();
        assert_eq!(names, vec!["market_overview", "news_aggregator"]);
    }

    #[tokio::test]
    async fn test_chat_keeps_memory_per_session() {
        let state = state();
        let app = router(state.clone());

        let response = app
            .clone()
            .oneshot(post_json("/api/chat", json!({ "session_id": "alice", "message": "hello" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = read_json(response).await;
        let alice = normalize_session_id("alice");
        assert_eq!(body["data"]["session_id"], alice.to_string());
        assert_eq!(body["data"]["answer"], GREETING_RESPONSE);

        app.clone()
            .oneshot(post_json("/api/chat", json!({ "session_id": "alice", "message": "hi" })))
            .await
            .unwrap();
        app.oneshot(post_json("/api/chat", json!({ "session_id": "bob", "message": "hey" })))
            .await
            .unwrap();

        assert_eq!(state.session_count().await, 2);
        assert_eq!(state.session_turns(alice).await, Some(4));
        assert_eq!(state.session_turns(normalize_session_id("bob")).await, Some(2));
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let response = router(state())
            .oneshot(post_json("/api/chat", json!({ "message": "   " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_session() {
        let state = state();
        let app = router(state.clone());

        app.clone()
            .oneshot(post_json("/api/chat", json!({ "session_id": "carol", "message": "hello" })))
            .await
            .unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/sessions/carol")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(read_json(response).await["data"]["cleared"], true);
        assert_eq!(state.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_direct_tool_endpoint() {
        let app = router(state());

        let ok = app
            .clone()
            .oneshot(post_json("/api/tools/market_overview/summary", json!({})))
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(read_json(ok).await["data"]["vnindex"], 1250);

        let failed = app
            .clone()
            .oneshot(post_json("/api/tools/news_aggregator/latest", json!({})))
            .await
            .unwrap();
        assert_eq!(failed.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let bad = app
            .oneshot(post_json("/api/tools/market_overview/summary", json!([1, 2])))
            .await
            .unwrap();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_anonymous_sessions_are_capped() {
        let state = state_with(SessionLimits {
            max_sessions: 10,
            ..SessionLimits::default()
        });
        let app = router(state.clone());

        for _ in 0..50 {
            let response = app
                .clone()
                .oneshot(post_json("/api/chat", json!({ "message": "hello" })))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert_eq!(state.session_count().await, 10);
    }

    #[tokio::test]
    async fn test_least_recently_used_session_goes_first() {
        let state = state_with(SessionLimits {
            max_sessions: 2,
            ..SessionLimits::default()
        });
        let app = router(state.clone());

        for id in ["alice", "bob", "alice", "carol"] {
            app.clone()
                .oneshot(post_json("/api/chat", json!({ "session_id": id, "message": "hi" })))
                .await
                .unwrap();
        }

        assert_eq!(state.session_count().await, 2);
        assert_eq!(state.session_turns(normalize_session_id("alice")).await, Some(4));
        assert_eq!(state.session_turns(normalize_session_id("bob")).await, None);
        assert_eq!(state.session_turns(normalize_session_id("carol")).await, Some(2));
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let state = state_with(SessionLimits {
            idle_ttl: Duration::ZERO,
            ..SessionLimits::default()
        });
        let app = router(state.clone());

        for id in ["dave", "erin"] {
            app.clone()
                .oneshot(post_json("/api/chat", json!({ "session_id": id, "message": "hi" })))
                .await
                .unwrap();
        }

        assert_eq!(state.session_count().await, 1);
        assert_eq!(state.session_turns(normalize_session_id("dave")).await, None);
    }

    #[test]
    fn test_session_ids_are_stable() {
        let id = Uuid::new_v4();
        assert_eq!(normalize_session_id(&id.to_string()), id);
        assert_eq!(normalize_session_id("alice"), normalize_session_id(" alice "));
        assert_ne!(normalize_session_id("alice"), normalize_session_id("bob"));
    }
}
