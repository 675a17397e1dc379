//! Bee Gate HTTP 入口
//!
//! 启动: cargo run --bin bee-gate-web --features web
//! 会话由请求头 x-session-id 区分，缺省为 "default"

#![cfg(feature = "web")]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};

use bee_gate::api::{
    ErrorBody, InitializeRequest, InitializeResponse, MessageRequest, MessageResponse, WelcomeResponse,
};
use bee_gate::config::load_config;
use bee_gate::core::SessionError;
use bee_gate::{create_orchestrator, observability, SessionOrchestrator};

const SESSION_HEADER: &str = "x-session-id";
const DEFAULT_SESSION: &str = "default";

type ApiError = (StatusCode, Json<ErrorBody>);

fn session_id(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SESSION)
        .to_string()
}

fn error_response(err: SessionError) -> ApiError {
    let status = match &err {
        SessionError::NotInitialized => StatusCode::CONFLICT,
        SessionError::MalformedInput(_) => StatusCode::BAD_REQUEST,
        SessionError::PersistenceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        SessionError::DispatchFailure(_) | SessionError::Executor(_) | SessionError::Completion(_) => {
            StatusCode::BAD_GATEWAY
        }
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }
    (status, Json(ErrorBody::from(&err)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cfg = load_config(None)?;
    let orchestrator = Arc::new(create_orchestrator(&cfg));

    // 定期清理空闲会话
    let cleanup = Arc::clone(&orchestrator);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        interval.tick().await;
        loop {
            interval.tick().await;
            cleanup.registry().cleanup_expired().await;
        }
    });

    let app = Router::new()
        .route("/initialize", post(api_initialize))
        .route("/message", post(api_message))
        .route("/welcome", get(api_welcome))
        .route("/api/health", get(|| async { "OK" }))
        .with_state(orchestrator);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], cfg.web.port));
    tracing::info!("Bee Gate HTTP: http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn api_initialize(
    State(orchestrator): State<Arc<SessionOrchestrator>>,
    headers: HeaderMap,
    Json(req): Json<InitializeRequest>,
) -> Result<Json<InitializeResponse>, ApiError> {
    orchestrator
        .initialize(&session_id(&headers), req)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn api_message(
    State(orchestrator): State<Arc<SessionOrchestrator>>,
    headers: HeaderMap,
    Json(req): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    orchestrator
        .handle_message(&session_id(&headers), req)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn api_welcome(
    State(orchestrator): State<Arc<SessionOrchestrator>>,
    headers: HeaderMap,
) -> Json<WelcomeResponse> {
    Json(orchestrator.welcome(&session_id(&headers)).await)
}
