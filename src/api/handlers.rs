//! HTTP request handlers

use super::types::{
    ChatRequest, ChatResponse, CreateSessionRequest, ErrorResponse, ListSessionsQuery,
    SessionListResponse, SessionResponse, SessionWithMessagesResponse, SuccessResponse,
    ToolsResponse,
};
use super::AppState;
use crate::db::DbError;
use crate::runtime::RunnerError;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Session lifecycle
        .route("/api/sessions", get(list_sessions).post(create_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/delete", post(delete_session))
        // Conversation
        .route("/api/sessions/:id/chat", post(send_chat))
        // Tool info
        .route("/api/tools", get(list_tools))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Sessions
// ============================================================

async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    if req.user_id.trim().is_empty() {
        return Err(AppError::BadRequest("user_id must not be empty".to_string()));
    }
    let session = state.runner.create_session(&req.user_id, &req.state)?;
    Ok(Json(SessionResponse { session }))
}

async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<ListSessionsQuery>,
) -> Result<Json<SessionListResponse>, AppError> {
    let runner = &state.runner;
    let sessions = runner
        .db()
        .list_sessions(runner.app_name(), &query.user_id)
        .map_err(RunnerError::from)?;
    Ok(Json(SessionListResponse { sessions }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionWithMessagesResponse>, AppError> {
    let db = state.runner.db();
    let session = db.get_session(&id).map_err(RunnerError::from)?;
    let messages = db.get_messages(&id).map_err(RunnerError::from)?;
    let session_state = db.load_state(&id).map_err(RunnerError::from)?;
    Ok(Json(SessionWithMessagesResponse {
        session,
        messages,
        state: session_state,
    }))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.runner.delete_session(&id)?;
    tracing::info!(session_id = %id, "Deleted session");
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================
// Chat
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if req.text.trim().is_empty() {
        return Err(AppError::BadRequest("text must not be empty".to_string()));
    }
    let outcome = state.runner.run_turn(&id, &req.text).await?;
    Ok(Json(ChatResponse {
        reply: outcome.reply,
        tool_calls: outcome.tool_calls,
        rounds: outcome.rounds,
    }))
}

// ============================================================
// Tools and version
// ============================================================

async fn list_tools(State(state): State<AppState>) -> Json<ToolsResponse> {
    Json(ToolsResponse {
        model: state.runner.model_id().to_string(),
        tools: state.runner.tool_definitions(),
    })
}

async fn get_version() -> &'static str {
    concat!("wayfarer ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    BadGateway(String),
    Internal(String),
}

impl From<RunnerError> for AppError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::Db(DbError::SessionNotFound(id)) => {
                AppError::NotFound(format!("Session not found: {id}"))
            }
            RunnerError::Db(DbError::SessionExists(id)) => {
                AppError::BadRequest(format!("Session already exists: {id}"))
            }
            RunnerError::Llm(e) => AppError::BadGateway(e.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
