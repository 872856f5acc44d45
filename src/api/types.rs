//! API request and response types

use crate::db::{Message, Session};
use crate::llm::ToolDefinition;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Request to create a new session
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub user_id: String,
    /// Seed state, routed by key prefix like any later write
    #[serde(default)]
    pub state: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    pub user_id: String,
}

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<Session>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: Session,
}

/// Response with session, history, and merged state
#[derive(Debug, Serialize)]
pub struct SessionWithMessagesResponse {
    pub session: Session,
    pub messages: Vec<Message>,
    pub state: Map<String, Value>,
}

/// Response for a completed turn
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub tool_calls: usize,
    pub rounds: usize,
}

#[derive(Debug, Serialize)]
pub struct ToolsResponse {
    pub model: String,
    pub tools: Vec<ToolDefinition>,
}

/// Response for lifecycle actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
