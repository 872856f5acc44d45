//! Runtime for executing assistant turns
//!
//! A turn loads the session's history and state, lets the model call tools
//! until it answers in text, persists every message, and writes the state
//! changes back in one transaction. Turns for the same session are serialized.

use crate::db::{Database, DbError, Message, Session};
use crate::llm::{
    ContentBlock, LlmError, LlmMessage, LlmRequest, LlmService, MessageRole, ToolDefinition,
};
use crate::session::StateMap;
use crate::system_prompt::build_instruction;
use crate::tools::{ToolContext, ToolOutput, ToolRegistry};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Upper bound on model calls per turn
pub const MAX_TOOL_ROUNDS: usize = 8;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
    #[error("Model kept calling tools after {0} rounds")]
    TooManyToolRounds(usize),
}

/// The assistant: its instruction and the tools it may call
pub struct Agent {
    pub name: String,
    pub instruction: String,
    pub tools: ToolRegistry,
    pub max_tokens: Option<u32>,
}

impl Agent {
    pub fn new(name: impl Into<String>, tools: ToolRegistry) -> Self {
        let instruction = build_instruction(&tools.definitions());
        Self {
            name: name.into(),
            instruction,
            tools,
            max_tokens: Some(2048),
        }
    }
}

/// What a completed turn produced
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub reply: String,
    pub tool_calls: usize,
    pub rounds: usize,
}

/// Drives turns of one agent over persisted sessions
pub struct Runner {
    app_name: String,
    agent: Agent,
    db: Database,
    llm: Arc<dyn LlmService>,
    turn_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Runner {
    pub fn new(app_name: impl Into<String>, agent: Agent, db: Database, llm: Arc<dyn LlmService>) -> Self {
        Self {
            app_name: app_name.into(),
            agent,
            db,
            llm,
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn model_id(&self) -> &str {
        self.llm.model_id()
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.agent.tools.definitions()
    }

    /// Start a new session for `user_id`
    pub fn create_session(&self, user_id: &str, initial_state: &Map<String, Value>) -> Result<Session, RunnerError> {
        let id = uuid::Uuid::new_v4().to_string();
        let session = self.db.create_session(&id, &self.app_name, user_id, initial_state)?;
        tracing::info!(session_id = %id, user_id = %user_id, agent = %self.agent.name, "Created session");
        Ok(session)
    }

    pub fn delete_session(&self, session_id: &str) -> Result<(), RunnerError> {
        self.db.delete_session(session_id)?;
        self.turn_locks.lock().unwrap().remove(session_id);
        Ok(())
    }

    fn turn_lock(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.turn_locks
            .lock()
            .unwrap()
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    /// Drop the session's lock entry once no other turn holds or awaits it
    fn release_turn_lock(&self, session_id: &str, lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.turn_locks.lock().unwrap();
        let unused = locks
            .get(session_id)
            .is_some_and(|held| Arc::ptr_eq(held, lock) && Arc::strong_count(lock) == 2);
        if unused {
            locks.remove(session_id);
        }
    }

    /// Run one user turn to completion
    pub async fn run_turn(&self, session_id: &str, text: &str) -> Result<TurnOutcome, RunnerError> {
        // Unknown sessions never get a lock entry
        self.db.get_session(session_id)?;

        let lock = self.turn_lock(session_id);
        let result = {
            let _turn = lock.lock().await;
            self.run_locked(session_id, text).await
        };
        self.release_turn_lock(session_id, &lock);
        result
    }

    async fn run_locked(&self, session_id: &str, text: &str) -> Result<TurnOutcome, RunnerError> {
        let state = Arc::new(tokio::sync::Mutex::new(StateMap::from_values(
            self.db.load_state(session_id)?,
        )));
        let mut messages: Vec<LlmMessage> = self
            .db
            .get_messages(session_id)?
            .iter()
            .map(Message::to_llm_message)
            .collect();

        let user_content = vec![ContentBlock::text(text)];
        self.db.add_message(session_id, MessageRole::User, &user_content, None)?;
        messages.push(LlmMessage::user(user_content));

        tracing::info!(session_id = %session_id, history = messages.len(), "Starting turn");
        let ctx = ToolContext::new(session_id, state.clone());
        let result = self.drive(session_id, &mut messages, &ctx).await;

        // Tool writes are kept even when the turn itself failed
        let mut state = state.lock().await;
        state.clear_temp();
        let delta = state.delta();
        if !delta.is_empty() {
            self.db.apply_state_delta(session_id, &delta)?;
            state.mark_clean();
        }

        match &result {
            Ok(outcome) => tracing::info!(
                session_id = %session_id,
                rounds = outcome.rounds,
                tool_calls = outcome.tool_calls,
                state_writes = delta.len(),
                "Turn completed"
            ),
            Err(e) => tracing::warn!(session_id = %session_id, error = %e, "Turn failed"),
        }
        result
    }

    async fn drive(
        &self,
        session_id: &str,
        messages: &mut Vec<LlmMessage>,
        ctx: &ToolContext,
    ) -> Result<TurnOutcome, RunnerError> {
        let tools = self.agent.tools.definitions();
        let mut tool_calls = 0;

        for round in 1..=MAX_TOOL_ROUNDS {
            let request = LlmRequest {
                system: Some(self.agent.instruction.clone()),
                messages: messages.clone(),
                tools: tools.clone(),
                max_tokens: self.agent.max_tokens,
            };
            let response = self.llm.complete(&request).await?;
            self.db
                .add_message(session_id, MessageRole::Assistant, &response.content, Some(&response.usage))?;
            messages.push(LlmMessage::assistant(response.content.clone()));

            let uses = response.tool_uses();
            if uses.is_empty() {
                return Ok(TurnOutcome {
                    reply: response.text(),
                    tool_calls,
                    rounds: round,
                });
            }

            let mut results = Vec::with_capacity(uses.len());
            for (id, name, input) in uses {
                let output = self
                    .agent
                    .tools
                    .execute(name, input.clone(), ctx.clone())
                    .await
                    .unwrap_or_else(|| ToolOutput::error(format!("Unknown tool: {name}")));
                tracing::info!(
                    session_id = %session_id,
                    tool = %name,
                    success = output.success,
                    "Tool call finished"
                );
                results.push(ContentBlock::tool_result(id, name, output.output, !output.success));
            }
            tool_calls += results.len();

            self.db.add_message(session_id, MessageRole::User, &results, None)?;
            messages.push(LlmMessage::user(results));
        }

        Err(RunnerError::TooManyToolRounds(MAX_TOOL_ROUNDS))
    }
}
