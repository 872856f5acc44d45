//! Tools the assistant can call
//!
//! Tools are long-lived singletons holding their provider clients; all
//! per-call context (the session and its state) arrives via `ToolContext`.

mod profile;
mod search;
mod time;
mod weather;

pub use profile::{RetrieveUserInfoTool, SaveUserInfoTool};
pub use search::TravelSearchTool;
pub use time::CurrentTimeTool;
pub use weather::WeatherTool;

use crate::clock::Clock;
use crate::error::ServiceError;
use crate::llm::ToolDefinition;
use crate::search::SearchProvider;
use crate::session::StateMap;
use crate::timezone::TimezoneResolver;
use crate::weather::WeatherProvider;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Result from tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub output: String,
}

impl ToolOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: message.into(),
        }
    }

    /// Tagged JSON result; `success` mirrors its `status`
    pub fn from_json(value: &Value) -> Self {
        Self {
            success: value["status"] != "error",
            output: value.to_string(),
        }
    }

    pub fn from_service_error(err: &ServiceError) -> Self {
        Self::from_json(&err.to_json())
    }
}

/// All context needed for a tool invocation
#[derive(Clone)]
pub struct ToolContext {
    pub session_id: String,
    /// State of the session the call belongs to; the runner owns it for the turn
    pub state: Arc<Mutex<StateMap>>,
}

impl ToolContext {
    pub fn new(session_id: impl Into<String>, state: Arc<Mutex<StateMap>>) -> Self {
        Self {
            session_id: session_id.into(),
            state,
        }
    }
}

/// Trait for tools that can be executed by the agent
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name
    fn name(&self) -> &str;

    /// Tool description for LLM, including when to use it
    fn description(&self) -> String;

    /// JSON schema for tool input
    fn input_schema(&self) -> Value;

    /// Execute the tool
    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput;
}

/// Decode tool input, mapping failures to an error output naming the tool
pub(crate) fn parse_input<T: DeserializeOwned>(tool: &str, input: Value) -> Result<T, ToolOutput> {
    serde_json::from_value(input).map_err(|e| ToolOutput::error(format!("Invalid input for {tool}: {e}")))
}

/// Collection of tools available to the assistant
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Standard assistant tool set
    pub fn standard(
        weather: Arc<dyn WeatherProvider>,
        search: Arc<dyn SearchProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let resolver = Arc::new(TimezoneResolver::new(weather.clone(), clock));
        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(WeatherTool::new(weather)),
            Arc::new(CurrentTimeTool::new(resolver)),
            Arc::new(TravelSearchTool::new(search)),
            Arc::new(SaveUserInfoTool),
            Arc::new(RetrieveUserInfoTool),
        ];
        Self { tools }
    }

    /// Get all tool definitions for LLM
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Execute a tool by name with context
    pub async fn execute(&self, name: &str, input: Value, ctx: ToolContext) -> Option<ToolOutput> {
        for tool in &self.tools {
            if tool.name() == name {
                tracing::debug!(tool = %name, session = %ctx.session_id, "Executing tool");
                return Some(tool.run(input, ctx).await);
            }
        }
        None
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::clock::FixedClock;
    use crate::testing::{MockSearch, MockWeather};
    use chrono::TimeZone;

    pub fn context() -> ToolContext {
        ToolContext::new("test-session", Arc::new(Mutex::new(StateMap::new())))
    }

    pub fn registry(weather: Arc<MockWeather>, search: Arc<MockSearch>) -> ToolRegistry {
        let now = chrono::Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        ToolRegistry::standard(weather, search, Arc::new(FixedClock(now)))
    }
}
