//! Travel information search

use super::{parse_input, Tool, ToolContext, ToolOutput};
use crate::search::{search_travel, SearchProvider};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct TravelSearchTool {
    provider: Arc<dyn SearchProvider>,
}

impl TravelSearchTool {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self { provider }
    }
}

#[derive(Debug, Deserialize)]
struct SearchInput {
    query: String,
}

#[async_trait]
impl Tool for TravelSearchTool {
    fn name(&self) -> &'static str {
        "travel_search"
    }

    fn description(&self) -> String {
        "Finds real-time information about travel (flights, trains, hotels) using web search. Use for ANY question about travel, flights, trains, or hotels.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["query"],
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Free-text search query"
                }
            }
        })
    }

    async fn run(&self, input: Value, _ctx: ToolContext) -> ToolOutput {
        let input: SearchInput = match parse_input(self.name(), input) {
            Ok(input) => input,
            Err(output) => return output,
        };
        match search_travel(self.provider.as_ref(), &input.query).await {
            Ok(text) => ToolOutput::success(text),
            Err(text) => ToolOutput::error(text),
        }
    }
}
