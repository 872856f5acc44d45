//! Remember and recall the user's name and country

use super::{parse_input, Tool, ToolContext, ToolOutput};
use crate::error::success_json;
use crate::profile::{load_user, save_user};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

pub struct SaveUserInfoTool;

#[derive(Debug, Deserialize)]
struct SaveInput {
    user_name: String,
    country: String,
}

#[async_trait]
impl Tool for SaveUserInfoTool {
    fn name(&self) -> &'static str {
        "save_userinfo"
    }

    fn description(&self) -> String {
        "Record the user's name and country. Use when the user tells you their name or country.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["user_name", "country"],
            "properties": {
                "user_name": {"type": "string", "description": "The user's name"},
                "country": {"type": "string", "description": "The user's country"}
            }
        })
    }

    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput {
        let input: SaveInput = match parse_input(self.name(), input) {
            Ok(input) => input,
            Err(output) => return output,
        };
        let mut state = ctx.state.lock().await;
        let saved = save_user(&mut *state, &input.user_name, &input.country);
        ToolOutput::from_json(&success_json(&saved))
    }
}

pub struct RetrieveUserInfoTool;

#[async_trait]
impl Tool for RetrieveUserInfoTool {
    fn name(&self) -> &'static str {
        "retrieve_userinfo"
    }

    fn description(&self) -> String {
        "Retrieve the user's saved name and country. Use when the user asks you to remember their name.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn run(&self, _input: Value, ctx: ToolContext) -> ToolOutput {
        let state = ctx.state.lock().await;
        ToolOutput::from_json(&success_json(&load_user(&*state)))
    }
}
