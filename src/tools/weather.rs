//! Current weather for a city

use super::{parse_input, Tool, ToolContext, ToolOutput};
use crate::error::outcome_json;
use crate::weather::WeatherProvider;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct WeatherTool {
    provider: Arc<dyn WeatherProvider>,
}

impl WeatherTool {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self { provider }
    }
}

#[derive(Debug, Deserialize)]
struct WeatherInput {
    city: String,
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &'static str {
        "get_weather"
    }

    fn description(&self) -> String {
        "Retrieves the CURRENT weather report for a specified city. Use for any question about the weather.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["city"],
            "properties": {
                "city": {
                    "type": "string",
                    "description": "Name of the city, e.g. 'London' or 'New York'"
                }
            }
        })
    }

    async fn run(&self, input: Value, _ctx: ToolContext) -> ToolOutput {
        let input: WeatherInput = match parse_input(self.name(), input) {
            Ok(input) => input,
            Err(output) => return output,
        };
        let result = self.provider.fetch_weather(&input.city).await;
        ToolOutput::from_json(&outcome_json(&result))
    }
}
