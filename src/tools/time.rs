//! Current local time for a city, cached per session

use super::{parse_input, Tool, ToolContext, ToolOutput};
use crate::error::outcome_json;
use crate::timezone::TimezoneResolver;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct CurrentTimeTool {
    resolver: Arc<TimezoneResolver>,
}

impl CurrentTimeTool {
    pub fn new(resolver: Arc<TimezoneResolver>) -> Self {
        Self { resolver }
    }
}

#[derive(Debug, Deserialize)]
struct TimeInput {
    city: String,
}

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &'static str {
        "get_current_time"
    }

    fn description(&self) -> String {
        "Returns the current time in a specified city. Use for any question about the current time.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["city"],
            "properties": {
                "city": {
                    "type": "string",
                    "description": "Name of the city or country, e.g. 'Tokyo' or 'India'"
                }
            }
        })
    }

    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput {
        let input: TimeInput = match parse_input(self.name(), input) {
            Ok(input) => input,
            Err(output) => return output,
        };
        let mut state = ctx.state.lock().await;
        let result = self.resolver.resolve_current_time(&mut *state, &input.city).await;
        ToolOutput::from_json(&outcome_json(&result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{keys, SessionState};
    use crate::testing::{MockSearch, MockWeather};
    use crate::tools::test_support::{context, registry};

    #[tokio::test]
    async fn test_time_tool_caches_in_context_state() {
        let weather = Arc::new(MockWeather::new().with_city("lisbon", "Lisbon", 0));
        let registry = registry(weather.clone(), Arc::new(MockSearch::with_hits(vec![])));
        let ctx = context();

        let first = registry
            .execute("get_current_time", json!({"city": "Lisbon"}), ctx.clone())
            .await
            .unwrap();
        let second = registry
            .execute("get_current_time", json!({"city": "lisbon"}), ctx.clone())
            .await
            .unwrap();

        assert!(first.success && second.success);
        assert_eq!(weather.call_count(), 1);
        assert_eq!(weather.cities.lock().unwrap().as_slice(), ["Lisbon"]);
        let value: Value = serde_json::from_str(&second.output).unwrap();
        assert_eq!(value["report"], "The current time in Lisbon is 2024-03-10 12:00:00 UTC");
        assert_eq!(value["source"], "cached");

        let state = ctx.state.lock().await;
        assert_eq!(state.get_str(keys::LAST_WEATHER_CITY), Some("Lisbon"));
    }

    #[tokio::test]
    async fn test_time_tool_relays_lookup_error() {
        let registry = registry(Arc::new(MockWeather::new()), Arc::new(MockSearch::with_hits(vec![])));
        let output = registry
            .execute("get_current_time", json!({"city": "Atlantis"}), context())
            .await
            .unwrap();
        assert!(!output.success);
        let value: Value = serde_json::from_str(&output.output).unwrap();
        assert_eq!(value["error_message"], "City 'Atlantis' not found or API error.");
    }
}
