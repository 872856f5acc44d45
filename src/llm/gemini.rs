//! Google Gemini provider implementation

use super::types::{ContentBlock, LlmRequest, LlmResponse, MessageRole, Usage};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini service implementation
pub struct GeminiService {
    client: Client,
    api_key: String,
    url: String,
    model_id: String,
}

impl GeminiService {
    pub fn new(api_key: String, model: &str) -> Result<Self, reqwest::Error> {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, model: &str, base_url: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(120)).build()?;
        Ok(Self {
            client,
            api_key,
            url: format!(
                "{}/models/{model}:generateContent",
                base_url.trim_end_matches('/')
            ),
            model_id: model.to_string(),
        })
    }

    fn translate_request(request: &LlmRequest) -> GeminiRequest {
        let system_instruction = request.system.as_ref().map(|text| GeminiContent {
            role: None,
            parts: vec![GeminiPart::Text { text: text.clone() }],
        });

        let contents = request
            .messages
            .iter()
            .filter_map(|msg| {
                let role = match msg.role {
                    MessageRole::User => "user",
                    MessageRole::Assistant => "model",
                };
                let parts: Vec<GeminiPart> = msg.content.iter().map(translate_block).collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(GeminiContent {
                        role: Some(role.to_string()),
                        parts,
                    })
                }
            })
            .collect();

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(vec![GeminiTool {
                function_declarations: request
                    .tools
                    .iter()
                    .map(|t| GeminiFunctionDeclaration {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.input_schema.clone(),
                    })
                    .collect(),
            }])
        };

        GeminiRequest {
            contents,
            system_instruction,
            tools,
            generation_config: request.max_tokens.map(|t| GeminiGenerationConfig {
                max_output_tokens: Some(t),
            }),
        }
    }

    fn normalize_response(resp: GeminiResponse) -> Result<LlmResponse, LlmError> {
        let candidate = resp
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::unknown("No candidates in response"))?;

        let mut content = Vec::new();
        for (index, part) in candidate.content.parts.into_iter().enumerate() {
            match part {
                GeminiPart::Text { text } => {
                    if !text.is_empty() {
                        content.push(ContentBlock::Text { text });
                    }
                }
                GeminiPart::FunctionCall { function_call } => {
                    // Gemini has no call IDs; position keeps repeated calls apart
                    content.push(ContentBlock::ToolUse {
                        id: format!("call_{index}_{}", function_call.name),
                        name: function_call.name,
                        input: function_call.args,
                    });
                }
                GeminiPart::FunctionResponse { .. } => {}
            }
        }

        let end_turn = candidate.finish_reason.is_some_and(|r| r == "STOP")
            && !content.iter().any(|b| matches!(b, ContentBlock::ToolUse { .. }));

        Ok(LlmResponse {
            content,
            end_turn,
            usage: Usage {
                input_tokens: u64::from(resp.usage_metadata.prompt_token_count),
                output_tokens: u64::from(resp.usage_metadata.candidates_token_count),
            },
        })
    }
}

fn translate_block(block: &ContentBlock) -> GeminiPart {
    match block {
        ContentBlock::Text { text } => GeminiPart::Text { text: text.clone() },
        ContentBlock::ToolUse { name, input, .. } => GeminiPart::FunctionCall {
            function_call: GeminiFunctionCall {
                name: name.clone(),
                args: input.clone(),
            },
        },
        ContentBlock::ToolResult {
            name,
            content,
            is_error,
            ..
        } => {
            // Tool output is JSON when the tool produced a tagged result
            let result = serde_json::from_str::<serde_json::Value>(content)
                .unwrap_or_else(|_| serde_json::Value::String(content.clone()));
            GeminiPart::FunctionResponse {
                function_response: GeminiFunctionResponse {
                    name: name.clone(),
                    response: serde_json::json!({
                        "result": result,
                        "error": is_error
                    }),
                },
            }
        }
    }
}

#[async_trait]
impl LlmService for GeminiService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let gemini_request = Self::translate_request(request);

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&gemini_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                .map_or(body, |r| r.error.message);
            let mut err = LlmError::from_status(status.as_u16(), message);
            if let Some(delay) = retry_after {
                err = err.with_retry_after(delay);
            }
            return Err(err);
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::unknown(format!("Failed to parse response: {e} - body: {body}")))?;

        Self::normalize_response(gemini_response)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: GeminiFunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: GeminiFunctionResponse,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    name: String,
    response: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: GeminiUsageMetadata,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: GeminiContent,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmErrorKind, LlmMessage, ToolDefinition};
    use crate::testing::spawn_stub;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    fn sample_request() -> LlmRequest {
        LlmRequest {
            system: Some("Be helpful.".to_string()),
            messages: vec![
                LlmMessage::user(vec![ContentBlock::text("Time in Oslo?")]),
                LlmMessage::assistant(vec![ContentBlock::tool_use(
                    "call_0_get_current_time",
                    "get_current_time",
                    json!({"city": "Oslo"}),
                )]),
                LlmMessage::user(vec![ContentBlock::tool_result(
                    "call_0_get_current_time",
                    "get_current_time",
                    r#"{"status":"success","report":"It is noon"}"#,
                    false,
                )]),
            ],
            tools: vec![ToolDefinition {
                name: "get_current_time".to_string(),
                description: "Current time".to_string(),
                input_schema: json!({"type": "object"}),
            }],
            max_tokens: Some(1024),
        }
    }

    #[test]
    fn test_translate_request() {
        let body = serde_json::to_value(GeminiService::translate_request(&sample_request())).unwrap();
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be helpful.");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][1]["parts"][0]["functionCall"]["name"], "get_current_time");
        let response = &body["contents"][2]["parts"][0]["functionResponse"];
        assert_eq!(response["name"], "get_current_time");
        assert_eq!(response["response"]["result"]["report"], "It is noon");
        assert_eq!(body["tools"][0]["functionDeclarations"][0]["name"], "get_current_time");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[test]
    fn test_normalize_function_call() {
        let resp: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"functionCall": {"name": "get_weather", "args": {"city": "Lima"}}}
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 3}
        }))
        .unwrap();
        let normalized = GeminiService::normalize_response(resp).unwrap();
        assert!(!normalized.end_turn);
        assert_eq!(normalized.usage.input_tokens, 12);
        let uses = normalized.tool_uses();
        assert_eq!(uses[0], ("call_0_get_weather", "get_weather", &json!({"city": "Lima"})));
    }

    #[test]
    fn test_no_candidates_is_error() {
        let resp: GeminiResponse = serde_json::from_value(json!({"candidates": []})).unwrap();
        assert!(GeminiService::normalize_response(resp).is_err());
    }

    #[tokio::test]
    async fn test_complete_against_stub() {
        let router = Router::new().route(
            "/models/gemini-2.0-flash:generateContent",
            post(|Json(_body): Json<Value>| async {
                Json(json!({
                    "candidates": [{
                        "content": {"role": "model", "parts": [{"text": "Hello!"}]},
                        "finishReason": "STOP"
                    }],
                    "usageMetadata": {"promptTokenCount": 5, "candidatesTokenCount": 2}
                }))
            }),
        );
        let base = spawn_stub(router).await;

        let service = GeminiService::with_base_url("key".to_string(), "gemini-2.0-flash", &base).unwrap();
        let response = service.complete(&sample_request()).await.unwrap();
        assert_eq!(response.text(), "Hello!");
        assert!(response.end_turn);
    }

    #[tokio::test]
    async fn test_error_status_mapped() {
        let router = Router::new().route(
            "/models/gemini-2.0-flash:generateContent",
            post(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({"error": {"message": "quota", "code": 429}})),
                )
            }),
        );
        let base = spawn_stub(router).await;

        let service = GeminiService::with_base_url("key".to_string(), "gemini-2.0-flash", &base).unwrap();
        let err = service.complete(&sample_request()).await.unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::RateLimit);
        assert_eq!(err.status, Some(429));
        assert!(err.message.contains("quota"));
    }
}
