//! Mock implementations for testing
//!
//! These mocks stand in for the weather, search, and model providers so the
//! resolver, tools, and runner can be exercised without real network I/O.

use crate::error::ServiceError;
use crate::llm::{ContentBlock, LlmError, LlmRequest, LlmResponse, LlmService, Usage};
use crate::search::{SearchHit, SearchProvider};
use crate::weather::{WeatherProvider, WeatherReport};
use async_trait::async_trait;
use axum::Router;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::net::TcpListener;

// ============================================================================
// Local HTTP stubs
// ============================================================================

/// Serve `router` on an ephemeral local port and return its base URL
pub async fn spawn_stub(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Accept connections and never answer, to provoke client timeouts
pub async fn spawn_silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}")
}

// ============================================================================
// Mock Weather Provider
// ============================================================================

/// Weather provider with canned answers that counts every lookup
#[derive(Default)]
pub struct MockWeather {
    answers: HashMap<String, Result<WeatherReport, ServiceError>>,
    calls: AtomicUsize,
    pub cities: Mutex<Vec<String>>,
}

impl MockWeather {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer lookups for `city` (any casing) with the given offset and display name
    pub fn with_city(mut self, city: &str, display: &str, offset: i64) -> Self {
        self.answers.insert(
            city.to_lowercase(),
            Ok(WeatherReport {
                report: format!("The weather in {city}, XX is currently clear sky."),
                timezone_offset: offset,
                city_name: display.to_string(),
                description: "clear sky".to_string(),
                temperature: 20.0,
                feels_like: 19.0,
                humidity: 40.0,
                country: "XX".to_string(),
            }),
        );
        self
    }

    pub fn with_error(mut self, city: &str, error: ServiceError) -> Self {
        self.answers.insert(city.to_lowercase(), Err(error));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherProvider for MockWeather {
    async fn fetch_weather(&self, city: &str) -> Result<WeatherReport, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.cities.lock().unwrap().push(city.to_string());
        self.answers
            .get(&city.to_lowercase())
            .cloned()
            .unwrap_or_else(|| Err(ServiceError::provider(format!("City '{city}' not found or API error."))))
    }
}

// ============================================================================
// Mock Search Provider
// ============================================================================

pub struct MockSearch {
    result: Result<Vec<SearchHit>, ServiceError>,
    pub queries: Mutex<Vec<String>>,
}

impl MockSearch {
    pub fn with_hits(hits: Vec<SearchHit>) -> Self {
        Self {
            result: Ok(hits),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ServiceError) -> Self {
        Self {
            result: Err(error),
            queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ServiceError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.result.clone()
    }
}

// ============================================================================
// Mock LLM
// ============================================================================

/// LLM that returns queued responses and records every request
pub struct MockLlm {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn queue_text(&self, text: &str) {
        self.queue_response(LlmResponse {
            content: vec![ContentBlock::text(text)],
            end_turn: true,
            usage: Usage::default(),
        });
    }

    pub fn queue_tool_call(&self, id: &str, name: &str, input: Value) {
        self.queue_response(LlmResponse {
            content: vec![ContentBlock::tool_use(id, name, input)],
            end_turn: false,
            usage: Usage::default(),
        });
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmService for MockLlm {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}
