//! Wayfarer - conversational travel assistant
//!
//! Serves an HTTP API over persisted chat sessions. A Gemini model answers
//! the user and calls tools for weather, local time, travel search, and the
//! user's saved profile.

mod api;
mod clock;
mod config;
mod db;
mod error;
mod llm;
mod profile;
mod runtime;
mod search;
mod session;
mod system_prompt;
#[cfg(test)]
mod testing;
mod timezone;
mod tools;
mod weather;

use api::{create_router, AppState};
use clock::SystemClock;
use config::AppConfig;
use db::Database;
use llm::{build_service, GeminiService, LlmService, RetryPolicy, UnconfiguredService};
use runtime::{Agent, Runner};
use search::TavilyClient;
use std::net::SocketAddr;
use std::sync::Arc;
use tools::ToolRegistry;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weather::OpenWeatherClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wayfarer=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env();

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    // Providers
    if config.openweather_api_key.is_none() {
        tracing::warn!("OPENWEATHER_API_KEY not set; weather and time lookups will report a configuration error");
    }
    if config.tavily_api_key.is_none() {
        tracing::warn!("TAVILY_API_KEY not set; travel search will report a configuration error");
    }
    let weather = Arc::new(OpenWeatherClient::new(
        config.openweather_api_key.clone(),
        config.openweather_base_url.clone(),
    )?);
    let search = Arc::new(TavilyClient::new(
        config.tavily_api_key.clone(),
        config.tavily_base_url.clone(),
    )?);
    let tools = ToolRegistry::standard(weather, search, Arc::new(SystemClock));

    let provider: Arc<dyn LlmService> = match config.gemini_api_key.clone() {
        Some(key) => Arc::new(GeminiService::new(key, &config.model)?),
        None => {
            tracing::warn!("No Gemini API key configured. Set GEMINI_API_KEY or GOOGLE_API_KEY.");
            Arc::new(UnconfiguredService::new(&config.model))
        }
    };
    let llm = build_service(provider, RetryPolicy::default());
    tracing::info!(model = %llm.model_id(), app = %config.app_name, "LLM initialized");

    let agent = Agent::new("Personal_Travel_Assistant", tools);
    let state = AppState::new(Runner::new(config.app_name.clone(), agent, db, llm));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state).layer(cors).layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Wayfarer server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
