//! Process configuration read from the environment

use std::path::PathBuf;

/// Default OpenWeatherMap current-weather endpoint
pub const DEFAULT_WEATHER_URL: &str = "http://api.openweathermap.org/data/2.5/weather";

/// Default Tavily search endpoint
pub const DEFAULT_SEARCH_URL: &str = "https://api.tavily.com/search";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub db_path: PathBuf,
    pub port: u16,
    pub model: String,
    pub gemini_api_key: Option<String>,
    pub openweather_api_key: Option<String>,
    pub openweather_base_url: String,
    pub tavily_api_key: Option<String>,
    pub tavily_base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "weather_app".to_string(),
            db_path: PathBuf::from("wayfarer.db"),
            port: 8000,
            model: "gemini-2.0-flash".to_string(),
            gemini_api_key: None,
            openweather_api_key: None,
            openweather_base_url: DEFAULT_WEATHER_URL.to_string(),
            tavily_api_key: None,
            tavily_base_url: DEFAULT_SEARCH_URL.to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let db_path = std::env::var("WAYFARER_DB_PATH").map_or_else(
            |_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(format!("{home}/.wayfarer/wayfarer.db"))
            },
            PathBuf::from,
        );

        let port = std::env::var("WAYFARER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        Self {
            app_name: std::env::var("WAYFARER_APP_NAME").unwrap_or(defaults.app_name),
            db_path,
            port,
            model: std::env::var("WAYFARER_MODEL").unwrap_or(defaults.model),
            gemini_api_key: env_key("GEMINI_API_KEY").or_else(|| env_key("GOOGLE_API_KEY")),
            openweather_api_key: env_key("OPENWEATHER_API_KEY"),
            openweather_base_url: std::env::var("OPENWEATHER_BASE_URL")
                .unwrap_or(defaults.openweather_base_url),
            tavily_api_key: env_key("TAVILY_API_KEY"),
            tavily_base_url: std::env::var("TAVILY_BASE_URL").unwrap_or(defaults.tavily_base_url),
        }
    }
}

fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|k| is_usable_key(k))
}

/// A key is usable when it is non-empty and not a template placeholder
/// such as `YOUR_API_KEY_HERE` or `your openweather key`.
pub fn is_usable_key(key: &str) -> bool {
    let key = key.trim();
    if key.is_empty() {
        return false;
    }
    let lower = key.to_ascii_lowercase();
    !(lower.starts_with("your") || lower.ends_with("_here"))
}
