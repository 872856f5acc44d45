//! Per-session key-value state
//!
//! The state is owned by the runner for the duration of a turn and handed to
//! each operation explicitly. Keys are plain strings; a prefix selects the
//! scope the persistence layer stores them under.

use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Well-known state keys
pub mod keys {
    /// Display name of the last city whose timezone was resolved
    pub const LAST_WEATHER_CITY: &str = "last_weather_city";
    /// UTC offset in seconds for `LAST_WEATHER_CITY`
    pub const LAST_WEATHER_TZ: &str = "last_weather_tz";
    pub const USER_NAME: &str = "user:name";
    pub const USER_COUNTRY: &str = "user:country";
}

/// Shared by every user and session of the application
pub const APP_PREFIX: &str = "app:";
/// Shared by every session of one user
pub const USER_PREFIX: &str = "user:";
/// Lives for the current turn only, never persisted
pub const TEMP_PREFIX: &str = "temp:";

/// Storage scope of a key, derived from its prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScope {
    App,
    User,
    Session,
    Temp,
}

impl KeyScope {
    pub fn of(key: &str) -> Self {
        if key.starts_with(APP_PREFIX) {
            Self::App
        } else if key.starts_with(USER_PREFIX) {
            Self::User
        } else if key.starts_with(TEMP_PREFIX) {
            Self::Temp
        } else {
            Self::Session
        }
    }
}

/// Get/set interface over one session's state
pub trait SessionState: Send {
    fn get(&self, key: &str) -> Option<&Value>;

    fn set(&mut self, key: &str, value: Value);

    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }
}

/// Write the timezone cache pair together so the two keys never disagree
pub fn remember_zone<S: SessionState + ?Sized>(state: &mut S, city_name: &str, offset_secs: i64) {
    state.set(keys::LAST_WEATHER_CITY, Value::String(city_name.to_string()));
    state.set(keys::LAST_WEATHER_TZ, Value::from(offset_secs));
    tracing::debug!(city = %city_name, offset_secs, "Cached timezone in session state");
}

/// In-memory session state that tracks which keys were written
#[derive(Debug, Clone, Default)]
pub struct StateMap {
    values: Map<String, Value>,
    dirty: BTreeSet<String>,
}

impl StateMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap previously persisted values; nothing is marked dirty
    pub fn from_values(values: Map<String, Value>) -> Self {
        Self {
            values,
            dirty: BTreeSet::new(),
        }
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Keys written since load, with their current values
    pub fn delta(&self) -> Map<String, Value> {
        self.dirty
            .iter()
            .filter_map(|k| self.values.get(k).map(|v| (k.clone(), v.clone())))
            .collect()
    }

    /// Forget the write log after the delta has been persisted
    pub fn mark_clean(&mut self) {
        self.dirty.clear();
    }

    /// Drop turn-scoped keys
    pub fn clear_temp(&mut self) {
        self.values.retain(|k, _| KeyScope::of(k) != KeyScope::Temp);
        self.dirty.retain(|k| KeyScope::of(k) != KeyScope::Temp);
    }
}

impl SessionState for StateMap {
    fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
        self.dirty.insert(key.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scope_from_prefix() {
        assert_eq!(KeyScope::of("app:banner"), KeyScope::App);
        assert_eq!(KeyScope::of(keys::USER_NAME), KeyScope::User);
        assert_eq!(KeyScope::of("temp:scratch"), KeyScope::Temp);
        assert_eq!(KeyScope::of(keys::LAST_WEATHER_CITY), KeyScope::Session);
    }

    #[test]
    fn test_delta_tracks_writes_only() {
        let mut loaded = Map::new();
        loaded.insert("existing".to_string(), json!(1));
        let mut state = StateMap::from_values(loaded);
        assert!(state.delta().is_empty());

        state.set("fresh", json!("value"));
        let delta = state.delta();
        assert_eq!(delta.len(), 1);
        assert_eq!(delta["fresh"], "value");

        state.mark_clean();
        assert!(state.delta().is_empty());
        assert_eq!(state.get_str("fresh"), Some("value"));
        assert_eq!(state.get_i64("existing"), Some(1));
    }

    #[test]
    fn test_remember_zone_writes_both_keys() {
        let mut state = StateMap::new();
        remember_zone(&mut state, "Tokyo", 32_400);
        assert_eq!(state.get_str(keys::LAST_WEATHER_CITY), Some("Tokyo"));
        assert_eq!(state.get_i64(keys::LAST_WEATHER_TZ), Some(32_400));
        assert_eq!(state.delta().len(), 2);
    }

    #[test]
    fn test_clear_temp() {
        let mut state = StateMap::new();
        state.set("temp:draft", json!(true));
        state.set("kept", json!(true));
        state.clear_temp();
        assert!(state.get("temp:draft").is_none());
        assert!(state.get("kept").is_some());
        assert!(!state.delta().contains_key("temp:draft"));
    }
}
