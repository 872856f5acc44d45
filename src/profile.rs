//! Remembered user name and country

use crate::session::{keys, SessionState};
use serde::Serialize;
use serde_json::Value;

pub const NAME_NOT_FOUND: &str = "Username not found";
pub const COUNTRY_NOT_FOUND: &str = "Country not found";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub user_name: String,
    pub country: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProfileSaved {}

/// Overwrite both profile fields; last write wins
pub fn save_user<S>(state: &mut S, name: &str, country: &str) -> ProfileSaved
where
    S: SessionState + ?Sized,
{
    state.set(keys::USER_NAME, Value::String(name.to_string()));
    state.set(keys::USER_COUNTRY, Value::String(country.to_string()));
    tracing::debug!("Saved user profile");
    ProfileSaved {}
}

/// Stored profile, with placeholder text for missing fields
pub fn load_user<S>(state: &S) -> UserProfile
where
    S: SessionState + ?Sized,
{
    let field = |key: &str, missing: &str| match state.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => missing.to_string(),
    };
    UserProfile {
        user_name: field(keys::USER_NAME, NAME_NOT_FOUND),
        country: field(keys::USER_COUNTRY, COUNTRY_NOT_FOUND),
    }
}
