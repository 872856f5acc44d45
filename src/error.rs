//! Error taxonomy shared by the external-service wrappers
//!
//! Every public operation reports failures as a [`ServiceError`] carrying one of
//! a closed set of kinds, so callers branch on the kind instead of message text.

use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Classification of a service failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or placeholder API key; no call was attempted
    Config,
    /// Transport failure or timeout
    Network,
    /// The provider answered but reported a failure (bad city, rate limit, ...)
    Provider,
    /// Response was missing expected fields or held unusable values
    Parse,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Network => "network",
            Self::Provider => "provider",
            Self::Parse => "parse",
        }
    }
}

/// Failure reported by a weather, search, or time operation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ServiceError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Provider, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, message)
    }

    /// Tagged error payload handed back to the model
    pub fn to_json(&self) -> Value {
        json!({
            "status": "error",
            "error_kind": self.kind,
            "error_message": self.message,
        })
    }
}

/// Tagged success payload: the serialized fields of `value` plus `"status": "success"`
pub fn success_json<T: Serialize>(value: &T) -> Value {
    let mut fields = match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            let mut map = Map::new();
            map.insert("result".to_string(), other);
            map
        }
        Err(e) => return ServiceError::parse(format!("Failed to encode result: {e}")).to_json(),
    };
    fields.insert("status".to_string(), Value::String("success".to_string()));
    Value::Object(fields)
}

/// Render a service result in the tagged shape
pub fn outcome_json<T: Serialize>(result: &Result<T, ServiceError>) -> Value {
    match result {
        Ok(value) => success_json(value),
        Err(e) => e.to_json(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Report {
        report: String,
    }

    #[test]
    fn test_error_json_shape() {
        let err = ServiceError::network("Network error: timed out");
        let value = err.to_json();
        assert_eq!(value["status"], "error");
        assert_eq!(value["error_kind"], "network");
        assert_eq!(value["error_message"], "Network error: timed out");
    }

    #[test]
    fn test_success_json_adds_status() {
        let value = success_json(&Report {
            report: "ok".to_string(),
        });
        assert_eq!(value["status"], "success");
        assert_eq!(value["report"], "ok");
    }

    #[test]
    fn test_outcome_json_matches_variant() {
        let ok: Result<Report, ServiceError> = Ok(Report {
            report: "fine".to_string(),
        });
        let err: Result<Report, ServiceError> = Err(ServiceError::config("no key"));
        assert_eq!(outcome_json(&ok)["status"], "success");
        assert_eq!(outcome_json(&err)["error_kind"], "config");
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ErrorKind::Config.as_str(), "config");
        assert_eq!(ErrorKind::Provider.as_str(), "provider");
        assert_eq!(ErrorKind::Parse.as_str(), "parse");
    }
}
