//! HTTP API for the travel assistant

mod handlers;
mod types;

pub use handlers::create_router;

use crate::runtime::Runner;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<Runner>,
}

impl AppState {
    pub fn new(runner: Runner) -> Self {
        Self {
            runner: Arc::new(runner),
        }
    }
}
