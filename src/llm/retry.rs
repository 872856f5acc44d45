//! Retry with exponential backoff for transient model failures

use super::{LlmError, LlmErrorKind, LlmRequest, LlmResponse, LlmService};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// When and how often to retry a failed model request
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    pub initial_delay: Duration,
    pub exp_base: f64,
    pub max_delay: Duration,
    /// HTTP statuses worth another attempt
    pub http_status_codes: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            initial_delay: Duration::from_secs(1),
            exp_base: 7.0,
            max_delay: Duration::from_secs(60),
            http_status_codes: vec![429, 500, 503, 504],
        }
    }
}

impl RetryPolicy {
    /// Whether `err` should be retried; statuses outside the list are final
    pub fn should_retry(&self, err: &LlmError) -> bool {
        match err.status {
            Some(status) => self.http_status_codes.contains(&status),
            None => err.kind == LlmErrorKind::Network,
        }
    }

    /// Wait before retry number `retry` (1-based)
    pub fn delay(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.exp_base.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }
}

/// Wraps a service and retries transient failures per [`RetryPolicy`]
pub struct RetryingService {
    inner: Arc<dyn LlmService>,
    policy: RetryPolicy,
}

impl RetryingService {
    pub fn new(inner: Arc<dyn LlmService>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl LlmService for RetryingService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let mut attempt = 1;
        loop {
            match self.inner.complete(request).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.policy.attempts && self.policy.should_retry(&e) => {
                    let delay = self
                        .policy
                        .delay(attempt)
                        .max(e.retry_after.unwrap_or_default());
                    tracing::warn!(
                        model = %self.inner.model_id(),
                        attempt,
                        max_attempts = self.policy.attempts,
                        delay_ms = %delay.as_millis(),
                        error = %e,
                        "Retrying LLM request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}
