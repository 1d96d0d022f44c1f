//! Retry and circuit-breaker decorators around an [`LlmProvider`] (modeled on
//! the teacher's `ResilientLlmClient`/`CircuitBreaker` composition — each
//! decorator wraps any `Arc<dyn LlmProvider>` and is itself one, so the two
//! compose by nesting at service start).

use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use crate::circuit_breaker::CircuitBreaker;
use crate::error::LlmError;
use crate::provider::{GenerateRequest, GenerateResponse, LlmProvider};

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            jitter_factor: 0.2,
        }
    }
}

/// Wraps a provider with exponential-backoff retry for transient failures.
/// Auth and bad-response errors are not retried — retrying a rejected API
/// key or a malformed-request response just burns the cycle's time budget.
pub struct ResilientLlmProvider {
    inner: Arc<dyn LlmProvider>,
    config: RetryConfig,
}

impl ResilientLlmProvider {
    pub fn new(inner: Arc<dyn LlmProvider>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    fn calculate_delay(&self, attempt: u32) -> u64 {
        let base = self.config.base_delay_ms;
        let exponential = base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
        let capped = exponential.min(self.config.max_delay_ms);

        let jitter_range = (capped as f64 * self.config.jitter_factor) as i64;
        if jitter_range > 0 {
            let jitter = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
            (capped as i64 + jitter).max(0) as u64
        } else {
            capped
        }
    }

    fn is_retryable(error: &LlmError) -> bool {
        matches!(
            error,
            LlmError::Network(_) | LlmError::Timeout(_) | LlmError::RateLimit(_)
        )
    }
}

#[async_trait]
impl LlmProvider for ResilientLlmProvider {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.inner.generate(request.clone()).await {
                Ok(response) => {
                    if attempt > 0 {
                        tracing::info!(attempt = attempt + 1, "LLM request succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(e) => {
                    if attempt < self.config.max_retries && Self::is_retryable(&e) {
                        let delay = self.calculate_delay(attempt + 1);
                        tracing::warn!(attempt = attempt + 1, delay_ms = delay, error = %e, "LLM request failed, retrying");
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                    } else if !Self::is_retryable(&e) {
                        return Err(e);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::BadResponse("exhausted retries".to_string())))
    }
}

/// Wraps a provider with a [`CircuitBreaker`] so a provider outage fails
/// fast instead of hanging the cycle driver on every call.
pub struct CircuitBreakingLlmProvider {
    inner: Arc<dyn LlmProvider>,
    breaker: Arc<CircuitBreaker>,
}

impl CircuitBreakingLlmProvider {
    pub fn new(inner: Arc<dyn LlmProvider>, breaker: Arc<CircuitBreaker>) -> Self {
        Self { inner, breaker }
    }
}

#[async_trait]
impl LlmProvider for CircuitBreakingLlmProvider {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError> {
        if let Err(open) = self.breaker.allow_request() {
            return Err(LlmError::Network(open.to_string()));
        }

        match self.inner.generate(request).await {
            Ok(response) => {
                self.breaker.record_success();
                Ok(response)
            }
            Err(e) => {
                self.breaker.record_failure();
                Err(e)
            }
        }
    }
}
