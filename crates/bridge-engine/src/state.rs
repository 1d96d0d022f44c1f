//! Composition root: builds the one instance of every collaborator and wires
//! them into the `ProtocolEngine`, the way the teacher's `AppState::new`
//! builds repos/queues/clients from `AppConfig` once at startup.

use std::sync::Arc;
use std::time::Duration;

use mgba_bridge_config::{ConfigStore, SqliteConfigStore};
use mgba_bridge_detect::GameDetector;
use mgba_bridge_llm::{
    AnthropicProvider, CircuitBreaker, CircuitBreakerConfig, CircuitBreakingLlmProvider, LlmAdapter,
    LlmProvider, OllamaProvider, ResilientLlmProvider, RetryConfig, DEFAULT_ANTHROPIC_BASE_URL,
    DEFAULT_ANTHROPIC_MODEL,
};

use crate::buffer::ChatBuffer;
use crate::config::AppConfig;
use crate::session::ProtocolEngine;

pub struct AppState {
    pub config: AppConfig,
    pub buffer: Arc<ChatBuffer>,
    pub config_store: Arc<dyn ConfigStore>,
    pub detector: Arc<GameDetector>,
    pub engine: Arc<ProtocolEngine>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let buffer = ChatBuffer::with_default_capacity();
        let config_store: Arc<dyn ConfigStore> = Arc::new(SqliteConfigStore::new(&config.db_path).await?);
        let detector = Arc::new(GameDetector::with_builtin_games());

        let snapshot = config_store.get_snapshot().await?;
        let provider = build_provider(&snapshot.llm_provider, &snapshot.api_key, &snapshot.model_name);
        let llm = Arc::new(LlmAdapter::new(provider, snapshot.prompt_template_path.clone()));

        let engine = ProtocolEngine::new(
            buffer.clone(),
            config_store.clone(),
            detector.clone(),
            llm,
            Duration::from_secs(config.cycle_timeout_secs),
            config.malformed_frame_threshold,
            Duration::from_secs(config.malformed_frame_window_secs),
        );

        Ok(Self {
            config,
            buffer,
            config_store,
            detector,
            engine,
        })
    }
}

/// Dispatch by `llm_provider` once at service start (design note §9: "dynamic
/// dispatch replaced by small interfaces"), wrapping the chosen provider in
/// retry + circuit-breaker decorators so a provider outage degrades to
/// fast-failing errors instead of hanging the cycle driver.
fn build_provider(llm_provider: &str, api_key: &str, model_name: &str) -> Arc<dyn LlmProvider> {
    let base: Arc<dyn LlmProvider> = match llm_provider {
        "ollama" => {
            let base_url = std::env::var("OLLAMA_BASE_URL")
                .unwrap_or_else(|_| mgba_bridge_llm::DEFAULT_OLLAMA_BASE_URL.to_string());
            let model = if model_name.is_empty() {
                mgba_bridge_llm::DEFAULT_OLLAMA_MODEL.to_string()
            } else {
                model_name.to_string()
            };
            Arc::new(OllamaProvider::new(&base_url, &model))
        }
        _ => {
            let model = if model_name.is_empty() {
                DEFAULT_ANTHROPIC_MODEL.to_string()
            } else {
                model_name.to_string()
            };
            Arc::new(AnthropicProvider::new(DEFAULT_ANTHROPIC_BASE_URL, api_key, &model))
        }
    };

    let resilient: Arc<dyn LlmProvider> = Arc::new(ResilientLlmProvider::new(base, RetryConfig::default()));
    let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig::default()));
    Arc::new(CircuitBreakingLlmProvider::new(resilient, breaker))
}
