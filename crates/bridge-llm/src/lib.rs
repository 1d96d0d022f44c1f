//! LLM Adapter (C3, §4.3) — provider-agnostic "analyze screenshot(s)+context
//! -> {text, button_sequence}" with tool-calling, behind one interface with
//! two concrete providers (Anthropic, Ollama/OpenAI-compatible), wrapped in
//! retry and circuit-breaker decorators.

mod analyze;
mod anthropic;
mod circuit_breaker;
mod error;
mod image;
mod movement;
mod ollama;
mod prompt;
mod provider;
mod readiness;
mod resilient;
mod tool;

pub use analyze::{AnalyzeRequest, Decision, LlmAdapter};
pub use anthropic::{AnthropicProvider, DEFAULT_ANTHROPIC_BASE_URL, DEFAULT_ANTHROPIC_MODEL};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitOpenError, CircuitState};
pub use error::LlmError;
pub use image::{encode_png_base64, to_data_uri};
pub use movement::MemoryContext;
pub use ollama::{OllamaProvider, DEFAULT_OLLAMA_BASE_URL, DEFAULT_OLLAMA_MODEL};
pub use provider::{GenerateRequest, GenerateResponse, ImageAttachment, LlmProvider, ToolCall};
pub use readiness::{wait_until_ready, ReadinessConfig};
pub use resilient::{CircuitBreakingLlmProvider, ResilientLlmProvider, RetryConfig};
pub use tool::{press_button_description, press_button_schema, PRESS_BUTTON_TOOL_NAME};
