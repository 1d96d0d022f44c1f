//! Provider-agnostic request/response shapes and the `LlmProvider` port.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::LlmError;

/// A base64-encoded PNG, in the order the adapter wants it attached
/// (previous, then current — §4.3's image attachment policy).
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub base64_png: String,
}

/// Everything a provider needs to produce a decision for one cycle.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub system_prompt: String,
    pub images: Vec<ImageAttachment>,
    pub tool_name: String,
    pub tool_description: String,
    pub tool_schema: Value,
}

/// A tool call the model made, already split into name + parsed arguments.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Value,
}

/// What a provider returns before the adapter turns it into a `Decision`.
#[derive(Debug, Clone, Default)]
pub struct GenerateResponse {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

/// One interface, at least two implementations, dispatched by `llm_provider`
/// at service start (design note: "dynamic dispatch replaced by small interfaces").
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError>;
}
