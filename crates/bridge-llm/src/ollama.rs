//! Ollama (OpenAI-chat-compatible) provider — the "alternative" provider
//! spec §4.3 requires alongside Anthropic, modeled on the teacher's
//! `OllamaClient` (same `/v1/chat/completions` shape, same
//! `build_messages`/`convert_response` split, same `from_env`/`with_timeout`
//! constructors). Images are attached as OpenAI-style `image_url` data-URI
//! parts since locally-hosted GBA-capable vision models speak that dialect.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::LlmError;
use crate::provider::{GenerateRequest, GenerateResponse, LlmProvider, ToolCall};

pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llava";

#[derive(Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self::with_timeout(base_url, model, 120)
    }

    pub fn with_timeout(base_url: &str, model: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    /// Build a client from `OLLAMA_BASE_URL`/`OLLAMA_MODEL`, falling back to
    /// the defaults above when unset.
    pub fn from_env() -> Self {
        let base_url = std::env::var("OLLAMA_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_OLLAMA_BASE_URL.to_string());
        let model =
            std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| DEFAULT_OLLAMA_MODEL.to_string());
        Self::new(&base_url, &model)
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let mut content = vec![ContentPart::Text {
            text: "Analyze the current game screen and choose the next button press."
                .to_string(),
        }];
        for image in &request.images {
            content.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: format!("data:image/png;base64,{}", image.base64_png),
                },
            });
        }

        let api_request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: MessageContent::Text(request.system_prompt),
                    tool_calls: None,
                },
                Message {
                    role: "user".to_string(),
                    content: MessageContent::Parts(content),
                    tool_calls: None,
                },
            ],
            tools: vec![Tool {
                r#type: "function".to_string(),
                function: Function {
                    name: request.tool_name,
                    description: request.tool_description,
                    parameters: request.tool_schema,
                },
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&api_request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status.as_u16(), body));
        }

        let api_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::BadResponse(e.to_string()))?;

        convert_response(api_response)
    }
}

fn map_transport_error(err: reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout(err.to_string())
    } else {
        LlmError::Network(err.to_string())
    }
}

fn convert_response(response: ChatResponse) -> Result<GenerateResponse, LlmError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::BadResponse("no choices in response".to_string()))?;

    let mut tool_calls = Vec::new();
    for tc in choice.message.tool_calls.unwrap_or_default() {
        let arguments: serde_json::Value = serde_json::from_str(&tc.function.arguments)
            .map_err(|e| LlmError::BadResponse(format!("invalid tool arguments: {e}")))?;
        tool_calls.push(ToolCall {
            name: tc.function.name,
            arguments,
        });
    }

    let text = match choice.message.content {
        Some(MessageContent::Text(t)) => t,
        _ => String::new(),
    };

    Ok(GenerateResponse { text, tool_calls })
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    tools: Vec<Tool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: MessageContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize, Deserialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct Tool {
    r#type: String,
    function: Function,
}

#[derive(Debug, Serialize)]
struct Function {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiToolCall {
    function: OpenAiToolCallFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiToolCallFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_tool_call_into_button_press() {
        let response = ChatResponse {
            choices: vec![Choice {
                message: Message {
                    role: "assistant".to_string(),
                    content: MessageContent::Text(String::new()),
                    tool_calls: Some(vec![OpenAiToolCall {
                        function: OpenAiToolCallFunction {
                            name: "press_button".to_string(),
                            arguments: r#"{"buttons":["UP"]}"#.to_string(),
                        },
                    }]),
                },
            }],
        };
        let converted = convert_response(response).unwrap();
        assert_eq!(converted.tool_calls.len(), 1);
        assert_eq!(converted.tool_calls[0].name, "press_button");
    }

    #[test]
    fn text_only_response_has_no_tool_calls() {
        let response = ChatResponse {
            choices: vec![Choice {
                message: Message {
                    role: "assistant".to_string(),
                    content: MessageContent::Text("Not sure what to do.".to_string()),
                    tool_calls: None,
                },
            }],
        };
        let converted = convert_response(response).unwrap();
        assert!(converted.tool_calls.is_empty());
        assert_eq!(converted.text, "Not sure what to do.");
    }
}
