//! The adapter's single operation (spec §4.3): `analyze(screenshots,
//! game_state, memory_ctx, notepad) -> Decision`. Orchestrates screenshot
//! readiness, image attachment, prompt assembly, and the provider call, and
//! never lets a provider/IO error escape upward — everything becomes a
//! `Decision` with `error` set.

use std::path::Path;
use std::sync::Arc;

use mgba_bridge_protocol::{ButtonAction, ButtonCode, ButtonSequence, GameState, DEFAULT_DURATION_FRAMES};
use serde::Deserialize;

use crate::error::LlmError;
use crate::image::encode_png_base64;
use crate::movement::{direction_guidance, recent_actions_summary, spatial_context, MemoryContext};
use crate::prompt::{PromptTemplate, PromptVars};
use crate::provider::{GenerateRequest, ImageAttachment, LlmProvider};
use crate::readiness::{wait_until_ready, ReadinessConfig};
use crate::tool::{press_button_description, press_button_schema, PRESS_BUTTON_TOOL_NAME};

const NOTEPAD_MAX_CHARS: usize = 4_000;

/// What the engine asks the adapter to decide on, for one cycle.
#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    pub current_path: String,
    pub previous_path: Option<String>,
    pub game_state: GameState,
    pub memory: MemoryContext,
    pub notepad_path: String,
    pub readiness: ReadinessConfig,
}

/// The adapter's verdict: button sequence plus whatever text the model said,
/// or an error class if something went wrong along the way (spec §3, §4.3).
#[derive(Debug, Clone, Default)]
pub struct Decision {
    pub text: String,
    pub actions: ButtonSequence,
    pub error: Option<LlmError>,
}

impl Decision {
    fn from_error(error: LlmError) -> Self {
        Self {
            text: format!("\u{26a0}\u{fe0f} An error occurred: {}", error.kind()),
            actions: ButtonSequence::default(),
            error: Some(error),
        }
    }
}

#[derive(Deserialize)]
struct PressButtonArgs {
    buttons: Vec<String>,
    durations: Option<Vec<i64>>,
}

/// Provider-agnostic façade: owns the prompt template and one provider
/// implementation, dispatched by `llm_provider` at service start (spec §4.3,
/// design note "dynamic dispatch replaced by small interfaces").
pub struct LlmAdapter {
    provider: Arc<dyn LlmProvider>,
    prompt_template: PromptTemplate,
}

impl LlmAdapter {
    pub fn new(provider: Arc<dyn LlmProvider>, prompt_template_path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            provider,
            prompt_template: PromptTemplate::new(prompt_template_path),
        }
    }

    pub async fn analyze(&self, request: AnalyzeRequest) -> Decision {
        let class = request.memory.last_action_class.unwrap_or_default();
        let max_wait = request.readiness.max_wait(class);

        if let Err(e) = wait_until_ready(&request.current_path, max_wait).await {
            return Decision::from_error(e);
        }

        let mut images = Vec::new();
        if let Some(previous) = request.previous_path.as_deref() {
            if Path::new(previous).exists() {
                if let Ok(encoded) = encode_png_base64(previous).await {
                    images.push(ImageAttachment {
                        base64_png: encoded,
                    });
                }
            }
        }

        match encode_png_base64(&request.current_path).await {
            Ok(encoded) => images.push(ImageAttachment {
                base64_png: encoded,
            }),
            Err(e) => return Decision::from_error(e),
        }

        let notepad_content = read_notepad(&request.notepad_path).await;

        let vars = PromptVars {
            spatial_context: spatial_context(&request.memory, &request.game_state),
            recent_actions: recent_actions_summary(&request.memory),
            direction_guidance: direction_guidance(&request.memory),
            notepad_content,
            current_map: request.game_state.map_id.to_string(),
            player_x: request.game_state.x.to_string(),
            player_y: request.game_state.y.to_string(),
            player_direction: format!("{:?}", request.game_state.direction),
        };

        let system_prompt = match self.prompt_template.render(&vars).await {
            Ok(p) => p,
            Err(e) => return Decision::from_error(e),
        };

        let generate_request = GenerateRequest {
            system_prompt,
            images,
            tool_name: PRESS_BUTTON_TOOL_NAME.to_string(),
            tool_description: press_button_description().to_string(),
            tool_schema: press_button_schema(),
        };

        match self.provider.generate(generate_request).await {
            Ok(response) => Decision {
                text: response.text,
                actions: extract_actions(&response.tool_calls),
                error: None,
            },
            Err(e) => Decision::from_error(e),
        }
    }
}

async fn read_notepad(path: &str) -> String {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => content.chars().take(NOTEPAD_MAX_CHARS).collect(),
        Err(_) => String::new(),
    }
}

fn extract_actions(tool_calls: &[crate::provider::ToolCall]) -> ButtonSequence {
    for call in tool_calls {
        if call.name != PRESS_BUTTON_TOOL_NAME {
            continue;
        }
        let Ok(args) = serde_json::from_value::<PressButtonArgs>(call.arguments.clone()) else {
            continue;
        };

        let codes: Vec<ButtonCode> = args
            .buttons
            .iter()
            .filter_map(|name| ButtonCode::from_name(name))
            .collect();
        if codes.is_empty() {
            continue;
        }

        let durations = args.durations.unwrap_or_default();
        let actions = codes
            .into_iter()
            .enumerate()
            .map(|(i, code)| {
                let duration = durations
                    .get(i)
                    .map(|d| (*d).clamp(0, u32::MAX as i64) as u32)
                    .unwrap_or(DEFAULT_DURATION_FRAMES);
                ButtonAction::new(code, duration)
            })
            .collect();
        return ButtonSequence::new(actions);
    }

    ButtonSequence::default()
}
