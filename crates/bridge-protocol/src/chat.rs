//! Chat Buffer entry types (§3, §4.5) — the observable log the browser UI polls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::button::ButtonAction;
use crate::game_state::GameState;

/// One entry in the bounded ring buffer. Every message carries a monotonically
/// increasing `id` assigned by the buffer at insert time (invariant 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub body: ChatMessageBody,
}

/// The tagged union of observable events described in spec §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatMessageBody {
    System {
        content: String,
    },
    Screenshot {
        image_data_uri: String,
        game_state: GameState,
    },
    ScreenshotComparison {
        previous_uri: String,
        current_uri: String,
        game_state: GameState,
    },
    AiResponse {
        text: String,
        actions: Vec<ButtonAction>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_details: Option<String>,
    },
    Narration {
        content: String,
    },
}

impl ChatMessageBody {
    /// True for the two screenshot-bearing variants that open a cycle (P1).
    pub fn is_screenshot(&self) -> bool {
        matches!(self, Self::Screenshot { .. } | Self::ScreenshotComparison { .. })
    }

    pub fn is_ai_response(&self) -> bool {
        matches!(self, Self::AiResponse { .. })
    }
}
