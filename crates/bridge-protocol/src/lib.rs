//! Wire vocabulary shared between the bridge engine and the emulator's Lua script.
//!
//! This crate holds only data: button codes, game state, per-game config, chat
//! buffer entries, and the screenshot envelope. No I/O, no protocol state
//! machine — those live in `mgba-bridge-engine`.

mod button;
mod chat;
mod error;
mod game_config;
mod game_state;
mod screenshot;

pub use button::{
    classify, ActionClass, ButtonAction, ButtonCode, ButtonSequence, DEFAULT_DURATION_FRAMES,
    MAX_DURATION_FRAMES, MIN_DURATION_FRAMES,
};
pub use chat::{ChatMessage, ChatMessageBody};
pub use error::ProtocolError;
pub use game_config::{GameConfig, MemoryAddresses, MemoryType, Platform};
pub use game_state::{Direction, GameState};
pub use screenshot::ScreenshotEnvelope;
