//! The in-game state the emulator reports each cycle.

use serde::{Deserialize, Serialize};

/// Facing direction, decoded by the emulator from the game's own byte encoding.
/// The core never interprets the raw byte itself — it only ever sees this label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    Unknown,
}

impl Direction {
    pub fn from_wire(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "UP" => Self::Up,
            "DOWN" => Self::Down,
            "LEFT" => Self::Left,
            "RIGHT" => Self::Right,
            _ => Self::Unknown,
        }
    }
}

impl Default for Direction {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Player position and facing, as reported by the emulator's memory reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub direction: Direction,
    pub x: i64,
    pub y: i64,
    pub map_id: i64,
}

impl GameState {
    pub fn new(direction: Direction, x: i64, y: i64, map_id: i64) -> Self {
        Self {
            direction,
            x,
            y,
            map_id,
        }
    }

    /// The `(x, y, map_id)` triple used by stuck/oscillation detection, which
    /// ignores facing direction (spec §4.3).
    pub fn position(&self) -> (i64, i64, i64) {
        (self.x, self.y, self.map_id)
    }
}
