//! Button codes, actions, and the compact wire encoding exchanged with the emulator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single GBA/GB button, in the fixed order the emulator script expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ButtonCode {
    A = 0,
    B = 1,
    Select = 2,
    Start = 3,
    Right = 4,
    Left = 5,
    Up = 6,
    Down = 7,
    R = 8,
    L = 9,
}

impl ButtonCode {
    pub const ALL: [ButtonCode; 10] = [
        ButtonCode::A,
        ButtonCode::B,
        ButtonCode::Select,
        ButtonCode::Start,
        ButtonCode::Right,
        ButtonCode::Left,
        ButtonCode::Up,
        ButtonCode::Down,
        ButtonCode::R,
        ButtonCode::L,
    ];

    /// Parse a button name as sent by the LLM tool call (`"UP"`, `"a"`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            "SELECT" => Some(Self::Select),
            "START" => Some(Self::Start),
            "RIGHT" => Some(Self::Right),
            "LEFT" => Some(Self::Left),
            "UP" => Some(Self::Up),
            "DOWN" => Some(Self::Down),
            "R" => Some(Self::R),
            "L" => Some(Self::L),
            _ => None,
        }
    }

    /// The numeric code the emulator's Lua side expects, `0..=9`.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Reconstruct a button from its numeric code, if it is in range.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::Select => "SELECT",
            Self::Start => "START",
            Self::Right => "RIGHT",
            Self::Left => "LEFT",
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::R => "R",
            Self::L => "L",
        }
    }

    pub fn is_directional(self) -> bool {
        matches!(self, Self::Up | Self::Down | Self::Left | Self::Right)
    }
}

impl fmt::Display for ButtonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Lowest/highest valid values for a `ButtonAction` before clamping kicks in (invariant 3).
pub const MIN_DURATION_FRAMES: u32 = 1;
pub const MAX_DURATION_FRAMES: u32 = 180;
pub const DEFAULT_DURATION_FRAMES: u32 = 2;

/// One button press, held for `duration_frames` emulator frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonAction {
    pub code: ButtonCode,
    pub duration_frames: u32,
}

impl ButtonAction {
    pub fn new(code: ButtonCode, duration_frames: u32) -> Self {
        Self {
            code,
            duration_frames: clamp_duration(duration_frames),
        }
    }

    /// A press of the default duration, used when the LLM didn't specify one.
    pub fn default_duration(code: ButtonCode) -> Self {
        Self {
            code,
            duration_frames: DEFAULT_DURATION_FRAMES,
        }
    }
}

fn clamp_duration(duration: u32) -> u32 {
    duration.clamp(MIN_DURATION_FRAMES, MAX_DURATION_FRAMES)
}

/// A non-empty ordered sequence of button presses (typically 1-8 long).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonSequence(pub Vec<ButtonAction>);

impl ButtonSequence {
    pub fn new(actions: Vec<ButtonAction>) -> Self {
        Self(actions)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn actions(&self) -> &[ButtonAction] {
        &self.0
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.0.iter().map(|a| a.code.name()).collect()
    }

    /// Encode to the wire frame format: `codes(,codes)*(||durs(,durs)*)?`.
    ///
    /// The `||` separator is omitted entirely when every action uses the default
    /// duration, matching the emulator's compact form (P4).
    pub fn encode_wire(&self) -> String {
        let codes: Vec<String> = self.0.iter().map(|a| a.code.code().to_string()).collect();
        let codes_part = codes.join(",");

        let all_default = self
            .0
            .iter()
            .all(|a| a.duration_frames == DEFAULT_DURATION_FRAMES);

        if all_default {
            codes_part
        } else {
            let durs: Vec<String> = self
                .0
                .iter()
                .map(|a| a.duration_frames.to_string())
                .collect();
            format!("{}||{}", codes_part, durs.join(","))
        }
    }

    /// Decode a wire frame produced by [`encode_wire`](Self::encode_wire).
    ///
    /// Out-of-range codes are dropped; out-of-range (or missing) durations fall
    /// back to [`DEFAULT_DURATION_FRAMES`], per invariant 3.
    pub fn decode_wire(frame: &str) -> Self {
        let mut parts = frame.splitn(2, "||");
        let codes_part = parts.next().unwrap_or_default();
        let durs_part = parts.next();

        let codes: Vec<u8> = codes_part
            .split(',')
            .filter_map(|s| s.trim().parse::<u8>().ok())
            .collect();

        let durs: Vec<u32> = durs_part
            .map(|d| {
                d.split(',')
                    .filter_map(|s| s.trim().parse::<u32>().ok())
                    .collect()
            })
            .unwrap_or_default();

        let actions = codes
            .into_iter()
            .enumerate()
            .filter_map(|(i, code)| {
                ButtonCode::from_code(code).map(|button| {
                    let duration = durs
                        .get(i)
                        .copied()
                        .map(clamp_duration)
                        .unwrap_or(DEFAULT_DURATION_FRAMES);
                    ButtonAction::new(button, duration)
                })
            })
            .collect();

        Self(actions)
    }
}

/// Pacing class used by the cooldown gate (§4.4) and the stabilization wait (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionClass {
    Movement,
    Interaction,
    Menu,
    Base,
}

impl ActionClass {
    /// Multiplier applied to the base cooldown/stabilization for this class.
    pub fn multiplier(self, movement: f64, interaction: f64, menu: f64) -> f64 {
        match self {
            Self::Movement => movement,
            Self::Interaction => interaction,
            Self::Menu => menu,
            Self::Base => 1.0,
        }
    }
}

impl Default for ActionClass {
    fn default() -> Self {
        Self::Base
    }
}

/// Classify a button sequence per spec §4.4: interaction (A/B present) beats
/// movement, menu (START/SELECT) is checked first because it changes game mode
/// outright, and an empty/unknown mix falls back to `Base`.
pub fn classify(sequence: &ButtonSequence) -> ActionClass {
    let codes: Vec<ButtonCode> = sequence.0.iter().map(|a| a.code).collect();

    let has_menu = codes
        .iter()
        .any(|c| matches!(c, ButtonCode::Start | ButtonCode::Select));
    let has_interaction = codes.iter().any(|c| matches!(c, ButtonCode::A | ButtonCode::B));
    let has_movement = codes.iter().any(|c| c.is_directional());

    if has_interaction {
        ActionClass::Interaction
    } else if has_menu {
        ActionClass::Menu
    } else if has_movement {
        ActionClass::Movement
    } else {
        ActionClass::Base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_omits_durations_when_all_default() {
        let seq = ButtonSequence::new(vec![
            ButtonAction::default_duration(ButtonCode::Up),
            ButtonAction::default_duration(ButtonCode::A),
        ]);
        assert_eq!(seq.encode_wire(), "6,0");
    }

    #[test]
    fn encode_includes_durations_when_non_default() {
        let seq = ButtonSequence::new(vec![
            ButtonAction::new(ButtonCode::Up, 10),
            ButtonAction::new(ButtonCode::A, 2),
        ]);
        assert_eq!(seq.encode_wire(), "6,0||10,2");
    }

    #[test]
    fn decode_round_trips_non_default_durations() {
        let seq = ButtonSequence::decode_wire("6,0||10,2");
        assert_eq!(seq.0[0].code, ButtonCode::Up);
        assert_eq!(seq.0[0].duration_frames, 10);
        assert_eq!(seq.0[1].code, ButtonCode::A);
        assert_eq!(seq.0[1].duration_frames, 2);
    }

    #[test]
    fn decode_drops_out_of_range_codes_and_clamps_durations() {
        let seq = ButtonSequence::decode_wire("6,99,0||500,5");
        // code 99 is dropped; code 0 (A) pairs with its own duration slot, which
        // is missing once the bad entry is skipped from the codes list, so it
        // falls back to the default.
        assert_eq!(seq.0.len(), 2);
        assert_eq!(seq.0[0].code, ButtonCode::Up);
        assert_eq!(seq.0[0].duration_frames, MAX_DURATION_FRAMES);
    }

    #[test]
    fn classify_prefers_interaction_over_movement() {
        let seq = ButtonSequence::new(vec![
            ButtonAction::default_duration(ButtonCode::Up),
            ButtonAction::default_duration(ButtonCode::A),
        ]);
        assert_eq!(classify(&seq), ActionClass::Interaction);
    }

    #[test]
    fn classify_menu_when_start_or_select_without_interaction() {
        let seq = ButtonSequence::new(vec![ButtonAction::default_duration(ButtonCode::Start)]);
        assert_eq!(classify(&seq), ActionClass::Menu);
    }

    #[test]
    fn classify_base_for_empty_sequence() {
        let seq = ButtonSequence::default();
        assert_eq!(classify(&seq), ActionClass::Base);
    }
}
