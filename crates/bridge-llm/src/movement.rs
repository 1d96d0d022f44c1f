//! Movement analysis feeding the prompt's `{spatial_context}` and
//! `{direction_guidance}` placeholders (spec §4.3, scenario 4): stuck
//! detection over the last 3+ identical positions, oscillation detection
//! over the last 4 alternating positions.

use mgba_bridge_protocol::{ActionClass, GameState};

/// Per-session memory the engine hands to the adapter each cycle: recent
/// positions and recent button-name sequences (capped at 8), plus the class
/// of the last dispatched action (used for the readiness/cooldown multiplier).
#[derive(Debug, Clone, Default)]
pub struct MemoryContext {
    pub recent_positions: Vec<(i64, i64, i64)>,
    pub recent_actions: Vec<Vec<String>>,
    pub last_action_class: Option<ActionClass>,
}

const STUCK_WINDOW: usize = 3;
const OSCILLATION_WINDOW: usize = 4;
const MAX_RECENT_ACTIONS: usize = 8;

impl MemoryContext {
    pub fn push_position(&mut self, state: &GameState) {
        self.recent_positions.push(state.position());
    }

    pub fn push_actions(&mut self, names: Vec<String>) {
        self.recent_actions.push(names);
        if self.recent_actions.len() > MAX_RECENT_ACTIONS {
            self.recent_actions.remove(0);
        }
    }

    fn is_stuck(&self) -> bool {
        let positions = &self.recent_positions;
        if positions.len() < STUCK_WINDOW {
            return false;
        }
        let window = &positions[positions.len() - STUCK_WINDOW..];
        window.iter().all(|p| *p == window[0])
    }

    fn is_oscillating(&self) -> bool {
        let positions = &self.recent_positions;
        if positions.len() < OSCILLATION_WINDOW {
            return false;
        }
        let w = &positions[positions.len() - OSCILLATION_WINDOW..];
        w[0] == w[2] && w[1] == w[3] && w[0] != w[1]
    }
}

/// Short description of where the player is relative to recent history, for
/// `{spatial_context}`.
pub fn spatial_context(memory: &MemoryContext, state: &GameState) -> String {
    format!(
        "Player is at ({}, {}) on map {}, facing {:?}. {} recent position(s) tracked.",
        state.x,
        state.y,
        state.map_id,
        state.direction,
        memory.recent_positions.len()
    )
}

/// Hints for `{direction_guidance}`: explicitly calls out stuck/oscillation
/// so a downstream prompt-quality check can grep for "stuck" (scenario 4).
pub fn direction_guidance(memory: &MemoryContext) -> String {
    if memory.is_stuck() {
        "You appear stuck: the last few moves did not change position. Try a different direction or interact with what's in front of you.".to_string()
    } else if memory.is_oscillating() {
        "You appear to be oscillating between two positions. Try a perpendicular direction instead of reversing.".to_string()
    } else {
        "Movement looks normal.".to_string()
    }
}

/// `{recent_actions}`: the last k<=8 button-name sequences, one per cycle.
pub fn recent_actions_summary(memory: &MemoryContext) -> String {
    if memory.recent_actions.is_empty() {
        return "none yet".to_string();
    }
    memory
        .recent_actions
        .iter()
        .map(|names| names.join("+"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mgba_bridge_protocol::Direction;

    fn state(x: i64, y: i64, map_id: i64) -> GameState {
        GameState::new(Direction::Up, x, y, map_id)
    }

    #[test]
    fn detects_stuck_after_three_identical_positions() {
        let mut mem = MemoryContext::default();
        for _ in 0..3 {
            mem.push_position(&state(5, 5, 1));
        }
        assert!(direction_guidance(&mem).to_lowercase().contains("stuck"));
    }

    #[test]
    fn detects_oscillation_over_four_alternating_positions() {
        let mut mem = MemoryContext::default();
        for p in [(5, 5, 1), (5, 6, 1), (5, 5, 1), (5, 6, 1)] {
            mem.push_position(&state(p.0, p.1, p.2));
        }
        assert!(direction_guidance(&mem)
            .to_lowercase()
            .contains("oscillat"));
    }

    #[test]
    fn normal_movement_has_no_warning() {
        let mut mem = MemoryContext::default();
        for p in [(1, 1, 1), (2, 1, 1), (3, 1, 1)] {
            mem.push_position(&state(p.0, p.1, p.2));
        }
        let guidance = direction_guidance(&mem);
        assert!(!guidance.to_lowercase().contains("stuck"));
        assert!(!guidance.to_lowercase().contains("oscillat"));
    }

    #[test]
    fn recent_actions_caps_at_eight_entries() {
        let mut mem = MemoryContext::default();
        for i in 0..10 {
            mem.push_actions(vec![format!("A{i}")]);
        }
        assert_eq!(mem.recent_actions.len(), 8);
        assert_eq!(mem.recent_actions[0], vec!["A2".to_string()]);
    }
}
