//! Game Detector (C2, §4.2) — maps ROM identity to a `GameConfig`, pure data
//! and string matching with no I/O beyond the config values passed in.

mod error;
mod table;

pub use error::DetectError;

use std::collections::HashMap;

use mgba_bridge_protocol::GameConfig;

pub const DEFAULT_GAME_ID: &str = "pokemon_red";

/// Where a detection result came from, in precedence order (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionSource {
    Override,
    RomName,
    RomPath,
    Default,
}

impl DetectionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Override => "override",
            Self::RomName => "rom_name",
            Self::RomPath => "rom_path",
            Self::Default => "default",
        }
    }
}

/// The Game Detector. Holds the built-in token table and per-game configs.
pub struct GameDetector {
    // Insertion order matters for the "first match wins" collision rule.
    tokens: Vec<(&'static str, &'static str)>,
    configs: HashMap<String, GameConfig>,
}

impl GameDetector {
    /// Build a detector over the built-in game set described in spec §4.2.
    pub fn with_builtin_games() -> Self {
        Self {
            tokens: table::builtin_token_table(),
            configs: table::builtin_game_configs(),
        }
    }

    /// Map ROM identity to a game id, per the precedence in spec §4.2:
    /// explicit override, then case-insensitive substring match against
    /// `rom_name`, then against `rom_path`, then the built-in default.
    pub fn detect(
        &self,
        rom_path: &str,
        rom_name: &str,
        game_override: Option<&str>,
    ) -> (String, DetectionSource) {
        if let Some(id) = game_override {
            if !id.trim().is_empty() {
                tracing::info!(game_id = %id, source = "override", "game detected");
                return (id.to_string(), DetectionSource::Override);
            }
        }

        if let Some(id) = self.match_token(rom_name) {
            tracing::info!(game_id = %id, source = "rom_name", "game detected");
            return (id.to_string(), DetectionSource::RomName);
        }

        if let Some(id) = self.match_token(rom_path) {
            tracing::info!(game_id = %id, source = "rom_path", "game detected");
            return (id.to_string(), DetectionSource::RomPath);
        }

        tracing::info!(game_id = DEFAULT_GAME_ID, source = "default", "game detected");
        (DEFAULT_GAME_ID.to_string(), DetectionSource::Default)
    }

    fn match_token(&self, haystack: &str) -> Option<&'static str> {
        let haystack = haystack.to_ascii_lowercase();
        self.tokens
            .iter()
            .find(|(token, _)| haystack.contains(token))
            .map(|(_, game_id)| *game_id)
    }

    /// Look up the full `GameConfig` for a detected game id.
    pub fn config_for(&self, game_id: &str) -> Result<GameConfig, DetectError> {
        self.configs
            .get(game_id)
            .cloned()
            .ok_or_else(|| DetectError::UnknownGame(game_id.to_string()))
    }

    /// All game ids this detector can serve a config for, for the `GET /api/games` contract.
    pub fn known_game_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.configs.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for GameDetector {
    fn default() -> Self {
        Self::with_builtin_games()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> GameDetector {
        GameDetector::with_builtin_games()
    }

    #[test]
    fn detects_known_tokens_case_insensitively() {
        let d = detector();
        let cases = [
            ("Pokemon Sapphire Version", "pokemon_sapphire"),
            ("POKEMON RUBY", "pokemon_ruby"),
            ("pokemon emerald", "pokemon_emerald"),
            ("Pokemon FireRed", "pokemon_firered"),
            ("Pokemon LeafGreen", "pokemon_leafgreen"),
            ("Pokemon Red Version", "pokemon_red"),
            ("Pokemon Blue Version", "pokemon_red"),
        ];
        for (rom_name, expected) in cases {
            let (game_id, source) = d.detect("/roms/game.gba", rom_name, None);
            assert_eq!(game_id, expected, "rom_name={rom_name}");
            assert_eq!(source, DetectionSource::RomName);
        }
    }

    #[test]
    fn falls_back_to_rom_path_then_default() {
        let d = detector();
        let (game_id, source) = d.detect("/roms/emerald.gba", "rom.gba", None);
        assert_eq!(game_id, "pokemon_emerald");
        assert_eq!(source, DetectionSource::RomPath);

        let (game_id, source) = d.detect("/roms/unknown.gba", "unknown.gba", None);
        assert_eq!(game_id, DEFAULT_GAME_ID);
        assert_eq!(source, DetectionSource::Default);
    }

    #[test]
    fn override_takes_precedence_over_rom_name() {
        let d = detector();
        let (game_id, source) = d.detect(
            "/roms/sapphire.gba",
            "Pokemon Sapphire",
            Some("pokemon_emerald"),
        );
        assert_eq!(game_id, "pokemon_emerald");
        assert_eq!(source, DetectionSource::Override);
    }

    #[test]
    fn blank_override_is_ignored() {
        let d = detector();
        let (game_id, source) = d.detect("/roms/ruby.gba", "Pokemon Ruby", Some("   "));
        assert_eq!(game_id, "pokemon_ruby");
        assert_eq!(source, DetectionSource::RomName);
    }

    #[test]
    fn unknown_game_config_lookup_fails() {
        let d = detector();
        assert!(d.config_for("not_a_real_game").is_err());
    }
}
