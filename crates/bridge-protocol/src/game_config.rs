//! Per-game configuration served by the Game Detector (§3, §4.2).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    GameBoy,
    GameBoyAdvance,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GameBoy => "Game Boy",
            Self::GameBoyAdvance => "Game Boy Advance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    Static,
    Dynamic,
}

/// The four memory addresses the emulator's Lua side needs to decode state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryAddresses {
    pub player_direction: u32,
    pub player_x: u32,
    pub player_y: u32,
    pub map_id: u32,
}

/// One complete `GameConfig` record, as described in spec §3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub id: String,
    pub name: String,
    pub platform: Platform,
    pub memory_type: MemoryType,
    /// `None` when `memory_type` is `Dynamic` and no single static layout applies.
    pub memory_addresses: Option<MemoryAddresses>,
    /// Raw byte -> direction label, as the cartridge itself encodes facing.
    pub direction_encoding: BTreeMap<u8, String>,
    /// Alternate address sets to try, in order, before giving up on a static read.
    pub fallback_addresses: Vec<MemoryAddresses>,
}

impl GameConfig {
    /// Render this config as the compact Lua table literal the emulator script
    /// expects on the wire (`game_config||{...}`). Kept as a small, dedicated
    /// generator so the wire format stays in one place (design note §9).
    pub fn to_lua_literal(&self) -> String {
        let mut out = String::from("{");
        out.push_str(&format!("id=\"{}\",", lua_escape(&self.id)));
        out.push_str(&format!("name=\"{}\",", lua_escape(&self.name)));
        out.push_str(&format!("platform=\"{}\",", lua_escape(self.platform.as_str())));
        out.push_str(&format!(
            "memoryType=\"{}\",",
            match self.memory_type {
                MemoryType::Static => "static",
                MemoryType::Dynamic => "dynamic",
            }
        ));

        match &self.memory_addresses {
            Some(addr) => out.push_str(&format!(
                "memoryAddresses={},",
                addresses_to_lua(addr)
            )),
            None => out.push_str("memoryAddresses=nil,"),
        }

        out.push_str("directionEncoding={");
        for (byte, label) in &self.direction_encoding {
            out.push_str(&format!("[{}]=\"{}\",", byte, lua_escape(label)));
        }
        out.push_str("},");

        out.push_str("fallbackAddresses={");
        for addr in &self.fallback_addresses {
            out.push_str(&addresses_to_lua(addr));
            out.push(',');
        }
        out.push('}');

        out.push('}');
        out
    }
}

fn addresses_to_lua(addr: &MemoryAddresses) -> String {
    format!(
        "{{playerDirection=0x{:X},playerX=0x{:X},playerY=0x{:X},mapId=0x{:X}}}",
        addr.player_direction, addr.player_x, addr.player_y, addr.map_id
    )
}

/// Escape the handful of characters that can appear in game names/ids and would
/// otherwise break a Lua double-quoted string literal.
fn lua_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> GameConfig {
        let mut direction_encoding = BTreeMap::new();
        direction_encoding.insert(0, "DOWN".to_string());
        direction_encoding.insert(4, "UP".to_string());

        GameConfig {
            id: "pokemon_red".to_string(),
            name: "Pok\u{e9}mon Red".to_string(),
            platform: Platform::GameBoy,
            memory_type: MemoryType::Static,
            memory_addresses: Some(MemoryAddresses {
                player_direction: 0xD367,
                player_x: 0xD362,
                player_y: 0xD361,
                map_id: 0xD35E,
            }),
            direction_encoding,
            fallback_addresses: vec![],
        }
    }

    #[test]
    fn lua_literal_embeds_memory_addresses_as_hex() {
        let literal = sample_config().to_lua_literal();
        assert!(literal.contains("playerDirection=0xD367"));
        assert!(literal.contains("id=\"pokemon_red\""));
        assert!(literal.contains("memoryType=\"static\""));
    }

    #[test]
    fn lua_literal_uses_nil_for_dynamic_layout() {
        let mut config = sample_config();
        config.memory_type = MemoryType::Dynamic;
        config.memory_addresses = None;
        let literal = config.to_lua_literal();
        assert!(literal.contains("memoryAddresses=nil"));
    }
}
