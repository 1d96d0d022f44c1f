//! The built-in token table and per-game configs (§4.2).
//!
//! The concrete memory addresses here are placeholders, not verified ROM
//! offsets — the retrieval pipeline that produced this repo's inputs filtered
//! out the original project's source, so there is no authoritative address
//! table to carry forward (see DESIGN.md). `pokemon_red` gets a plausible
//! static layout to exercise that code path; the GBA-era games are modeled as
//! `dynamic` with fallback address sets, which is how the real cartridges
//! behave anyway (their save block moves between ROM revisions).

use std::collections::{BTreeMap, HashMap};

use mgba_bridge_protocol::{GameConfig, MemoryAddresses, MemoryType, Platform};

/// Token -> game id, in the exact precedence order spec §4.2 specifies.
pub fn builtin_token_table() -> Vec<(&'static str, &'static str)> {
    vec![
        ("sapphire", "pokemon_sapphire"),
        ("ruby", "pokemon_ruby"),
        ("emerald", "pokemon_emerald"),
        ("firered", "pokemon_firered"),
        ("leafgreen", "pokemon_leafgreen"),
        ("red", "pokemon_red"),
        ("blue", "pokemon_red"),
    ]
}

fn gen1_direction_encoding() -> BTreeMap<u8, String> {
    // Matches the facing encoding used across Gen 1/2-era overworld sprites:
    // 0=down, 4=up, 8=left, 12=right.
    [(0u8, "DOWN"), (4, "UP"), (8, "LEFT"), (12, "RIGHT")]
        .into_iter()
        .map(|(k, v)| (k, v.to_string()))
        .collect()
}

pub fn builtin_game_configs() -> HashMap<String, GameConfig> {
    let mut configs = HashMap::new();

    configs.insert(
        "pokemon_red".to_string(),
        GameConfig {
            id: "pokemon_red".to_string(),
            name: "Pok\u{e9}mon Red/Blue".to_string(),
            platform: Platform::GameBoy,
            memory_type: MemoryType::Static,
            memory_addresses: Some(MemoryAddresses {
                player_direction: 0xC109,
                player_x: 0xD362,
                player_y: 0xD361,
                map_id: 0xD35E,
            }),
            direction_encoding: gen1_direction_encoding(),
            fallback_addresses: vec![],
        },
    );

    for (id, name) in [
        ("pokemon_sapphire", "Pok\u{e9}mon Sapphire"),
        ("pokemon_ruby", "Pok\u{e9}mon Ruby"),
        ("pokemon_emerald", "Pok\u{e9}mon Emerald"),
    ] {
        configs.insert(
            id.to_string(),
            GameConfig {
                id: id.to_string(),
                name: name.to_string(),
                platform: Platform::GameBoyAdvance,
                memory_type: MemoryType::Dynamic,
                memory_addresses: None,
                direction_encoding: gen1_direction_encoding(),
                fallback_addresses: vec![
                    MemoryAddresses {
                        player_direction: 0x0200_5080,
                        player_x: 0x0200_5084,
                        player_y: 0x0200_5086,
                        map_id: 0x0200_50A8,
                    },
                    MemoryAddresses {
                        player_direction: 0x0200_50F0,
                        player_x: 0x0200_50F4,
                        player_y: 0x0200_50F6,
                        map_id: 0x0200_5118,
                    },
                ],
            },
        );
    }

    for (id, name) in [
        ("pokemon_firered", "Pok\u{e9}mon FireRed"),
        ("pokemon_leafgreen", "Pok\u{e9}mon LeafGreen"),
    ] {
        configs.insert(
            id.to_string(),
            GameConfig {
                id: id.to_string(),
                name: name.to_string(),
                platform: Platform::GameBoyAdvance,
                memory_type: MemoryType::Dynamic,
                memory_addresses: None,
                direction_encoding: gen1_direction_encoding(),
                fallback_addresses: vec![MemoryAddresses {
                    player_direction: 0x0200_3F3C,
                    player_x: 0x0200_3F40,
                    player_y: 0x0200_3F42,
                    map_id: 0x0200_3F64,
                }],
            },
        );
    }

    configs
}
