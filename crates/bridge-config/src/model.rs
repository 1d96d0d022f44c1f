//! The config record and the immutable snapshot the core reads from it (§4.1).

use serde::{Deserialize, Serialize};

/// Per-action-class timing multipliers applied to the base stabilization wait
/// and cooldown (§4.3, §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    pub base_stabilization_ms: u64,
    pub movement_multiplier: f64,
    pub interaction_multiplier: f64,
    pub menu_multiplier: f64,
    pub max_wait_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            base_stabilization_ms: 500,
            movement_multiplier: 1.0,
            interaction_multiplier: 1.5,
            menu_multiplier: 2.0,
            max_wait_ms: 5_000,
        }
    }
}

/// The single persisted config record (§4.1). Stored as one JSON blob in a
/// single-row SQLite table — there is exactly one of these per bridge instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigRecord {
    pub llm_provider: String,
    pub api_key: String,
    pub model_name: String,
    pub decision_cooldown_s: f64,
    pub rom_path: String,
    pub rom_name: String,
    pub game_override: Option<String>,
    pub timing: Timing,
    pub notepad_path: String,
    pub prompt_template_path: String,
}

impl Default for ConfigRecord {
    fn default() -> Self {
        Self {
            llm_provider: "anthropic".to_string(),
            api_key: String::new(),
            model_name: "claude-sonnet-4-5".to_string(),
            decision_cooldown_s: 2.0,
            rom_path: String::new(),
            rom_name: String::new(),
            game_override: None,
            timing: Timing::default(),
            notepad_path: "notepad.txt".to_string(),
            prompt_template_path: "prompt_template.txt".to_string(),
        }
    }
}

/// An immutable, cheaply-cloned view of the config record, handed out by
/// `ConfigStore::get_snapshot` and copied once per cycle (§5).
pub type ConfigSnapshot = ConfigRecord;

/// A partial update applied by the (out-of-scope) UI's save endpoints. Only
/// fields present are changed; everything else keeps its stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigPatch {
    pub llm_provider: Option<String>,
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    pub decision_cooldown_s: Option<f64>,
    pub rom_path: Option<String>,
    pub rom_name: Option<String>,
    pub game_override: Option<Option<String>>,
    pub timing: Option<Timing>,
    pub notepad_path: Option<String>,
    pub prompt_template_path: Option<String>,
}

impl ConfigPatch {
    pub fn apply_to(self, mut record: ConfigRecord) -> ConfigRecord {
        if let Some(v) = self.llm_provider {
            record.llm_provider = v;
        }
        if let Some(v) = self.api_key {
            record.api_key = v;
        }
        if let Some(v) = self.model_name {
            record.model_name = v;
        }
        if let Some(v) = self.decision_cooldown_s {
            record.decision_cooldown_s = v;
        }
        if let Some(v) = self.rom_path {
            record.rom_path = v;
        }
        if let Some(v) = self.rom_name {
            record.rom_name = v;
        }
        if let Some(v) = self.game_override {
            record.game_override = v;
        }
        if let Some(v) = self.timing {
            record.timing = v;
        }
        if let Some(v) = self.notepad_path {
            record.notepad_path = v;
        }
        if let Some(v) = self.prompt_template_path {
            record.prompt_template_path = v;
        }
        record
    }
}
