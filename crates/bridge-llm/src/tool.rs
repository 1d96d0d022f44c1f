//! The single tool every provider advertises to the model (§4.3).

use serde_json::{json, Value};

pub const PRESS_BUTTON_TOOL_NAME: &str = "press_button";

/// JSON Schema for `press_button(buttons: string[], durations?: int[])`.
pub fn press_button_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "buttons": {
                "type": "array",
                "items": {
                    "type": "string",
                    "enum": ["A", "B", "SELECT", "START", "RIGHT", "LEFT", "UP", "DOWN", "R", "L"]
                },
                "minItems": 1,
                "description": "Button names to press in order."
            },
            "durations": {
                "type": "array",
                "items": { "type": "integer", "minimum": 1, "maximum": 180 },
                "description": "Frame durations matching each button, defaults to 2 if omitted."
            }
        },
        "required": ["buttons"]
    })
}

pub fn press_button_description() -> &'static str {
    "Press one or more Game Boy/GBA buttons in sequence to act in the game."
}
