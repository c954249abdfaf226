//! Display names for physical keys.
//!
//! Printable keys are shown by the glyph the active layout puts on them; only the
//! named keys (modifiers, whitespace, editing keys) have fixed labels.

use crate::keyboard::geometry::PhysicalKeyId;
use crate::keyboard::layout::{Layout, ModifierLevel};

/// Human-readable name for a non-printing key. Returns `""` for keys whose label
/// comes from the layout.
pub fn key_display_name(key: PhysicalKeyId) -> &'static str {
    match key.as_str() {
        "Backspace" => "Backspace",
        "Tab" => "Tab",
        "Enter" => "Enter",
        "Space" => "Space",
        "CapsLock" => "Caps Lock",
        "ShiftLeft" => "Left Shift",
        "ShiftRight" => "Right Shift",
        "ControlLeft" | "ControlRight" => "Ctrl",
        "AltLeft" => "Alt",
        "AltRight" => "AltGr",
        "MetaLeft" | "MetaRight" => "Super",
        "ContextMenu" => "Menu",
        _ => "",
    }
}

/// Label for a key on `layout`: its fixed name, else the glyph it types.
pub fn key_label(layout: &Layout, key: PhysicalKeyId) -> String {
    let name = key_display_name(key);
    if !name.is_empty() {
        return name.to_string();
    }
    layout
        .symbol(key, ModifierLevel::Shift)
        .or_else(|| layout.symbol(key, ModifierLevel::Base))
        .map(|s| s.glyph().to_string())
        .unwrap_or_else(|| key.as_str().to_string())
}

/// Keys joined the way a hint reads, e.g. `A + Right Shift`.
pub fn keys_label(layout: &Layout, keys: &[PhysicalKeyId]) -> String {
    keys.iter()
        .map(|&k| key_label(layout, k))
        .collect::<Vec<_>>()
        .join(" + ")
}
