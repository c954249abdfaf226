use std::fmt;

use serde::{Deserialize, Serialize};

/// A physical key position, named after the W3C `KeyboardEvent.code` value.
///
/// Only codes that belong to at least one [`Geometry`] can be constructed, so an
/// unknown key id is rejected at the parse boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhysicalKeyId(&'static str);

impl PhysicalKeyId {
    pub const BACKSPACE: Self = Self("Backspace");
    pub const SPACE: Self = Self("Space");
    pub const SHIFT_LEFT: Self = Self("ShiftLeft");
    pub const SHIFT_RIGHT: Self = Self("ShiftRight");
    pub const ALT_RIGHT: Self = Self("AltRight");

    pub fn parse(code: &str) -> Option<Self> {
        Geometry::ALL
            .iter()
            .flat_map(|g| g.rows().iter())
            .flat_map(|row| row.iter())
            .find(|&&known| known == code)
            .map(|&known| Self(known))
    }

    pub fn as_str(self) -> &'static str {
        self.0
    }

    /// Keys that never produce text on their own.
    pub fn is_modifier(self) -> bool {
        matches!(
            self.0,
            "ShiftLeft"
                | "ShiftRight"
                | "ControlLeft"
                | "ControlRight"
                | "AltLeft"
                | "AltRight"
                | "MetaLeft"
                | "MetaRight"
                | "CapsLock"
                | "ContextMenu"
        )
    }
}

impl fmt::Display for PhysicalKeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

const NUMBER_ROW: &[&str] = &[
    "Backquote", "Digit1", "Digit2", "Digit3", "Digit4", "Digit5", "Digit6", "Digit7", "Digit8",
    "Digit9", "Digit0", "Minus", "Equal", "Backspace",
];
const NUMBER_ROW_JIS: &[&str] = &[
    "Backquote", "Digit1", "Digit2", "Digit3", "Digit4", "Digit5", "Digit6", "Digit7", "Digit8",
    "Digit9", "Digit0", "Minus", "Equal", "IntlYen", "Backspace",
];
const TOP_ROW_ANSI: &[&str] = &[
    "Tab", "KeyQ", "KeyW", "KeyE", "KeyR", "KeyT", "KeyY", "KeyU", "KeyI", "KeyO", "KeyP",
    "BracketLeft", "BracketRight", "Backslash",
];
const TOP_ROW_ISO: &[&str] = &[
    "Tab", "KeyQ", "KeyW", "KeyE", "KeyR", "KeyT", "KeyY", "KeyU", "KeyI", "KeyO", "KeyP",
    "BracketLeft", "BracketRight",
];
const HOME_ROW_ANSI: &[&str] = &[
    "CapsLock", "KeyA", "KeyS", "KeyD", "KeyF", "KeyG", "KeyH", "KeyJ", "KeyK", "KeyL",
    "Semicolon", "Quote", "Enter",
];
const HOME_ROW_ISO: &[&str] = &[
    "CapsLock", "KeyA", "KeyS", "KeyD", "KeyF", "KeyG", "KeyH", "KeyJ", "KeyK", "KeyL",
    "Semicolon", "Quote", "Backslash", "Enter",
];
const BOTTOM_ROW_ANSI: &[&str] = &[
    "ShiftLeft", "KeyZ", "KeyX", "KeyC", "KeyV", "KeyB", "KeyN", "KeyM", "Comma", "Period",
    "Slash", "ShiftRight",
];
const BOTTOM_ROW_ISO: &[&str] = &[
    "ShiftLeft", "IntlBackslash", "KeyZ", "KeyX", "KeyC", "KeyV", "KeyB", "KeyN", "KeyM", "Comma",
    "Period", "Slash", "ShiftRight",
];
const BOTTOM_ROW_ABNT: &[&str] = &[
    "ShiftLeft", "IntlBackslash", "KeyZ", "KeyX", "KeyC", "KeyV", "KeyB", "KeyN", "KeyM", "Comma",
    "Period", "Slash", "IntlRo", "ShiftRight",
];
const BOTTOM_ROW_JIS: &[&str] = &[
    "ShiftLeft", "KeyZ", "KeyX", "KeyC", "KeyV", "KeyB", "KeyN", "KeyM", "Comma", "Period",
    "Slash", "IntlRo", "ShiftRight",
];
const SPACE_ROW: &[&str] = &[
    "ControlLeft", "MetaLeft", "AltLeft", "Space", "AltRight", "MetaRight", "ContextMenu",
    "ControlRight",
];

const ANSI_ROWS: &[&[&str]] = &[NUMBER_ROW, TOP_ROW_ANSI, HOME_ROW_ANSI, BOTTOM_ROW_ANSI, SPACE_ROW];
const ISO_ROWS: &[&[&str]] = &[NUMBER_ROW, TOP_ROW_ISO, HOME_ROW_ISO, BOTTOM_ROW_ISO, SPACE_ROW];
const ABNT_ROWS: &[&[&str]] = &[NUMBER_ROW, TOP_ROW_ISO, HOME_ROW_ISO, BOTTOM_ROW_ABNT, SPACE_ROW];
const JIS_ROWS: &[&[&str]] = &[NUMBER_ROW_JIS, TOP_ROW_ISO, HOME_ROW_ISO, BOTTOM_ROW_JIS, SPACE_ROW];

/// Physical keyboard shape: which key positions exist and where.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Geometry {
    #[default]
    Ansi,
    Iso,
    Abnt,
    Jis,
}

impl Geometry {
    pub const ALL: [Geometry; 4] = [Geometry::Ansi, Geometry::Iso, Geometry::Abnt, Geometry::Jis];

    pub fn as_str(self) -> &'static str {
        match self {
            Geometry::Ansi => "ansi",
            Geometry::Iso => "iso",
            Geometry::Abnt => "abnt",
            Geometry::Jis => "jis",
        }
    }

    pub fn rows(self) -> &'static [&'static [&'static str]] {
        match self {
            Geometry::Ansi => ANSI_ROWS,
            Geometry::Iso => ISO_ROWS,
            Geometry::Abnt => ABNT_ROWS,
            Geometry::Jis => JIS_ROWS,
        }
    }

    /// All keys in row order, left to right.
    pub fn keys(self) -> impl Iterator<Item = PhysicalKeyId> {
        self.rows()
            .iter()
            .flat_map(|row| row.iter())
            .map(|&code| PhysicalKeyId(code))
    }

    pub fn contains(self, key: PhysicalKeyId) -> bool {
        self.position(key).is_some()
    }

    /// `(row, column)` of a key in this shape.
    pub fn position(self, key: PhysicalKeyId) -> Option<(usize, usize)> {
        self.rows().iter().enumerate().find_map(|(r, row)| {
            row.iter()
                .position(|&code| code == key.as_str())
                .map(|c| (r, c))
        })
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
