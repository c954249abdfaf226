use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::keyboard::geometry::{Geometry, PhysicalKeyId};

/// Which held modifier selects among the characters of one physical key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModifierLevel {
    Base,
    Shift,
    AltGr,
}

impl ModifierLevel {
    pub const ALL: [ModifierLevel; 3] = [
        ModifierLevel::Base,
        ModifierLevel::Shift,
        ModifierLevel::AltGr,
    ];

    /// AltGr takes precedence: there is no AltGr+Shift level.
    pub fn from_modifiers(shift: bool, alt_gr: bool) -> Self {
        if alt_gr {
            ModifierLevel::AltGr
        } else if shift {
            ModifierLevel::Shift
        } else {
            ModifierLevel::Base
        }
    }
}

/// What one key produces at one level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Char(char),
    /// Dead-key trigger; the char is the glyph emitted when it is typed literally.
    Dead(char),
}

impl Symbol {
    /// Descriptor notation: `"a"`, `"*^"` for a dead key, `""` for nothing.
    fn parse(raw: &str) -> Option<Option<Symbol>> {
        let mut chars = raw.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (None, _, _) => Some(None),
            (Some(c), None, _) => Some(Some(Symbol::Char(c))),
            (Some('*'), Some(g), None) => Some(Some(Symbol::Dead(g))),
            _ => None,
        }
    }

    pub fn glyph(self) -> char {
        match self {
            Symbol::Char(c) | Symbol::Dead(c) => c,
        }
    }

    pub fn as_char(self) -> Option<char> {
        match self {
            Symbol::Char(c) => Some(c),
            Symbol::Dead(_) => None,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Char(c) => write!(f, "{c}"),
            Symbol::Dead(c) => write!(f, "*{c}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyMapping {
    pub key: PhysicalKeyId,
    pub base: Option<Symbol>,
    pub shift: Option<Symbol>,
    pub alt_gr: Option<Symbol>,
}

impl KeyMapping {
    pub fn symbol(&self, level: ModifierLevel) -> Option<Symbol> {
        match level {
            ModifierLevel::Base => self.base,
            ModifierLevel::Shift => self.shift,
            ModifierLevel::AltGr => self.alt_gr,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeadKeyRule {
    pub trigger: char,
    pub combining: BTreeMap<Symbol, char>,
}

impl DeadKeyRule {
    pub fn compose(&self, input: Symbol) -> Option<char> {
        self.combining.get(&input).copied()
    }
}

/// One press of a physical key at a modifier level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Keystroke {
    pub key: PhysicalKeyId,
    pub level: ModifierLevel,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid layout descriptor: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot read layout file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("layout {layout}: key {key} is not part of the {geometry} geometry")]
    UnknownKey {
        layout: String,
        key: String,
        geometry: Geometry,
    },
    #[error("layout {layout}: key {key} lists {count} levels, at most 3 are supported")]
    TooManyLevels {
        layout: String,
        key: String,
        count: usize,
    },
    #[error("layout {layout}: invalid symbol {symbol:?} on {key}")]
    InvalidSymbol {
        layout: String,
        key: String,
        symbol: String,
    },
    #[error("layout {layout}: invalid dead key name {name:?}")]
    InvalidDeadKeyName { layout: String, name: String },
    #[error("layout {layout}: dead key *{trigger} has invalid combination {input:?} -> {output:?}")]
    InvalidCombination {
        layout: String,
        trigger: char,
        input: String,
        output: String,
    },
    #[error("layout {layout}: dead key *{trigger} is typed by a key but has no combining table")]
    UndefinedDeadKey { layout: String, trigger: char },
    #[error("layout {layout}: dead key table *{trigger} is not produced by any key")]
    OrphanDeadKey { layout: String, trigger: char },
    #[error("layout {layout} has no key mappings")]
    Empty { layout: String },
    #[error("layout {layout} includes unknown layout {include}")]
    UnknownInclude { layout: String, include: String },
    #[error("layout include cycle: {chain}")]
    IncludeCycle { chain: String },
}

/// Layout data as shipped on disk: keys map a `KeyboardEvent.code` to up to three
/// level strings (base, shift, altgr), dead key tables are named `*<glyph>`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LayoutDescriptor {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub include: Option<String>,
    #[serde(default)]
    pub keys: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub dead_keys: BTreeMap<String, BTreeMap<String, String>>,
}

impl LayoutDescriptor {
    pub fn from_json(json: &str) -> Result<Self, ParseError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Lay this descriptor over the layout it includes. Keys and dead key tables
    /// defined here replace the base's; everything else is inherited.
    pub fn merged_onto(self, base: LayoutDescriptor) -> LayoutDescriptor {
        let mut keys = base.keys;
        keys.extend(self.keys);
        let mut dead_keys = base.dead_keys;
        dead_keys.extend(self.dead_keys);
        LayoutDescriptor {
            id: self.id,
            name: self.name.or(base.name),
            geometry: self.geometry.or(base.geometry),
            include: base.include,
            keys,
            dead_keys,
        }
    }
}

/// A validated layout with the lookup tables used while typing.
#[derive(Clone, Debug)]
pub struct Layout {
    id: String,
    name: String,
    geometry: Geometry,
    mappings: Vec<KeyMapping>,
    dead_keys: BTreeMap<char, DeadKeyRule>,
    by_key: HashMap<(PhysicalKeyId, ModifierLevel), Symbol>,
    by_char: HashMap<char, Vec<Keystroke>>,
    triggers: HashMap<char, Keystroke>,
}

impl Layout {
    pub fn from_json(json: &str) -> Result<Self, ParseError> {
        Self::load(&LayoutDescriptor::from_json(json)?)
    }

    /// Validate a descriptor and build the lookup tables. Includes must already be
    /// merged (see the layout registry).
    pub fn load(descriptor: &LayoutDescriptor) -> Result<Self, ParseError> {
        let id = descriptor.id.clone();
        if let Some(include) = &descriptor.include {
            return Err(ParseError::UnknownInclude {
                layout: id,
                include: include.clone(),
            });
        }
        let geometry = descriptor.geometry.unwrap_or_default();

        let mut mappings = Vec::with_capacity(descriptor.keys.len());
        for (code, levels) in &descriptor.keys {
            let key = PhysicalKeyId::parse(code)
                .filter(|&k| geometry.contains(k))
                .ok_or_else(|| ParseError::UnknownKey {
                    layout: id.clone(),
                    key: code.clone(),
                    geometry,
                })?;
            if levels.len() > 3 {
                return Err(ParseError::TooManyLevels {
                    layout: id.clone(),
                    key: code.clone(),
                    count: levels.len(),
                });
            }
            let mut symbols = [None; 3];
            for (slot, raw) in symbols.iter_mut().zip(levels) {
                *slot = Symbol::parse(raw).ok_or_else(|| ParseError::InvalidSymbol {
                    layout: id.clone(),
                    key: code.clone(),
                    symbol: raw.clone(),
                })?;
            }
            mappings.push(KeyMapping {
                key,
                base: symbols[0],
                shift: symbols[1],
                alt_gr: symbols[2],
            });
        }
        if mappings.iter().all(|m| ModifierLevel::ALL.iter().all(|&l| m.symbol(l).is_none())) {
            return Err(ParseError::Empty { layout: id });
        }
        mappings.sort_by_key(|m| geometry.position(m.key));

        let mut dead_keys = BTreeMap::new();
        for (name, table) in &descriptor.dead_keys {
            let trigger = match Symbol::parse(name) {
                Some(Some(Symbol::Dead(g))) => g,
                _ => {
                    return Err(ParseError::InvalidDeadKeyName {
                        layout: id,
                        name: name.clone(),
                    });
                }
            };
            let mut combining = BTreeMap::new();
            for (input, output) in table {
                let invalid = || ParseError::InvalidCombination {
                    layout: id.clone(),
                    trigger,
                    input: input.clone(),
                    output: output.clone(),
                };
                let input_symbol = Symbol::parse(input).flatten().ok_or_else(invalid)?;
                let output_char = match Symbol::parse(output) {
                    Some(Some(Symbol::Char(c))) => c,
                    _ => return Err(invalid()),
                };
                combining.insert(input_symbol, output_char);
            }
            dead_keys.insert(trigger, DeadKeyRule { trigger, combining });
        }

        let mut layout = Layout {
            name: descriptor.name.clone().unwrap_or_else(|| id.clone()),
            id,
            geometry,
            mappings,
            dead_keys,
            by_key: HashMap::new(),
            by_char: HashMap::new(),
            triggers: HashMap::new(),
        };
        layout.index()?;
        debug!(
            layout = %layout.id,
            keys = layout.mappings.len(),
            dead_keys = layout.dead_keys.len(),
            "loaded keyboard layout"
        );
        Ok(layout)
    }

    fn index(&mut self) -> Result<(), ParseError> {
        for mapping in &self.mappings {
            for level in ModifierLevel::ALL {
                let Some(symbol) = mapping.symbol(level) else {
                    continue;
                };
                let stroke = Keystroke {
                    key: mapping.key,
                    level,
                };
                self.by_key.insert((mapping.key, level), symbol);
                match symbol {
                    // Later keys overwrite earlier ones; a key keeps its own lowest level.
                    Symbol::Char(c) => {
                        if self.by_char.get(&c).is_none_or(|seq| seq[0].key != mapping.key) {
                            self.by_char.insert(c, vec![stroke]);
                        }
                    }
                    Symbol::Dead(t) => {
                        if !self.dead_keys.contains_key(&t) {
                            return Err(ParseError::UndefinedDeadKey {
                                layout: self.id.clone(),
                                trigger: t,
                            });
                        }
                        if self.triggers.get(&t).is_none_or(|s| s.key != mapping.key) {
                            self.triggers.insert(t, stroke);
                        }
                    }
                }
            }
        }

        let mut composed: HashMap<char, Vec<Keystroke>> = HashMap::new();
        for rule in self.dead_keys.values() {
            let Some(&first) = self.triggers.get(&rule.trigger) else {
                return Err(ParseError::OrphanDeadKey {
                    layout: self.id.clone(),
                    trigger: rule.trigger,
                });
            };
            for (&input, &output) in &rule.combining {
                if self.by_char.contains_key(&output) {
                    continue;
                }
                let second = match input {
                    Symbol::Char(c) => self.by_char.get(&c).map(|seq| seq[0]),
                    Symbol::Dead(u) => self.triggers.get(&u).copied(),
                };
                if let Some(second) = second {
                    composed.entry(output).or_insert_with(|| vec![first, second]);
                }
            }
            if !rule.combining.contains_key(&Symbol::Dead(rule.trigger))
                && !self.by_char.contains_key(&rule.trigger)
            {
                composed
                    .entry(rule.trigger)
                    .or_insert_with(|| vec![first, first]);
            }
        }
        for (c, seq) in composed {
            self.by_char.entry(c).or_insert(seq);
        }
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Key mappings in geometry order.
    pub fn mappings(&self) -> &[KeyMapping] {
        &self.mappings
    }

    pub fn symbol(&self, key: PhysicalKeyId, level: ModifierLevel) -> Option<Symbol> {
        self.by_key.get(&(key, level)).copied()
    }

    pub fn dead_key(&self, trigger: char) -> Option<&DeadKeyRule> {
        self.dead_keys.get(&trigger)
    }

    pub fn dead_keys(&self) -> impl Iterator<Item = &DeadKeyRule> {
        self.dead_keys.values()
    }

    /// Keystrokes that type `ch`: one for direct characters, two (trigger, then
    /// base) for characters only reachable through a dead key.
    pub fn sequence_for(&self, ch: char) -> Option<&[Keystroke]> {
        self.by_char.get(&ch).map(Vec::as_slice)
    }

    /// The key that directly types `ch`, if any.
    pub fn key_for_char(&self, ch: char) -> Option<PhysicalKeyId> {
        self.sequence_for(ch)
            .filter(|seq| seq.len() == 1)
            .map(|seq| seq[0].key)
    }

    /// Whether every character of `text` can be typed on this layout.
    pub fn can_type(&self, text: &str) -> bool {
        text.chars().all(|c| self.by_char.contains_key(&c))
    }
}
