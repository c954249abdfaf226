use tracing::debug;

use crate::keyboard::composer::{self, ComposerState, DeadKeyComposer};
use crate::keyboard::finger::{FingerAssignment, Hand, finger_for};
use crate::keyboard::geometry::PhysicalKeyId;
use crate::keyboard::layout::{Keystroke, Layout, ModifierLevel, Symbol};

/// What a physical key produces on `layout` at `level`. `None` for keys with no
/// printable output (modifiers, unmapped positions).
pub fn resolve(layout: &Layout, key: PhysicalKeyId, level: ModifierLevel) -> Option<Symbol> {
    layout.symbol(key, level)
}

/// Modifier to hold for a keystroke: Shift on the opposite hand, AltGr on the right.
pub fn modifier_key(layout: &Layout, stroke: Keystroke) -> Option<PhysicalKeyId> {
    match stroke.level {
        ModifierLevel::Base => None,
        ModifierLevel::AltGr => Some(PhysicalKeyId::ALT_RIGHT),
        ModifierLevel::Shift => match finger_for(layout.geometry(), stroke.key).hand {
            Hand::Left => Some(PhysicalKeyId::SHIFT_RIGHT),
            Hand::Right => Some(PhysicalKeyId::SHIFT_LEFT),
        },
    }
}

/// Keys to highlight for typing `ch` next: the key of the current step, then its
/// modifier if one is needed.
///
/// While a dead key is pending, a two-step composition continues with its second
/// step only if it starts with that same trigger, and a direct character is shown
/// only if the pending trigger lets it through unchanged. Otherwise the pending
/// dead key has to go first, so Backspace is shown.
pub fn keys_for_char(layout: &Layout, ch: char, state: ComposerState) -> Vec<PhysicalKeyId> {
    let Some(sequence) = layout.sequence_for(ch) else {
        return Vec::new();
    };
    let step = match (state, sequence) {
        (ComposerState::Idle, _) => sequence[0],
        (ComposerState::PendingDeadKey(t), [trigger, base])
            if layout.symbol(trigger.key, trigger.level) == Some(Symbol::Dead(t)) =>
        {
            *base
        }
        (ComposerState::PendingDeadKey(_), [direct])
            if layout
                .symbol(direct.key, direct.level)
                .and_then(|sym| composer::resolve(layout, state, sym).0)
                == Some(ch) =>
        {
            *direct
        }
        (ComposerState::PendingDeadKey(t), _) => {
            debug!(trigger = %t, target = %ch, "pending dead key blocks the next char");
            return vec![PhysicalKeyId::BACKSPACE];
        }
    };
    let mut keys = vec![step.key];
    keys.extend(modifier_key(layout, step));
    keys
}

/// Visual hint for the next character to type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Highlight {
    pub target: char,
    pub keys: Vec<PhysicalKeyId>,
    pub finger: FingerAssignment,
}

/// Outcome of one raw key press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyPress {
    /// No printable output for this key/level.
    Unmapped,
    /// A dead key was armed; nothing typed yet.
    Composing(char),
    Typed(char),
}

/// Live key resolution for one session: the active layout plus its composer.
#[derive(Clone, Debug)]
pub struct KeyEventResolver {
    layout: Layout,
    composer: DeadKeyComposer,
}

impl KeyEventResolver {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            composer: DeadKeyComposer::default(),
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn composer_state(&self) -> ComposerState {
        self.composer.state()
    }

    /// Install a new layout. A pending dead key never carries over.
    pub fn set_layout(&mut self, layout: Layout) {
        if self.composer.reset() {
            debug!(
                from = %self.layout.id(),
                to = %layout.id(),
                "dropped pending dead key on layout switch"
            );
        }
        self.layout = layout;
    }

    pub fn cancel_composition(&mut self) -> bool {
        self.composer.reset()
    }

    pub fn press(&mut self, key: PhysicalKeyId, level: ModifierLevel) -> KeyPress {
        let Some(symbol) = resolve(&self.layout, key, level) else {
            return KeyPress::Unmapped;
        };
        match self.composer.feed(&self.layout, symbol) {
            Some(c) => KeyPress::Typed(c),
            None => KeyPress::Composing(symbol.glyph()),
        }
    }

    pub fn highlight(&self, target: char) -> Option<Highlight> {
        let keys = keys_for_char(&self.layout, target, self.composer.state());
        let first = *keys.first()?;
        Some(Highlight {
            target,
            finger: finger_for(self.layout.geometry(), first),
            keys,
        })
    }
}
