use tracing::trace;

use crate::keyboard::layout::{Layout, Symbol};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ComposerState {
    #[default]
    Idle,
    PendingDeadKey(char),
}

impl ComposerState {
    pub fn is_pending(self) -> bool {
        matches!(self, ComposerState::PendingDeadKey(_))
    }
}

/// One composition step.
///
/// A trigger arms the composer; the next symbol is looked up in that trigger's
/// own table only. On a miss, repeating the trigger types its glyph and anything
/// else is typed unchanged (the pending dead key is dropped).
pub fn resolve(
    layout: &Layout,
    state: ComposerState,
    input: Symbol,
) -> (Option<char>, ComposerState) {
    match state {
        ComposerState::Idle => match input {
            Symbol::Dead(t) => (None, ComposerState::PendingDeadKey(t)),
            Symbol::Char(c) => (Some(c), ComposerState::Idle),
        },
        ComposerState::PendingDeadKey(t) => {
            let composed = layout.dead_key(t).and_then(|rule| rule.compose(input));
            let output = match composed {
                Some(c) => c,
                None if input == Symbol::Dead(t) => t,
                None => {
                    trace!(trigger = %t, input = %input, "unmapped dead key combination");
                    input.glyph()
                }
            };
            (Some(output), ComposerState::Idle)
        }
    }
}

/// Composer state owned by one typing session.
#[derive(Clone, Debug, Default)]
pub struct DeadKeyComposer {
    state: ComposerState,
}

impl DeadKeyComposer {
    pub fn state(&self) -> ComposerState {
        self.state
    }

    pub fn feed(&mut self, layout: &Layout, input: Symbol) -> Option<char> {
        let (output, next) = resolve(layout, self.state, input);
        self.state = next;
        output
    }

    /// Drop any pending dead key. Returns whether one was pending.
    pub fn reset(&mut self) -> bool {
        let was_pending = self.state.is_pending();
        self.state = ComposerState::Idle;
        was_pending
    }
}
