use std::time::Instant;

use tracing::{debug, trace};

use crate::session::timer::{SessionTimer, TimerReport};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchResult {
    /// Nothing typed yet, or the session has no prompt or is already finished.
    Idle,
    Correct,
    Mismatch,
    Complete,
}

/// Outcome of matching the input buffer once.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchStep {
    pub result: MatchResult,
    /// Prompt character to type next, if any.
    pub next: Option<char>,
    /// Input length (in chars) to cut the buffer back to after a mismatch.
    pub truncate_to: Option<usize>,
    /// Set on `Complete`.
    pub report: Option<TimerReport>,
}

impl MatchStep {
    fn new(result: MatchResult, next: Option<char>) -> Self {
        Self {
            result,
            next,
            truncate_to: None,
            report: None,
        }
    }
}

/// One exercise: the prompt and the progress made on it.
#[derive(Clone, Debug, Default)]
pub struct SessionState {
    prompt: Vec<char>,
    cursor: usize,
    timer: SessionTimer,
    finished: bool,
}

impl SessionState {
    pub fn new(prompt: &str) -> Self {
        Self {
            prompt: prompt.chars().collect(),
            ..Self::default()
        }
    }

    /// A session with nothing to type.
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn prompt(&self) -> String {
        self.prompt.iter().collect()
    }

    pub fn has_prompt(&self) -> bool {
        !self.prompt.is_empty()
    }

    /// Chars of the prompt matched so far.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn typos(&self) -> u32 {
        self.timer.typos()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_timing(&self) -> bool {
        self.timer.is_running()
    }

    /// The character to type first.
    pub fn first(&self) -> Option<char> {
        self.prompt.first().copied()
    }

    /// The character expected at the cursor.
    pub fn expected(&self) -> Option<char> {
        if self.finished {
            return None;
        }
        self.prompt.get(self.cursor).copied()
    }
}

/// Match the whole input buffer against the prompt. Called once per change to
/// the buffer.
///
/// The last character decides whether a typo is counted; the whole prefix decides
/// progress. A broken prefix is always reported as `Mismatch` with a truncation
/// back to the longest correct prefix.
pub fn match_input(state: &mut SessionState, input: &str, now: Instant) -> MatchStep {
    if !state.has_prompt() || state.finished {
        return MatchStep::new(MatchResult::Idle, None);
    }

    let typed: Vec<char> = input.chars().collect();
    let Some(&last) = typed.last() else {
        state.timer.pause();
        state.cursor = 0;
        return MatchStep::new(MatchResult::Idle, state.first());
    };
    let pos = typed.len() - 1;

    if pos == 0 && !state.timer.is_running() {
        if state.timer.has_prompt() {
            state.timer.resume(now);
        } else {
            state.timer.start(&state.prompt(), now);
            debug!(len = state.prompt.len(), "prompt started");
        }
    }

    if state.prompt.get(pos) != Some(&last) {
        state.timer.typo();
        trace!(pos, typed = %last, "typo");
    }

    let correct = typed
        .iter()
        .zip(&state.prompt)
        .take_while(|(a, b)| a == b)
        .count();

    if correct == typed.len() {
        state.cursor = correct;
        if correct >= state.prompt.len() {
            state.finished = true;
            let report = state.timer.stop(now);
            debug!(typos = state.timer.typos(), "prompt complete");
            return MatchStep {
                report: Some(report),
                ..MatchStep::new(MatchResult::Complete, None)
            };
        }
        return MatchStep::new(MatchResult::Correct, state.prompt.get(correct).copied());
    }

    state.cursor = correct;
    MatchStep {
        truncate_to: Some(correct),
        ..MatchStep::new(MatchResult::Mismatch, state.prompt.get(correct).copied())
    }
}
