use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::Config;
use crate::keyboard::composer::ComposerState;
use crate::keyboard::geometry::PhysicalKeyId;
use crate::keyboard::layout::{Layout, ModifierLevel};
use crate::keyboard::resolver::{Highlight, KeyEventResolver, KeyPress};
use crate::lesson::picker::PromptPicker;
use crate::session::matcher::{MatchResult, SessionState, match_input};
use crate::session::scheduler::Scheduler;
use crate::session::timer::{Metrics, TimerReport};

/// Everything the core tells the front end.
pub trait Signals {
    /// Key(s) to press next; `None` clears the hint.
    fn highlight_key(&mut self, highlight: Option<&Highlight>);
    fn set_error_flash(&mut self, on: bool);
    fn set_prompt_text(&mut self, prompt: &str);
    fn set_input_text(&mut self, input: &str);
    fn set_key_pressed(&mut self, key: PhysicalKeyId, pressed: bool);
    /// `None` blanks the display.
    fn set_metrics(&mut self, metrics: Option<&Metrics>);
    fn prompt_completed(&mut self);
}

/// Deferred visual resets and edits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Deferred {
    ErrorFlashOff,
    KeyRelease(PhysicalKeyId),
    Truncate { to: usize },
}

/// One practice session: the active layout, the current prompt, and what has been
/// typed against it.
pub struct App<S: Signals> {
    signals: S,
    resolver: KeyEventResolver,
    picker: PromptPicker,
    session: SessionState,
    input: String,
    pending_truncation: Option<usize>,
    scheduler: Scheduler<Deferred>,
    autocorrect_delay: Duration,
    keypress_flash: Duration,
    show_hints: bool,
    last_metrics: Option<Metrics>,
}

impl<S: Signals> App<S> {
    pub fn new(layout: Layout, lines: Vec<String>, config: &Config, signals: S) -> Self {
        Self::with_picker(layout, PromptPicker::new(lines), config, signals)
    }

    pub fn with_picker(layout: Layout, picker: PromptPicker, config: &Config, signals: S) -> Self {
        let mut app = Self {
            signals,
            resolver: KeyEventResolver::new(layout),
            picker,
            session: SessionState::idle(),
            input: String::new(),
            pending_truncation: None,
            scheduler: Scheduler::default(),
            autocorrect_delay: config.autocorrect_delay(),
            keypress_flash: config.keypress_flash(),
            show_hints: config.show_hints,
            last_metrics: None,
        };
        app.next_prompt();
        app
    }

    pub fn signals(&self) -> &S {
        &self.signals
    }

    pub fn signals_mut(&mut self) -> &mut S {
        &mut self.signals
    }

    pub fn layout(&self) -> &Layout {
        self.resolver.layout()
    }

    pub fn composer_state(&self) -> ComposerState {
        self.resolver.composer_state()
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn prompt(&self) -> String {
        self.session.prompt()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn typos(&self) -> u32 {
        self.session.typos()
    }

    pub fn last_metrics(&self) -> Option<&Metrics> {
        self.last_metrics.as_ref()
    }

    /// Earliest pending deferred action, for sizing the event loop's wait.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    pub fn key_event(&mut self, key: PhysicalKeyId, level: ModifierLevel, now: Instant) {
        // held together with the key that types; never an edit on their own
        if key.is_modifier() {
            return;
        }

        let truncated = match self.pending_truncation.take() {
            Some(to) => {
                self.truncate_input(to);
                true
            }
            None => false,
        };

        self.signals.set_key_pressed(key, true);
        self.scheduler
            .schedule(now + self.keypress_flash, Deferred::KeyRelease(key));

        if !self.session.has_prompt() || self.session.is_finished() {
            return;
        }

        if key == PhysicalKeyId::BACKSPACE {
            // the pending auto-correction already removed the wrong char
            if truncated {
                self.resolver.cancel_composition();
                self.refresh_highlight();
                return;
            }
            if self.resolver.cancel_composition() {
                debug!("backspace cancelled pending dead key");
                self.refresh_highlight();
                return;
            }
            if self.input.pop().is_some() {
                self.signals.set_input_text(&self.input);
                self.run_match(now);
            }
            return;
        }

        match self.resolver.press(key, level) {
            KeyPress::Unmapped => {}
            KeyPress::Composing(trigger) => {
                debug!(%trigger, "dead key pending");
                self.refresh_highlight();
            }
            KeyPress::Typed(ch) => {
                self.input.push(ch);
                self.signals.set_input_text(&self.input);
                self.run_match(now);
            }
        }
    }

    /// Install a new layout and start over on a fresh prompt.
    pub fn layout_changed(&mut self, layout: Layout) {
        info!(layout = %layout.id(), "layout changed");
        self.resolver.set_layout(layout);
        self.next_prompt();
    }

    pub fn level_changed(&mut self, lines: Vec<String>) {
        debug!(lines = lines.len(), "level changed");
        self.picker.set_lines(lines);
        self.next_prompt();
    }

    /// Throw away what was typed and restart the same prompt.
    pub fn cancel(&mut self) {
        self.resolver.cancel_composition();
        self.pending_truncation = None;
        self.session = if self.session.has_prompt() {
            SessionState::new(&self.session.prompt())
        } else {
            SessionState::idle()
        };
        self.input.clear();
        self.signals.set_input_text("");
        self.signals.set_error_flash(false);
        self.refresh_highlight();
    }

    /// Run deferred actions that are due.
    pub fn tick(&mut self, now: Instant) {
        for action in self.scheduler.due(now) {
            match action {
                Deferred::ErrorFlashOff => self.signals.set_error_flash(false),
                Deferred::KeyRelease(key) => self.signals.set_key_pressed(key, false),
                Deferred::Truncate { to } => {
                    // a flush or a newer mismatch may have superseded it
                    if self.pending_truncation == Some(to) {
                        self.pending_truncation = None;
                        self.truncate_input(to);
                    }
                }
            }
        }
    }

    fn next_prompt(&mut self) {
        self.resolver.cancel_composition();
        self.pending_truncation = None;
        self.input.clear();
        match self.picker.next_prompt() {
            Some(prompt) => {
                debug!(%prompt, "new prompt");
                self.session = SessionState::new(&prompt);
                self.signals.set_prompt_text(&prompt);
            }
            None => {
                info!("no exercise available for this level");
                self.session = SessionState::idle();
                self.signals.set_prompt_text("");
            }
        }
        self.signals.set_input_text("");
        self.refresh_highlight();
    }

    fn run_match(&mut self, now: Instant) {
        let step = match_input(&mut self.session, &self.input, now);
        match step.result {
            MatchResult::Idle | MatchResult::Correct => self.highlight(step.next),
            MatchResult::Mismatch => {
                self.signals.set_error_flash(true);
                self.scheduler
                    .schedule(now + self.autocorrect_delay, Deferred::ErrorFlashOff);
                if let Some(to) = step.truncate_to {
                    self.pending_truncation = Some(to);
                    self.scheduler
                        .schedule(now + self.autocorrect_delay, Deferred::Truncate { to });
                }
                self.highlight(step.next);
            }
            MatchResult::Complete => {
                match step.report {
                    Some(TimerReport::Sample(metrics)) => {
                        info!(
                            speed = metrics.speed,
                            typos = metrics.typos,
                            accuracy = metrics.accuracy,
                            "prompt completed"
                        );
                        self.signals.set_metrics(Some(&metrics));
                        self.last_metrics = Some(metrics);
                    }
                    Some(TimerReport::Blank) => self.signals.set_metrics(None),
                    Some(TimerReport::TooShort) | None => {}
                }
                self.signals.prompt_completed();
                self.next_prompt();
            }
        }
    }

    fn truncate_input(&mut self, to: usize) {
        self.input = self.input.chars().take(to).collect();
        self.signals.set_input_text(&self.input);
    }

    fn refresh_highlight(&mut self) {
        self.highlight(self.session.expected());
    }

    fn highlight(&mut self, next: Option<char>) {
        let highlight = next
            .filter(|_| self.show_hints)
            .and_then(|c| self.resolver.highlight(c));
        self.signals.highlight_key(highlight.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    enum Signal {
        Highlight(Option<Vec<&'static str>>),
        ErrorFlash(bool),
        Prompt(String),
        Input(String),
        KeyPressed(&'static str, bool),
        Metrics(Option<u32>),
        Completed,
    }

    #[derive(Default)]
    struct Recorder {
        log: Vec<Signal>,
    }

    impl Recorder {
        fn take(&mut self) -> Vec<Signal> {
            std::mem::take(&mut self.log)
                .into_iter()
                .filter(|s| !matches!(s, Signal::KeyPressed(..)))
                .collect()
        }
    }

    impl Signals for Recorder {
        fn highlight_key(&mut self, highlight: Option<&Highlight>) {
            self.log.push(Signal::Highlight(
                highlight.map(|h| h.keys.iter().map(|k| k.as_str()).collect()),
            ));
        }
        fn set_error_flash(&mut self, on: bool) {
            self.log.push(Signal::ErrorFlash(on));
        }
        fn set_prompt_text(&mut self, prompt: &str) {
            self.log.push(Signal::Prompt(prompt.to_string()));
        }
        fn set_input_text(&mut self, input: &str) {
            self.log.push(Signal::Input(input.to_string()));
        }
        fn set_key_pressed(&mut self, key: PhysicalKeyId, pressed: bool) {
            self.log.push(Signal::KeyPressed(key.as_str(), pressed));
        }
        fn set_metrics(&mut self, metrics: Option<&Metrics>) {
            self.log.push(Signal::Metrics(metrics.map(|m| m.speed)));
        }
        fn prompt_completed(&mut self) {
            self.log.push(Signal::Completed);
        }
    }

    fn layout() -> Layout {
        Layout::from_json(
            r#"{
                "id": "test",
                "keys": {
                    "KeyA": ["a", "A"],
                    "KeyC": ["c", "C"],
                    "KeyE": ["e", "E"],
                    "KeyT": ["t", "T"],
                    "KeyX": ["x", "X"],
                    "Quote": ["*'", "\""],
                    "Space": [" ", " "]
                },
                "dead_keys": {"*'": {"e": "é", " ": "'"}}
            }"#,
        )
        .unwrap()
    }

    fn key(code: &str) -> PhysicalKeyId {
        PhysicalKeyId::parse(code).unwrap()
    }

    fn app(lines: &[&str]) -> App<Recorder> {
        let lines = lines.iter().map(|s| s.to_string()).collect();
        App::with_picker(
            layout(),
            PromptPicker::with_seed(lines, 1),
            &Config::default(),
            Recorder::default(),
        )
    }

    fn type_keys(app: &mut App<Recorder>, codes: &[&str], now: Instant) {
        for code in codes {
            app.key_event(key(code), ModifierLevel::Base, now);
        }
    }

    #[test]
    fn test_new_app_shows_prompt_and_first_key() {
        let mut app = app(&["cat"]);
        assert_eq!(
            app.signals_mut().take(),
            vec![
                Signal::Prompt("cat".into()),
                Signal::Input(String::new()),
                Signal::Highlight(Some(vec!["KeyC"])),
            ]
        );
    }

    #[test]
    fn test_clean_prompt_completes_and_advances() {
        let t0 = Instant::now();
        let mut app = app(&["cat"]);
        app.signals_mut().take();
        type_keys(&mut app, &["KeyC", "KeyA"], t0);
        app.key_event(key("KeyT"), ModifierLevel::Base, t0 + Duration::from_secs(2));
        let log = app.signals_mut().take();
        assert!(log.contains(&Signal::Metrics(Some(90))));
        assert!(log.contains(&Signal::Completed));
        // the single-line level serves the same prompt again
        assert_eq!(log.last(), Some(&Signal::Highlight(Some(vec!["KeyC"]))));
        assert_eq!(app.input(), "");
        assert_eq!(app.typos(), 0);
        assert_eq!(app.last_metrics().map(|m| m.speed), Some(90));
    }

    #[test]
    fn test_mismatch_flashes_and_truncates_on_tick() {
        let t0 = Instant::now();
        let mut app = app(&["cat"]);
        type_keys(&mut app, &["KeyC", "KeyX"], t0);
        assert_eq!(app.input(), "cx");
        assert_eq!(app.typos(), 1);
        let log = app.signals_mut().take();
        assert!(log.contains(&Signal::ErrorFlash(true)));

        app.tick(t0 + Duration::from_millis(100));
        assert_eq!(app.input(), "cx");

        app.tick(t0 + Duration::from_millis(150));
        assert_eq!(app.input(), "c");
        let log = app.signals_mut().take();
        assert!(log.contains(&Signal::ErrorFlash(false)));
        assert!(log.contains(&Signal::Input("c".into())));
        assert!(app.next_deadline().is_none());
    }

    #[test]
    fn test_next_key_flushes_pending_truncation() {
        let t0 = Instant::now();
        let mut app = app(&["cat"]);
        type_keys(&mut app, &["KeyC", "KeyX", "KeyA"], t0);
        assert_eq!(app.input(), "ca");
        assert_eq!(app.typos(), 1);

        // the stale truncation must not cut the corrected input
        app.tick(t0 + Duration::from_secs(1));
        assert_eq!(app.input(), "ca");
    }

    #[test]
    fn test_key_flash_is_released() {
        let t0 = Instant::now();
        let mut app = app(&["cat"]);
        app.key_event(key("KeyC"), ModifierLevel::Base, t0);
        assert!(app.signals().log.contains(&Signal::KeyPressed("KeyC", true)));
        app.tick(t0 + Duration::from_millis(150));
        assert!(app.signals().log.contains(&Signal::KeyPressed("KeyC", false)));
    }

    #[test]
    fn test_dead_key_highlights_second_step() {
        let mut app = app(&["é"]);
        assert_eq!(
            app.signals_mut().take().last(),
            Some(&Signal::Highlight(Some(vec!["Quote"])))
        );
        app.key_event(key("Quote"), ModifierLevel::Base, Instant::now());
        assert_eq!(app.input(), "");
        assert_eq!(app.composer_state(), ComposerState::PendingDeadKey('\''));
        assert_eq!(
            app.signals_mut().take(),
            vec![Signal::Highlight(Some(vec!["KeyE"]))]
        );
        app.key_event(key("KeyE"), ModifierLevel::Base, Instant::now());
        assert!(app.signals_mut().take().contains(&Signal::Completed));
    }

    #[test]
    fn test_backspace_cancels_pending_dead_key_only() {
        let t0 = Instant::now();
        let mut app = app(&["cé"]);
        type_keys(&mut app, &["KeyC", "Quote", "Backspace"], t0);
        assert_eq!(app.composer_state(), ComposerState::Idle);
        assert_eq!(app.input(), "c");

        type_keys(&mut app, &["Backspace"], t0);
        assert_eq!(app.input(), "");
        assert!(!app.session().is_timing());
    }

    #[test]
    fn test_backspace_during_autocorrect_removes_only_the_typo() {
        let t0 = Instant::now();
        let mut app = app(&["cat"]);
        type_keys(&mut app, &["KeyC", "KeyX"], t0);
        app.signals_mut().take();
        app.key_event(PhysicalKeyId::BACKSPACE, ModifierLevel::Base, t0 + Duration::from_millis(50));
        assert_eq!(app.input(), "c");
        assert_eq!(app.typos(), 1);
        assert_eq!(
            app.signals_mut().take(),
            vec![Signal::Input("c".into()), Signal::Highlight(Some(vec!["KeyA"]))]
        );

        type_keys(&mut app, &["KeyA", "KeyT"], t0 + Duration::from_secs(2));
        assert!(app.signals_mut().take().contains(&Signal::Completed));
    }

    #[test]
    fn test_pending_dead_key_that_spoils_next_char_hints_backspace() {
        let t0 = Instant::now();
        let mut app = app(&["e"]);
        app.signals_mut().take();
        app.key_event(key("Quote"), ModifierLevel::Base, t0);
        assert_eq!(
            app.signals_mut().take(),
            vec![Signal::Highlight(Some(vec!["Backspace"]))]
        );
        app.key_event(PhysicalKeyId::BACKSPACE, ModifierLevel::Base, t0);
        assert_eq!(
            app.signals_mut().take(),
            vec![Signal::Highlight(Some(vec!["KeyE"]))]
        );
        assert_eq!(app.typos(), 0);
    }

    #[test]
    fn test_bare_modifier_press_is_ignored() {
        let t0 = Instant::now();
        let mut app = app(&["cat"]);
        type_keys(&mut app, &["KeyC", "KeyX"], t0);
        app.signals_mut().take();
        app.key_event(PhysicalKeyId::SHIFT_LEFT, ModifierLevel::Shift, t0);
        assert!(app.signals().log.is_empty());
        assert_eq!(app.input(), "cx");
    }

    #[test]
    fn test_backspace_keeps_typos() {
        let t0 = Instant::now();
        let mut app = app(&["cat"]);
        type_keys(&mut app, &["KeyX", "Backspace"], t0);
        assert_eq!(app.input(), "");
        assert_eq!(app.typos(), 1);
    }

    #[test]
    fn test_layout_change_resets_composer() {
        let mut app = app(&["é"]);
        app.key_event(key("Quote"), ModifierLevel::Base, Instant::now());
        assert!(app.composer_state().is_pending());
        app.layout_changed(layout());
        assert_eq!(app.composer_state(), ComposerState::Idle);
        assert_eq!(app.input(), "");
    }

    #[test]
    fn test_empty_level_is_idle() {
        let t0 = Instant::now();
        let mut app = app(&["cat"]);
        app.level_changed(Vec::new());
        let log = app.signals_mut().take();
        assert!(log.contains(&Signal::Prompt(String::new())));
        assert_eq!(log.last(), Some(&Signal::Highlight(None)));

        type_keys(&mut app, &["KeyC", "KeyA"], t0);
        assert_eq!(app.input(), "");
        assert!(!app.session().is_timing());
    }

    #[test]
    fn test_cancel_restarts_same_prompt() {
        let t0 = Instant::now();
        let mut app = app(&["cat", "tea"]);
        let prompt = app.prompt();
        let first = key(if prompt == "cat" { "KeyC" } else { "KeyT" });
        app.key_event(first, ModifierLevel::Base, t0);
        app.key_event(key("KeyX"), ModifierLevel::Base, t0);
        app.cancel();
        assert_eq!(app.prompt(), prompt);
        assert_eq!(app.input(), "");
        assert_eq!(app.typos(), 0);
        assert!(!app.session().is_timing());
    }

    #[test]
    fn test_unmapped_key_does_nothing() {
        let mut app = app(&["cat"]);
        app.signals_mut().take();
        app.key_event(key("KeyQ"), ModifierLevel::Base, Instant::now());
        assert!(app.signals_mut().take().is_empty());
        assert!(!app.session().is_timing());
    }

    #[test]
    fn test_hints_can_be_disabled() {
        let config = Config {
            show_hints: false,
            ..Config::default()
        };
        let mut app = App::with_picker(
            layout(),
            PromptPicker::with_seed(vec!["cat".into()], 1),
            &config,
            Recorder::default(),
        );
        assert_eq!(app.signals_mut().take().last(), Some(&Signal::Highlight(None)));
    }
}
