use std::time::{Duration, Instant};

use typist::app::{App, Signals};
use typist::config::Config;
use typist::keyboard::composer::ComposerState;
use typist::keyboard::geometry::PhysicalKeyId;
use typist::keyboard::layout::{Layout, ModifierLevel};
use typist::keyboard::registry::LayoutRegistry;
use typist::keyboard::resolver::Highlight;
use typist::lesson::picker::PromptPicker;
use typist::lesson::{LessonRegistry, LessonSource};
use typist::session::timer::Metrics;

#[derive(Default)]
struct Recorder {
    highlight: Option<Highlight>,
    error: bool,
    prompt: String,
    input: String,
    metrics: Vec<Option<Metrics>>,
    completed: usize,
}

impl Signals for Recorder {
    fn highlight_key(&mut self, highlight: Option<&Highlight>) {
        self.highlight = highlight.cloned();
    }
    fn set_error_flash(&mut self, on: bool) {
        self.error = on;
    }
    fn set_prompt_text(&mut self, prompt: &str) {
        self.prompt = prompt.to_string();
    }
    fn set_input_text(&mut self, input: &str) {
        self.input = input.to_string();
    }
    fn set_key_pressed(&mut self, _key: PhysicalKeyId, _pressed: bool) {}
    fn set_metrics(&mut self, metrics: Option<&Metrics>) {
        self.metrics.push(metrics.cloned());
    }
    fn prompt_completed(&mut self) {
        self.completed += 1;
    }
}

fn bundled(id: &str) -> Layout {
    LayoutRegistry::bundled_only().load_layout(id).unwrap().unwrap()
}

fn key(code: &str) -> PhysicalKeyId {
    PhysicalKeyId::parse(code).unwrap()
}

fn session(layout: Layout, lines: &[&str]) -> App<Recorder> {
    let lines = lines.iter().map(|s| s.to_string()).collect();
    App::with_picker(
        layout,
        PromptPicker::with_seed(lines, 9),
        &Config::default(),
        Recorder::default(),
    )
}

/// Press whatever the hint shows until the current prompt is done.
fn follow_hints(app: &mut App<Recorder>, now: Instant) {
    let done = app.signals().completed;
    for _ in 0..500 {
        if app.signals().completed > done {
            return;
        }
        let highlight = app
            .signals()
            .highlight
            .clone()
            .unwrap_or_else(|| panic!("no hint while typing {:?}", app.signals().prompt));
        let level = match highlight.keys.get(1) {
            Some(&k) if k == PhysicalKeyId::ALT_RIGHT => ModifierLevel::AltGr,
            Some(_) => ModifierLevel::Shift,
            None => ModifierLevel::Base,
        };
        app.key_event(highlight.keys[0], level, now);
    }
    panic!("prompt {:?} never completed", app.signals().prompt);
}

#[test]
fn test_hints_type_every_french_line() {
    let lesson = LessonRegistry::bundled_only()
        .load_lesson("french")
        .unwrap()
        .unwrap();
    for layout_id in ["azerty", "intl"] {
        for level in 0..lesson.level_count() {
            for line in lesson.lines(level) {
                let mut app = session(bundled(layout_id), &[line.as_str()]);
                follow_hints(&mut app, Instant::now());
                assert_eq!(app.signals().completed, 1, "{layout_id}: {line}");
                assert_eq!(app.typos(), 0, "{layout_id}: {line}");
            }
        }
    }
}

#[test]
fn test_hints_type_every_english_line() {
    let lesson = LessonRegistry::bundled_only()
        .load_lesson("english")
        .unwrap()
        .unwrap();
    for layout_id in ["qwerty", "dvorak", "colemak"] {
        for level in 0..lesson.level_count() {
            for line in lesson.lines(level) {
                let mut app = session(bundled(layout_id), &[line.as_str()]);
                follow_hints(&mut app, Instant::now());
                assert_eq!(app.typos(), 0, "{layout_id}: {line}");
            }
        }
    }
}

#[test]
fn test_dead_keys_on_intl() {
    let t0 = Instant::now();
    let mut app = session(bundled("intl"), &["ëa"]);
    // Shift+Quote is the diaeresis dead key
    app.key_event(key("Quote"), ModifierLevel::Shift, t0);
    assert_eq!(app.composer_state(), ComposerState::PendingDeadKey('"'));
    assert_eq!(app.input(), "");
    app.key_event(key("KeyE"), ModifierLevel::Base, t0);
    assert_eq!(app.input(), "ë");
    assert_eq!(app.typos(), 0);
}

#[test]
fn test_unmapped_combination_types_next_char() {
    let t0 = Instant::now();
    let mut app = session(bundled("intl"), &["xy"]);
    // the acute table has no entry for x
    app.key_event(key("Quote"), ModifierLevel::Base, t0);
    app.key_event(key("KeyX"), ModifierLevel::Base, t0);
    assert_eq!(app.input(), "x");
    assert_eq!(app.composer_state(), ComposerState::Idle);
    assert_eq!(app.typos(), 0);
}

#[test]
fn test_typo_session_reports_metrics() {
    let t0 = Instant::now();
    let mut app = session(bundled("qwerty"), &["cat"]);
    app.key_event(key("KeyC"), ModifierLevel::Base, t0);
    app.key_event(key("KeyX"), ModifierLevel::Base, t0);
    assert!(app.signals().error);
    assert_eq!(app.signals().input, "cx");

    // corrected before the auto-truncation fires
    app.key_event(key("KeyA"), ModifierLevel::Base, t0 + Duration::from_millis(50));
    assert_eq!(app.signals().input, "ca");
    app.key_event(key("KeyT"), ModifierLevel::Base, t0 + Duration::from_secs(3));

    assert_eq!(app.signals().completed, 1);
    let metrics = app.signals().metrics.last().cloned().flatten().unwrap();
    assert_eq!(metrics.speed, 60);
    assert_eq!(metrics.typos, 1);
    assert!((metrics.accuracy - 200.0 / 3.0).abs() < 1e-9);

    app.tick(t0 + Duration::from_secs(4));
    assert!(!app.signals().error);
}

#[test]
fn test_fast_completion_keeps_previous_metrics() {
    let t0 = Instant::now();
    let mut app = session(bundled("qwerty"), &["ab"]);
    app.key_event(key("KeyA"), ModifierLevel::Base, t0);
    app.key_event(key("KeyB"), ModifierLevel::Base, t0 + Duration::from_millis(300));
    assert_eq!(app.signals().completed, 1);
    assert!(app.signals().metrics.is_empty());
    assert!(app.last_metrics().is_none());
}

#[test]
fn test_switching_layout_mid_composition() {
    let t0 = Instant::now();
    let mut app = session(bundled("intl"), &["é"]);
    app.key_event(key("Quote"), ModifierLevel::Base, t0);
    assert!(app.composer_state().is_pending());

    app.layout_changed(bundled("azerty"));
    assert_eq!(app.composer_state(), ComposerState::Idle);
    assert_eq!(app.layout().id(), "azerty");
    // azerty types é directly on Digit2
    let hint = app.signals().highlight.clone().unwrap();
    assert_eq!(hint.keys, vec![key("Digit2")]);
    app.key_event(key("Digit2"), ModifierLevel::Base, t0);
    assert_eq!(app.signals().completed, 1);
}

#[test]
fn test_level_change_picks_from_new_lines() {
    let mut app = session(bundled("qwerty"), &["aaa"]);
    assert_eq!(app.prompt(), "aaa");
    app.level_changed(vec!["bbb".to_string()]);
    assert_eq!(app.prompt(), "bbb");
    assert_eq!(app.signals().prompt, "bbb");
    app.level_changed(Vec::new());
    assert_eq!(app.signals().prompt, "");
    assert!(app.signals().highlight.is_none());
}
