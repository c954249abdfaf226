use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::keyboard::geometry::PhysicalKeyId;
use crate::keyboard::layout::{Layout, ModifierLevel};

pub enum AppEvent {
    Key(KeyEvent),
    Tick,
    Resize(#[allow(dead_code)] u16, #[allow(dead_code)] u16),
}

pub struct EventHandler {
    rx: mpsc::Receiver<AppEvent>,
    _tx: mpsc::Sender<AppEvent>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        let _tx = tx.clone();

        thread::spawn(move || {
            loop {
                if event::poll(tick_rate).unwrap_or(false) {
                    match event::read() {
                        Ok(Event::Key(key)) => {
                            if tx.send(AppEvent::Key(key)).is_err() {
                                return;
                            }
                        }
                        Ok(Event::Resize(w, h)) => {
                            if tx.send(AppEvent::Resize(w, h)).is_err() {
                                return;
                            }
                        }
                        _ => {}
                    }
                } else if tx.send(AppEvent::Tick).is_err() {
                    return;
                }
            }
        });

        Self { rx, _tx }
    }

    pub fn next(&self) -> anyhow::Result<AppEvent> {
        Ok(self.rx.recv()?)
    }
}

/// A terminal key event as the practice session sees it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    Key(PhysicalKeyId, ModifierLevel),
    Cancel,
    Quit,
    Ignored,
}

/// Recover the physical key behind a terminal key event.
///
/// Terminals deliver characters, not key positions, so the character is looked
/// up in the layout the host OS is configured with. Characters the host can only
/// produce through a dead key sequence are ignored; the host already composed
/// them.
pub fn translate(host: &Layout, key: &KeyEvent) -> Input {
    if key.kind != KeyEventKind::Press {
        return Input::Ignored;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c' | 'q') if ctrl => Input::Quit,
        KeyCode::Esc | KeyCode::Enter => Input::Cancel,
        KeyCode::Backspace => Input::Key(PhysicalKeyId::BACKSPACE, ModifierLevel::Base),
        KeyCode::Char(_) if ctrl => Input::Ignored,
        KeyCode::Char(ch) => match host.sequence_for(ch) {
            Some([stroke]) => Input::Key(stroke.key, stroke.level),
            _ => Input::Ignored,
        },
        _ => Input::Ignored,
    }
}
