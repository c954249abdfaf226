use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Samples shorter than this are not reported.
pub const MIN_SAMPLE_SECS: f64 = 1.0;

/// Scores for one completed prompt.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Metrics {
    /// Characters per minute, rounded.
    pub speed: u32,
    pub wpm: f64,
    pub typos: u32,
    pub accuracy: f64,
    pub elapsed_secs: f64,
    pub completed_at: DateTime<Utc>,
}

impl Metrics {
    pub fn compute(prompt_len: usize, elapsed_secs: f64, typos: u32) -> Self {
        let speed = (prompt_len as f64 * 60.0 / elapsed_secs).round() as u32;
        let accuracy = if prompt_len == 0 {
            100.0
        } else {
            ((prompt_len as f64 - typos as f64) / prompt_len as f64 * 100.0).clamp(0.0, 100.0)
        };
        Self {
            speed,
            wpm: speed as f64 / 5.0,
            typos,
            accuracy,
            elapsed_secs,
            completed_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TimerReport {
    /// No prompt was ever started: clear the display.
    Blank,
    /// Too short to be a meaningful sample: leave the display as it is.
    TooShort,
    Sample(Metrics),
}

/// Stopwatch and typo counter for the prompt being typed.
#[derive(Clone, Debug, Default)]
pub struct SessionTimer {
    started_at: Option<Instant>,
    prompt_len: Option<usize>,
    typos: u32,
}

impl SessionTimer {
    /// Begin timing `prompt` from scratch.
    pub fn start(&mut self, prompt: &str, now: Instant) {
        self.started_at = Some(now);
        self.prompt_len = Some(prompt.chars().count());
        self.typos = 0;
    }

    /// Restart the clock for the current prompt, keeping the typo count.
    pub fn resume(&mut self, now: Instant) {
        self.started_at = Some(now);
    }

    /// Stop the clock without reporting (the input went back to empty).
    pub fn pause(&mut self) {
        self.started_at = None;
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn has_prompt(&self) -> bool {
        self.prompt_len.is_some()
    }

    pub fn typo(&mut self) {
        self.typos += 1;
    }

    pub fn typos(&self) -> u32 {
        self.typos
    }

    pub fn elapsed_secs(&self, now: Instant) -> f64 {
        self.started_at
            .map(|start| now.saturating_duration_since(start).as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Stop timing and derive the metrics. The timer is idle afterwards.
    pub fn stop(&mut self, now: Instant) -> TimerReport {
        let Some(prompt_len) = self.prompt_len else {
            return TimerReport::Blank;
        };
        let elapsed = self.elapsed_secs(now);
        self.started_at = None;
        if elapsed < MIN_SAMPLE_SECS {
            return TimerReport::TooShort;
        }
        TimerReport::Sample(Metrics::compute(prompt_len, elapsed, self.typos))
    }
}
