use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Layout being learned.
    #[serde(default = "default_keyboard_layout")]
    pub keyboard_layout: String,
    /// Layout the terminal actually sends characters in.
    #[serde(default = "default_host_layout")]
    pub host_layout: String,
    #[serde(default = "default_lesson")]
    pub lesson: String,
    /// Zero-based level index.
    #[serde(default)]
    pub level: usize,
    #[serde(default = "default_autocorrect_delay_ms")]
    pub autocorrect_delay_ms: u64,
    #[serde(default = "default_keypress_flash_ms")]
    pub keypress_flash_ms: u64,
    #[serde(default = "default_show_hints")]
    pub show_hints: bool,
}

fn default_keyboard_layout() -> String {
    "qwerty".to_string()
}
fn default_host_layout() -> String {
    "qwerty".to_string()
}
fn default_lesson() -> String {
    "english".to_string()
}
fn default_autocorrect_delay_ms() -> u64 {
    150
}
fn default_keypress_flash_ms() -> u64 {
    150
}
fn default_show_hints() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keyboard_layout: default_keyboard_layout(),
            host_layout: default_host_layout(),
            lesson: default_lesson(),
            level: 0,
            autocorrect_delay_ms: default_autocorrect_delay_ms(),
            keypress_flash_ms: default_keypress_flash_ms(),
            show_hints: default_show_hints(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let config: Config =
                toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("typist")
            .join("config.toml")
    }

    pub fn autocorrect_delay(&self) -> Duration {
        Duration::from_millis(self.autocorrect_delay_ms)
    }

    pub fn keypress_flash(&self) -> Duration {
        Duration::from_millis(self.keypress_flash_ms)
    }

    /// Clamp `level` into the lesson's range, falling back to the first level.
    pub fn normalize_level(&mut self, level_count: usize) {
        if self.level >= level_count {
            self.level = 0;
        }
    }
}
