pub mod picker;

use std::fs;
use std::path::{Path, PathBuf};

use icu_normalizer::ComposingNormalizerBorrowed;
use rust_embed::Embed;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Embed)]
#[folder = "assets/lessons/"]
struct LessonAssets;

/// Prompt lines grouped by difficulty level.
pub trait LessonSource {
    fn level_count(&self) -> usize;
    /// Lines of one level; empty for an unknown level.
    fn lines(&self, level: usize) -> &[String];
}

#[derive(Debug, Error)]
pub enum LessonError {
    #[error("invalid lesson {lesson}: {source}")]
    Json {
        lesson: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot read lesson file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LessonLevel {
    #[serde(default)]
    pub new_characters: String,
    #[serde(default)]
    pub lines: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Lesson {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub levels: Vec<LessonLevel>,
}

impl Lesson {
    /// Parse lesson JSON. Lines are NFC-normalised so composed characters compare
    /// equal to what dead keys produce; blank lines are dropped.
    pub fn from_json(id: &str, json: &str) -> Result<Self, LessonError> {
        let mut lesson: Lesson = serde_json::from_str(json).map_err(|source| LessonError::Json {
            lesson: id.to_string(),
            source,
        })?;
        let nfc = ComposingNormalizerBorrowed::new_nfc();
        for level in &mut lesson.levels {
            level.lines = level
                .lines
                .iter()
                .map(|line| nfc.normalize(line.trim_end()).into_owned())
                .filter(|line| !line.trim().is_empty())
                .collect();
        }
        Ok(lesson)
    }

    /// Selector labels, `"1: fj"` style.
    pub fn level_labels(&self) -> Vec<String> {
        self.levels
            .iter()
            .enumerate()
            .map(|(i, level)| format!("{}: {}", i + 1, level.new_characters))
            .collect()
    }
}

impl LessonSource for Lesson {
    fn level_count(&self) -> usize {
        self.levels.len()
    }

    fn lines(&self, level: usize) -> &[String] {
        self.levels
            .get(level)
            .map(|l| l.lines.as_slice())
            .unwrap_or(&[])
    }
}

/// Bundled lessons plus `<config_dir>/typist/lessons/*.json`.
#[derive(Clone, Debug)]
pub struct LessonRegistry {
    user_dir: Option<PathBuf>,
}

impl Default for LessonRegistry {
    fn default() -> Self {
        Self {
            user_dir: dirs::config_dir().map(|d| d.join("typist").join("lessons")),
        }
    }
}

impl LessonRegistry {
    pub fn bundled_only() -> Self {
        Self { user_dir: None }
    }

    pub fn with_user_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            user_dir: Some(dir.into()),
        }
    }

    pub fn available_lessons(&self) -> Vec<String> {
        let mut ids: Vec<String> = LessonAssets::iter()
            .filter_map(|f| f.strip_suffix(".json").map(|n| n.to_string()))
            .collect();
        if let Some(entries) = self.user_dir.as_ref().and_then(|d| fs::read_dir(d).ok()) {
            ids.extend(entries.flatten().filter_map(|entry| {
                let path = entry.path();
                path.extension()
                    .is_some_and(|ext| ext == "json")
                    .then(|| path.file_stem().map(|s| s.to_string_lossy().to_string()))
                    .flatten()
            }));
        }
        ids.sort();
        ids.dedup();
        ids
    }

    /// `Ok(None)` when no lesson has this id.
    pub fn load_lesson(&self, id: &str) -> Result<Option<Lesson>, LessonError> {
        let filename = format!("{id}.json");
        if let Some(dir) = &self.user_dir {
            let path = dir.join(&filename);
            if path.exists() {
                return load_lesson_file(&path).map(Some);
            }
        }
        match LessonAssets::get(&filename) {
            Some(file) => {
                let content = String::from_utf8_lossy(file.data.as_ref());
                let lesson = Lesson::from_json(id, &content)?;
                debug!(lesson = id, levels = lesson.levels.len(), "loaded bundled lesson");
                Ok(Some(lesson))
            }
            None => {
                warn!(lesson = id, "unknown lesson");
                Ok(None)
            }
        }
    }
}

pub fn load_lesson_file(path: &Path) -> Result<Lesson, LessonError> {
    let content = fs::read_to_string(path).map_err(|source| LessonError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    Lesson::from_json(&id, &content)
}
