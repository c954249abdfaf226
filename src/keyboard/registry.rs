use std::fs;
use std::path::{Path, PathBuf};

use rust_embed::Embed;
use tracing::{debug, warn};

use crate::keyboard::layout::{Layout, LayoutDescriptor, ParseError};

#[derive(Embed)]
#[folder = "assets/layouts/"]
struct LayoutAssets;

/// Resolves layout ids to descriptors: the user's layouts directory first, then
/// the bundled set.
#[derive(Clone, Debug)]
pub struct LayoutRegistry {
    user_dir: Option<PathBuf>,
}

impl Default for LayoutRegistry {
    fn default() -> Self {
        Self {
            user_dir: dirs::config_dir().map(|d| d.join("typist").join("layouts")),
        }
    }
}

impl LayoutRegistry {
    pub fn bundled_only() -> Self {
        Self { user_dir: None }
    }

    pub fn with_user_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            user_dir: Some(dir.into()),
        }
    }

    pub fn available_layouts(&self) -> Vec<String> {
        let mut ids: Vec<String> = LayoutAssets::iter()
            .filter_map(|f| f.strip_suffix(".json").map(|n| n.to_string()))
            .collect();
        if let Some(entries) = self.user_dir.as_ref().and_then(|d| fs::read_dir(d).ok()) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "json") {
                    if let Some(stem) = path.file_stem() {
                        ids.push(stem.to_string_lossy().to_string());
                    }
                }
            }
        }
        ids.sort();
        ids.dedup();
        ids
    }

    fn descriptor(&self, id: &str) -> Result<Option<LayoutDescriptor>, ParseError> {
        let filename = format!("{id}.json");
        if let Some(dir) = &self.user_dir {
            let path = dir.join(&filename);
            if path.exists() {
                return read_descriptor(&path).map(Some);
            }
        }
        match LayoutAssets::get(&filename) {
            Some(file) => {
                let content = String::from_utf8_lossy(file.data.as_ref());
                LayoutDescriptor::from_json(&content).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Follow `include` links until a self-contained descriptor remains.
    fn resolve_includes(
        &self,
        mut descriptor: LayoutDescriptor,
    ) -> Result<LayoutDescriptor, ParseError> {
        let mut chain = vec![descriptor.id.clone()];
        while let Some(include) = descriptor.include.clone() {
            if chain.contains(&include) {
                chain.push(include);
                return Err(ParseError::IncludeCycle {
                    chain: chain.join(" -> "),
                });
            }
            let base = self
                .descriptor(&include)?
                .ok_or_else(|| ParseError::UnknownInclude {
                    layout: descriptor.id.clone(),
                    include: include.clone(),
                })?;
            debug!(layout = %descriptor.id, include = %include, "merging included layout");
            chain.push(include);
            descriptor = descriptor.merged_onto(base);
        }
        Ok(descriptor)
    }

    /// Load a layout by id. `Ok(None)` when no such layout exists.
    pub fn load_layout(&self, id: &str) -> Result<Option<Layout>, ParseError> {
        let Some(descriptor) = self.descriptor(id)? else {
            warn!(layout = id, "unknown keyboard layout");
            return Ok(None);
        };
        let descriptor = self.resolve_includes(descriptor)?;
        Layout::load(&descriptor).map(Some)
    }

    /// Load a descriptor file from anywhere; its includes resolve through this
    /// registry.
    pub fn load_layout_file(&self, path: &Path) -> Result<Layout, ParseError> {
        let descriptor = self.resolve_includes(read_descriptor(path)?)?;
        Layout::load(&descriptor)
    }
}

fn read_descriptor(path: &Path) -> Result<LayoutDescriptor, ParseError> {
    let content = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.display().to_string(),
        source,
    })?;
    LayoutDescriptor::from_json(&content)
}
