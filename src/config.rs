use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::annotate::Categories;
use crate::audio::AnalysisParams;
use crate::render::ColorPreset;
use crate::view::ViewSettings;

pub const CONFIG_FILE_NAME: &str = "sonolabel.toml";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisParams,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ViewConfig {
    #[serde(flatten)]
    pub settings: ViewSettings,
    #[serde(default)]
    pub colormap: ColorPreset,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_crf")]
    pub crf: u32,
    #[serde(default = "default_codec")]
    pub codec: String,
    /// TTF/OTF used for axis and label text.
    #[serde(default)]
    pub font: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryConfig {
    pub text: String,
    #[serde(default = "default_category_color")]
    pub color: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            crf: default_crf(),
            codec: default_codec(),
            font: None,
        }
    }
}

fn default_width() -> u32 { 1280 }
fn default_height() -> u32 { 480 }
fn default_fps() -> u32 { 30 }
fn default_crf() -> u32 { 18 }
fn default_codec() -> String { "libx264".into() }
fn default_category_color() -> String { "#ffcc00".into() }

impl Config {
    pub fn categories(&self) -> Categories {
        Categories::with_definitions(self.categories.iter().map(|c| (c.text.clone(), c.color.clone())))
    }
}

/// Explicit path first, then `./sonolabel.toml`, then the per-user config.
pub fn discover(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("sonolabel").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("sonolabel").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}
