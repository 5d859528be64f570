use std::path::{Path, PathBuf};

use drumfill_core::{Genre, Mode};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub genre: Genre,
    pub complexity: i64,
    pub intensity: i64,
    pub fill_amount: i64,
    pub mode: Mode,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            genre: Genre::Acoustic,
            complexity: 60,
            intensity: 70,
            fill_amount: 25,
            mode: Mode::Fill,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub bpm: f64,
    pub lookahead_ms: u64,
    pub tick_interval_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { bpm: 110.0, lookahead_ms: 100, tick_interval_ms: 25 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub sample_rate: u32,
    /// 32-bit float samples instead of 16-bit integers
    pub float: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { sample_rate: 44_100, float: false }
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("drumfill")
        .join("config.toml")
}

/// Read the config, falling back to defaults when the file is missing or invalid
pub fn load_config(path: Option<&Path>) -> AppConfig {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);
    let Ok(text) = std::fs::read_to_string(&path) else {
        return AppConfig::default();
    };
    match toml::from_str(&text) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), "Ignoring invalid config: {}", e);
            AppConfig::default()
        }
    }
}
