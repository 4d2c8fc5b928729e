//! Configuration loading and resolution.
//!
//! `folio.toml` is looked up at an explicit path, then in the working
//! directory, then under the platform config dir. Every key is optional and
//! unknown keys are ignored. A missing or unparsable file yields defaults.
//!
//! Parsed values are kept raw in `ConfigFile`; `Config::settings` resolves
//! them into `EditorSettings`, clamping out-of-range values and logging each
//! clamp at INFO under the `config` target.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;
use std::{fs, io, path::PathBuf};
use tracing::{info, warn};

pub const FILE_NAME: &str = "folio.toml";
/// Smallest accepted `layout.page_height`, in pixels.
pub const MIN_PAGE_HEIGHT: f32 = 1.0;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    pub debounce_ms: u64,
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            capacity: 50,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LayoutConfig {
    pub page_height: f32,
    pub resize_debounce_ms: u64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_height: 1056.0,
            resize_debounce_ms: 150,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    pub jump_lock_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { jump_lock_ms: 200 }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct UpdateConfig {
    pub debounce_ms: u64,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PreviewConfig {
    pub max_words: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self { max_words: 35 }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct StatsConfig {
    pub words_per_minute: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            words_per_minute: 200,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct ConfigFile {
    pub history: HistoryConfig,
    pub layout: LayoutConfig,
    pub sync: SyncConfig,
    pub update: UpdateConfig,
    pub preview: PreviewConfig,
    pub stats: StatsConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>,     // original file contents, when read
    pub source: Option<PathBuf>, // file the values came from
    pub file: ConfigFile,
}

/// Resolved, clamped values the editor runs with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditorSettings {
    pub history_debounce: Duration,
    pub history_capacity: usize,
    pub page_height: f32,
    pub resize_debounce: Duration,
    pub jump_lock: Duration,
    pub update_debounce: Duration,
    pub preview_words: usize,
    pub words_per_minute: usize,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Config::default().settings()
    }
}

/// Local `folio.toml` first, then the platform config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from(FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("folio").join(FILE_NAME);
    }
    local
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(e) => {
            return Err(e).with_context(|| format!("reading config {}", path.display()));
        }
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            info!(target: "config", path = %path.display(), "config_loaded");
            Ok(Config {
                raw: Some(content),
                source: Some(path),
                file,
            })
        }
        Err(err) => {
            warn!(target: "config", path = %path.display(), %err, "config_parse_failed");
            Ok(Config::default())
        }
    }
}

impl Config {
    /// Resolve the parsed file into settings, clamping invalid values.
    pub fn settings(&self) -> EditorSettings {
        let f = &self.file;
        let defaults = ConfigFile::default();

        let history_capacity = f.history.capacity.max(1);
        if history_capacity != f.history.capacity {
            info!(target: "config", key = "history.capacity", raw = f.history.capacity, clamped = history_capacity, "setting_clamped");
        }

        let page_height = if f.layout.page_height.is_finite() && f.layout.page_height > 0.0 {
            let clamped = f.layout.page_height.max(MIN_PAGE_HEIGHT);
            if clamped != f.layout.page_height {
                info!(target: "config", key = "layout.page_height", raw = f.layout.page_height, clamped, "setting_clamped");
            }
            clamped
        } else {
            let clamped = defaults.layout.page_height;
            info!(target: "config", key = "layout.page_height", raw = f.layout.page_height, clamped, "setting_clamped");
            clamped
        };

        let preview_words = f.preview.max_words.max(1);
        if preview_words != f.preview.max_words {
            info!(target: "config", key = "preview.max_words", raw = f.preview.max_words, clamped = preview_words, "setting_clamped");
        }

        let words_per_minute = f.stats.words_per_minute.max(1);
        if words_per_minute != f.stats.words_per_minute {
            info!(target: "config", key = "stats.words_per_minute", raw = f.stats.words_per_minute, clamped = words_per_minute, "setting_clamped");
        }

        EditorSettings {
            history_debounce: Duration::from_millis(f.history.debounce_ms),
            history_capacity,
            page_height,
            resize_debounce: Duration::from_millis(f.layout.resize_debounce_ms),
            jump_lock: Duration::from_millis(f.sync.jump_lock_ms),
            update_debounce: Duration::from_millis(f.update.debounce_ms),
            preview_words,
            words_per_minute,
        }
    }
}
