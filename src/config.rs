use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::audio::analyser::{DEFAULT_FFT_SIZE, DEFAULT_MAX_DECIBELS, DEFAULT_MIN_DECIBELS, DEFAULT_SMOOTHING};
use crate::render::RenderConfig;
use crate::viz::VisualizerConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize [{section}]: {source}")]
    Serialize {
        section: &'static str,
        #[source]
        source: toml::ser::Error,
    },
    #[error("invalid override '{0}', expected key=value")]
    Override(String),
    #[error("unknown section '{0}' in override, expected visualizer or render")]
    UnknownSection(String),
    #[error("preset '{name}' not found. Available presets: {available:?}")]
    UnknownPreset { name: String, available: Vec<String> },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON object per processed tick
    #[default]
    Json,
    /// Count-prefixed instance transform buffers
    Instances,
    /// Rendered frames encoded with ffmpeg
    Video,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub visualizer: VisualizerConfig,
    pub render: RenderConfig,
    pub playback: PlaybackConfig,
    pub analyser: AnalyserConfig,
    /// Preset applied on top of `[visualizer]` and `[render]`.
    pub preset: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Simulated display refresh rate in Hz.
    #[serde(default = "default_refresh_rate")]
    pub refresh_rate: f32,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default = "default_codec")]
    pub codec: String,
    #[serde(default = "default_pix_fmt")]
    pub pix_fmt: String,
    #[serde(default = "default_crf")]
    pub crf: u32,
    /// Seconds of stopped playback rendered after the track ends.
    #[serde(default = "default_tail")]
    pub tail: f32,
}

#[derive(Debug, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_volume")]
    pub volume: f32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            refresh_rate: default_refresh_rate(),
            format: OutputFormat::default(),
            codec: default_codec(),
            pix_fmt: default_pix_fmt(),
            crf: default_crf(),
            tail: default_tail(),
        }
    }
}

/// Spectrum analyser feeding the visualizer from the decoded track.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyserConfig {
    pub fft_size: usize,
    /// Time smoothing between pulls, 0 disables it.
    pub smoothing: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: DEFAULT_FFT_SIZE,
            smoothing: DEFAULT_SMOOTHING,
            min_decibels: DEFAULT_MIN_DECIBELS,
            max_decibels: DEFAULT_MAX_DECIBELS,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            volume: default_volume(),
        }
    }
}

pub fn default_width() -> u32 { 1920 }
pub fn default_height() -> u32 { 1080 }
pub fn default_refresh_rate() -> f32 { 60.0 }
pub fn default_codec() -> String { "libx264".into() }
pub fn default_pix_fmt() -> String { "yuv420p".into() }
pub fn default_crf() -> u32 { 18 }
pub fn default_tail() -> f32 { 2.0 }
pub fn default_volume() -> f32 { 1.0 }

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content, &path.display().to_string())
}

pub fn parse_config(content: &str, origin: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content).map_err(|source| ConfigError::Parse {
        origin: origin.to_string(),
        source,
    })?;
    warn_if_clamped(&config.visualizer, origin);
    Ok(config)
}

/// Log every field that `sanitized()` would change.
pub fn warn_if_clamped(config: &VisualizerConfig, origin: &str) {
    let clean = config.sanitized();
    if clean == *config {
        return;
    }
    let (Ok(before), Ok(after)) = (to_table(config, "visualizer"), to_table(&clean, "visualizer")) else {
        log::warn!("{}: visualizer settings out of range, clamping", origin);
        return;
    };
    for (key, value) in &after {
        match before.get(key) {
            Some(old) if old == value => {}
            Some(old) => log::warn!("{}: {} = {} is out of range, using {}", origin, key, old, value),
            None => {}
        }
    }
    for key in before.keys().filter(|k| !after.contains_key(*k)) {
        log::warn!("{}: {} = {} is invalid, ignoring", origin, key, before[key]);
    }
}

fn to_table<T: Serialize>(value: &T, section: &'static str) -> Result<toml::Table, ConfigError> {
    match toml::Value::try_from(value) {
        Ok(toml::Value::Table(table)) => Ok(table),
        Ok(_) => Ok(toml::Table::new()),
        Err(source) => Err(ConfigError::Serialize { section, source }),
    }
}

/// A single `section.key=value` override. Keys without a section address `[visualizer]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Override {
    pub section: String,
    pub path: Vec<String>,
    pub value: toml::Value,
}

impl std::str::FromStr for Override {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, raw) = s.split_once('=').ok_or_else(|| ConfigError::Override(s.to_string()))?;
        let mut parts: Vec<String> = key.trim().split('.').map(|p| p.trim().to_string()).collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(ConfigError::Override(s.to_string()));
        }
        let section = if parts.len() > 1 && matches!(parts[0].as_str(), "visualizer" | "render") {
            parts.remove(0)
        } else if parts.len() > 1 && !matches!(parts[0].as_str(), "color" | "wave") {
            return Err(ConfigError::UnknownSection(parts[0].clone()));
        } else if matches!(parts[0].as_str(), "style" | "color" | "background" | "wave") {
            "render".to_string()
        } else {
            "visualizer".to_string()
        };
        Ok(Self {
            section,
            path: parts,
            value: parse_literal(raw.trim()),
        })
    }
}

/// Parse a TOML literal (`32`, `true`, `[1, 2, 3]`, `"x"`), falling back to a bare string.
pub fn parse_literal(raw: &str) -> toml::Value {
    toml::from_str::<toml::Table>(&format!("v = {}", raw))
        .ok()
        .and_then(|mut table| table.remove("v"))
        .unwrap_or_else(|| toml::Value::String(raw.to_string()))
}

fn set_path(table: &mut toml::Table, path: &[String], value: toml::Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut cursor = table;
    for key in parents {
        let entry = cursor
            .entry(key.clone())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        if !entry.is_table() {
            *entry = toml::Value::Table(toml::Table::new());
        }
        let toml::Value::Table(next) = entry else {
            return;
        };
        cursor = next;
    }
    cursor.insert(last.clone(), value);
}

/// Apply `overlay` keys over `base`, replacing whole values, then any overrides
/// addressed to `section`, and deserialize the result.
pub fn layer<T>(
    base: &T,
    overlay: Option<&toml::Table>,
    overrides: &[Override],
    section: &'static str,
) -> Result<T, ConfigError>
where
    T: Serialize + serde::de::DeserializeOwned,
{
    let mut table = to_table(base, section)?;
    if let Some(overlay) = overlay {
        for (key, value) in overlay {
            table.insert(key.clone(), value.clone());
        }
    }
    for item in overrides.iter().filter(|o| o.section == section) {
        set_path(&mut table, &item.path, item.value.clone());
    }
    toml::Value::Table(table)
        .try_into()
        .map_err(|source| ConfigError::Parse {
            origin: format!("[{}]", section),
            source,
        })
}
