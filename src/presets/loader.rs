use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::embedded::{embedded_presets, get_embedded};
use crate::config::{layer, ConfigError, Override};
use crate::render::RenderConfig;
use crate::viz::VisualizerConfig;

/// A named bundle of `[visualizer]` and `[render]` keys layered over the config file.
#[derive(Clone, Debug, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub visualizer: toml::Table,
    #[serde(default)]
    pub render: toml::Table,
}

impl Preset {
    pub fn parse(source: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })
    }

    /// Layer this preset and then `overrides` over the given settings.
    pub fn apply(
        &self,
        visualizer: &VisualizerConfig,
        render: &RenderConfig,
        overrides: &[Override],
    ) -> Result<(VisualizerConfig, RenderConfig), ConfigError> {
        Ok((
            layer(visualizer, Some(&self.visualizer), overrides, "visualizer")?,
            layer(render, Some(&self.render), overrides, "render")?,
        ))
    }
}

/// Resolve the final settings: config file values, then `preset`, then `overrides`.
pub fn resolve_settings(
    visualizer: &VisualizerConfig,
    render: &RenderConfig,
    preset: Option<&Preset>,
    overrides: &[Override],
) -> Result<(VisualizerConfig, RenderConfig), ConfigError> {
    match preset {
        Some(preset) => preset.apply(visualizer, render, overrides),
        None => Ok((
            layer(visualizer, None, overrides, "visualizer")?,
            layer(render, None, overrides, "render")?,
        )),
    }
}

/// User presets live in `<config dir>/barscope/presets/*.toml` and shadow
/// embedded ones of the same name.
pub fn user_presets_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("barscope").join("presets"))
}

fn user_preset_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
        .collect()
}

pub fn list_presets() -> Vec<String> {
    let mut names: Vec<String> = embedded_presets().iter().map(|(name, _)| name.to_string()).collect();
    if let Some(dir) = user_presets_dir() {
        names.extend(user_preset_names(&dir));
    }
    names.sort();
    names.dedup();
    names
}

fn read_preset_file(path: &Path) -> Result<Preset, ConfigError> {
    let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Preset::parse(&source, &path.display().to_string())
}

/// Load a preset by file path, user preset name, or embedded preset name.
pub fn load_preset(name: &str) -> Result<Preset, ConfigError> {
    let as_path = Path::new(name);
    if as_path.extension().is_some_and(|ext| ext == "toml") && as_path.exists() {
        return read_preset_file(as_path);
    }

    if let Some(dir) = user_presets_dir() {
        let path = dir.join(format!("{}.toml", name));
        if path.exists() {
            log::debug!("Using user preset {}", path.display());
            return read_preset_file(&path);
        }
    }

    match get_embedded(name) {
        Some(source) => Preset::parse(source, &format!("preset '{}'", name)),
        None => Err(ConfigError::UnknownPreset {
            name: name.to_string(),
            available: list_presets(),
        }),
    }
}
