pub mod canvas;
pub mod instanced;
pub mod palette;
pub mod wave;

use serde::{Deserialize, Serialize};

use palette::{ColorMode, Rgb};
use wave::WaveShape;

/// Thickness of a peak tip, in pixels along the bar axis.
pub const TIP_THICKNESS: f32 = 3.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    #[default]
    Bars,
    Wave,
}

/// Presentation settings. Only renderers read these.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub style: Style,
    pub color: ColorMode,
    pub background: Rgb,
    pub wave: WaveShape,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            style: Style::default(),
            color: ColorMode::default(),
            background: [8, 8, 16],
            wave: WaveShape::default(),
        }
    }
}
