use serde::{Deserialize, Serialize};

/// Frame duration the physics constants are tuned against (60 Hz).
pub const NOMINAL_FRAME_MS: f32 = 1000.0 / 60.0;

pub const MAX_BAR_COUNT: usize = 4096;
pub const MIN_SENSITIVITY: f32 = 0.01;
/// Floor for `tip_speed`; a frozen tip would keep the visualizer from going idle.
pub const MIN_TIP_SPEED: f32 = 0.1;
pub const MAX_GRAVITY: f32 = 10.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BarPosition {
    Top,
    #[default]
    Bottom,
    Center,
    Circle,
}

/// Per-tick visualizer settings. May change freely between ticks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VisualizerConfig {
    pub bar_count: usize,
    pub bar_gap: f32,
    pub sensitivity: f32,
    /// Slider value in [0, 100], see `FrequencyWindow::from_params`.
    pub min_frequency: f32,
    /// Slider value in [0, 100].
    pub max_frequency: f32,
    pub normalize: bool,
    /// Decay speed in [0, 10]; higher falls faster.
    pub bar_gravity: f32,
    /// Tip fall speed in thousandths of the reference dimension per nominal frame.
    /// Values below [`MIN_TIP_SPEED`], including 0, mean "slowest": tips always
    /// fall so stopped playback can settle.
    pub tip_speed: f32,
    pub show_tips: bool,
    pub mirror: bool,
    pub position: BarPosition,
    pub prevent_volume_scaling: bool,
    pub segmented: bool,
    pub segment_height: f32,
    pub segment_gap: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps_limit: Option<f32>,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            bar_count: 64,
            bar_gap: 2.0,
            sensitivity: 1.0,
            min_frequency: 0.0,
            max_frequency: 50.0,
            normalize: true,
            bar_gravity: 2.0,
            tip_speed: 2.0,
            show_tips: true,
            mirror: false,
            position: BarPosition::Bottom,
            prevent_volume_scaling: false,
            segmented: false,
            segment_height: 6.0,
            segment_gap: 2.0,
            fps_limit: None,
        }
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

impl VisualizerConfig {
    /// Clamp every field into its safe range. NaN and infinities fall back to defaults.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        Self {
            bar_count: self.bar_count.clamp(1, MAX_BAR_COUNT),
            bar_gap: finite_or(self.bar_gap, defaults.bar_gap).max(0.0),
            sensitivity: finite_or(self.sensitivity, defaults.sensitivity).max(MIN_SENSITIVITY),
            min_frequency: finite_or(self.min_frequency, defaults.min_frequency).clamp(0.0, 100.0),
            max_frequency: finite_or(self.max_frequency, defaults.max_frequency).clamp(0.0, 100.0),
            normalize: self.normalize,
            bar_gravity: finite_or(self.bar_gravity, defaults.bar_gravity).clamp(0.0, MAX_GRAVITY),
            tip_speed: finite_or(self.tip_speed, defaults.tip_speed).max(MIN_TIP_SPEED),
            show_tips: self.show_tips,
            mirror: self.mirror,
            position: self.position,
            prevent_volume_scaling: self.prevent_volume_scaling,
            segmented: self.segmented,
            segment_height: finite_or(self.segment_height, defaults.segment_height).max(1.0),
            segment_gap: finite_or(self.segment_gap, defaults.segment_gap).max(0.0),
            fps_limit: self.fps_limit.filter(|fps| fps.is_finite() && *fps > 0.0),
        }
    }
}

/// Playback state as reported by the host player.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackState {
    pub is_playing: bool,
    /// Output volume in [0, 1].
    pub volume: f32,
}

impl PlaybackState {
    pub fn playing(volume: f32) -> Self {
        Self { is_playing: true, volume }
    }

    pub fn stopped() -> Self {
        Self { is_playing: false, volume: 1.0 }
    }

    pub fn clamped_volume(&self) -> f32 {
        finite_or(self.volume, 1.0).clamp(0.0, 1.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: finite_or(width, 0.0).max(0.0),
            height: finite_or(height, 0.0).max(0.0),
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.width * 0.5, self.height * 0.5)
    }

    pub fn min_dimension(&self) -> f32 {
        self.width.min(self.height)
    }
}

/// One analyser snapshot: byte magnitudes plus the sample rate they came from.
#[derive(Clone, Copy, Debug)]
pub struct FrequencyFrame<'a> {
    pub magnitudes: &'a [u8],
    pub sample_rate: f32,
}

impl<'a> FrequencyFrame<'a> {
    pub fn new(magnitudes: &'a [u8], sample_rate: f32) -> Self {
        Self {
            magnitudes,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }

    /// Width of one bin in Hz. Zero for an empty frame.
    pub fn bin_size(&self) -> f32 {
        if self.magnitudes.is_empty() {
            return 0.0;
        }
        finite_or(self.sample_rate, 0.0).max(1.0) / 2.0 / self.magnitudes.len() as f32
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Growth {
    Up,
    Down,
    /// Symmetric about the anchor line; `height` is the total extent.
    Both,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Placement {
    /// `x` is the bar's horizontal center, `y` its anchor line.
    Linear { x: f32, y: f32, growth: Growth },
    /// Bar starts at `radius` from (`cx`, `cy`) and extends outward along `angle`.
    Radial {
        cx: f32,
        cy: f32,
        angle: f32,
        radius: f32,
    },
}

/// Backend-independent description of one bar for one tick.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BarDrawState {
    pub index: usize,
    pub height: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tip_height: Option<f32>,
    pub placement: Placement,
    pub width: f32,
    /// True for the reflected copy emitted in mirror mode.
    pub mirrored: bool,
    /// Whole LED blocks stacked outward from the anchor, counted per side
    /// for symmetric bars.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segments: Option<u32>,
}

impl BarDrawState {
    fn is_symmetric(&self) -> bool {
        matches!(self.placement, Placement::Linear { growth: Growth::Both, .. })
    }

    /// Distance the bar extends from its anchor on each side it grows toward.
    pub fn reach(&self) -> f32 {
        if self.is_symmetric() {
            self.height * 0.5
        } else {
            self.height
        }
    }

    /// Distance of the tip from the anchor, on the same scale as [`reach`](Self::reach).
    pub fn tip_reach(&self) -> Option<f32> {
        let tip = self.tip_height.filter(|t| *t > 0.0)?;
        Some(if self.is_symmetric() { tip * 0.5 } else { tip })
    }
}

/// Output of one processed tick.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", content = "bars", rename_all = "lowercase")]
pub enum Frame {
    Bars(Vec<BarDrawState>),
    /// Playback stopped and every bar has settled; draw a flat idle indicator.
    Idle,
}

impl Frame {
    pub fn bars(&self) -> &[BarDrawState] {
        match self {
            Frame::Bars(bars) => bars,
            Frame::Idle => &[],
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Frame::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitized_clamps_out_of_range_values() {
        let config = VisualizerConfig {
            bar_count: 0,
            bar_gap: -3.0,
            sensitivity: -1.0,
            min_frequency: 250.0,
            max_frequency: f32::NAN,
            bar_gravity: -4.0,
            tip_speed: 0.0,
            segment_height: 0.0,
            fps_limit: Some(0.0),
            ..VisualizerConfig::default()
        };
        let clean = config.sanitized();
        assert_eq!(clean.bar_count, 1);
        assert_eq!(clean.bar_gap, 0.0);
        assert_eq!(clean.sensitivity, MIN_SENSITIVITY);
        assert_eq!(clean.min_frequency, 100.0);
        assert_eq!(clean.max_frequency, VisualizerConfig::default().max_frequency);
        assert_eq!(clean.bar_gravity, 0.0);
        assert_eq!(clean.tip_speed, MIN_TIP_SPEED);
        assert_eq!(clean.segment_height, 1.0);
        assert_eq!(clean.fps_limit, None);
    }

    #[test]
    fn default_config_is_already_clean() {
        let config = VisualizerConfig::default();
        assert_eq!(config.sanitized(), config);
    }

    #[test]
    fn bin_size_guards_empty_frame() {
        let frame = FrequencyFrame::new(&[], 44_100.0);
        assert_eq!(frame.bin_size(), 0.0);

        let data = [0u8; 1024];
        let frame = FrequencyFrame::new(&data, 44_100.0);
        assert!((frame.bin_size() - 21.533203).abs() < 1e-4);
    }

    #[test]
    fn volume_is_clamped() {
        assert_eq!(PlaybackState::playing(3.0).clamped_volume(), 1.0);
        assert_eq!(PlaybackState::playing(f32::NAN).clamped_volume(), 1.0);
        assert_eq!(PlaybackState::playing(-1.0).clamped_volume(), 0.0);
    }
}
