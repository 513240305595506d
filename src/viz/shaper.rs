use super::mapping::{BASS_CUTOFF_HZ, MID_CUTOFF_HZ};
use super::types::{FrequencyFrame, PlaybackState, VisualizerConfig};

/// Raw magnitudes below this are treated as analyser noise.
pub const NOISE_GATE: u8 = 5;
/// Largest value `shape` can return; `tanh` rounds to 1.0 in f32 for large inputs.
pub const MAX_RATIO: f32 = 1.0 - f32::EPSILON;

const VOLUME_RATE: f32 = 0.10;
const GAIN_RATE: f32 = 0.05;
const COMPRESSION_EXPONENT: f32 = 2.5;
const SENSITIVITY_SCALE: f32 = 1.2;
const TILT: f32 = 0.3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Band {
    Bass,
    Mid,
    Treble,
}

impl Band {
    pub fn classify(frequency_hz: f32) -> Self {
        if frequency_hz < BASS_CUTOFF_HZ {
            Band::Bass
        } else if frequency_hz < MID_CUTOFF_HZ {
            Band::Mid
        } else {
            Band::Treble
        }
    }

    /// Minimum observed peak used for the auto-gain target, and the idle default.
    pub fn gain_floor(self) -> f32 {
        match self {
            Band::Bass => 150.0,
            Band::Mid => 100.0,
            Band::Treble => 80.0,
        }
    }
}

/// Exponentially smoothed scalar. The rate is per nominal frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Smoothed {
    value: f32,
    rate: f32,
}

impl Smoothed {
    pub fn new(value: f32, rate: f32) -> Self {
        Self { value, rate }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Move toward `target`, compounding the rate over `frames` nominal frames.
    pub fn chase(&mut self, target: f32, frames: f32) -> f32 {
        let alpha = 1.0 - (1.0 - self.rate).powf(frames.max(0.0));
        self.value += (target - self.value) * alpha;
        self.value
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SmoothedScalars {
    pub volume_factor: Smoothed,
    pub bass_gain: Smoothed,
    pub mid_gain: Smoothed,
    pub treble_gain: Smoothed,
}

impl Default for SmoothedScalars {
    fn default() -> Self {
        Self {
            volume_factor: Smoothed::new(1.0, VOLUME_RATE),
            bass_gain: Smoothed::new(1.0, GAIN_RATE),
            mid_gain: Smoothed::new(1.0, GAIN_RATE),
            treble_gain: Smoothed::new(1.0, GAIN_RATE),
        }
    }
}

impl SmoothedScalars {
    pub fn gain(&self, band: Band) -> f32 {
        self.gain_slot(band).value()
    }

    fn gain_slot(&self, band: Band) -> &Smoothed {
        match band {
            Band::Bass => &self.bass_gain,
            Band::Mid => &self.mid_gain,
            Band::Treble => &self.treble_gain,
        }
    }

    fn gain_slot_mut(&mut self, band: Band) -> &mut Smoothed {
        match band {
            Band::Bass => &mut self.bass_gain,
            Band::Mid => &mut self.mid_gain,
            Band::Treble => &mut self.treble_gain,
        }
    }
}

/// Per-band maximum raw magnitude over a frame. `None` for bands with no bins.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BandPeaks {
    pub bass: Option<u8>,
    pub mid: Option<u8>,
    pub treble: Option<u8>,
}

impl BandPeaks {
    pub fn scan(frame: &FrequencyFrame) -> Self {
        let bin_size = frame.bin_size();
        let mut peaks = Self::default();
        for (index, &magnitude) in frame.magnitudes.iter().enumerate() {
            let slot = match Band::classify(index as f32 * bin_size) {
                Band::Bass => &mut peaks.bass,
                Band::Mid => &mut peaks.mid,
                Band::Treble => &mut peaks.treble,
            };
            *slot = Some(slot.map_or(magnitude, |peak| peak.max(magnitude)));
        }
        peaks
    }

    pub fn get(&self, band: Band) -> Option<u8> {
        match band {
            Band::Bass => self.bass,
            Band::Mid => self.mid,
            Band::Treble => self.treble,
        }
    }
}

/// Turns raw 0-255 magnitudes into drawable ratios in [0, 1).
#[derive(Clone, Debug, Default)]
pub struct DynamicRangeShaper {
    scalars: SmoothedScalars,
}

impl DynamicRangeShaper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scalars(&self) -> &SmoothedScalars {
        &self.scalars
    }

    /// Advance the smoothed volume factor and band gains for this tick.
    /// Config changes only move the targets, never the current values.
    pub fn begin_frame(
        &mut self,
        frame: Option<&FrequencyFrame>,
        config: &VisualizerConfig,
        playback: PlaybackState,
        frames: f32,
    ) {
        let volume_target = if config.prevent_volume_scaling {
            1.0
        } else {
            playback.clamped_volume()
        };
        self.scalars.volume_factor.chase(volume_target, frames);

        let peaks = match frame {
            Some(frame) if playback.is_playing => Some(BandPeaks::scan(frame)),
            _ => None,
        };

        for band in [Band::Bass, Band::Mid, Band::Treble] {
            let target = if !config.normalize {
                1.0
            } else if let Some(peaks) = peaks {
                match peaks.get(band) {
                    Some(peak) => 255.0 / band.gain_floor().max(peak as f32),
                    // band not covered by this frame's bins; hold the gain
                    None => continue,
                }
            } else {
                255.0 / band.gain_floor()
            };
            self.scalars.gain_slot_mut(band).chase(target, frames);
        }
    }

    /// Shape one bar's raw magnitude. `bar`/`bar_count` drive the treble tilt.
    pub fn shape(&self, raw: u8, band: Band, bar: usize, bar_count: usize, sensitivity: f32) -> f32 {
        if raw < NOISE_GATE {
            return 0.0;
        }
        let value = raw as f32 * self.scalars.volume_factor.value() * self.scalars.gain(band);
        let mut ratio = (value / 255.0).powf(COMPRESSION_EXPONENT);
        ratio *= sensitivity * SENSITIVITY_SCALE;
        ratio *= 1.0 + (bar as f32 / bar_count.max(1) as f32) * TILT;
        let ratio = ratio.tanh();
        if ratio.is_nan() {
            return 0.0;
        }
        ratio.clamp(0.0, MAX_RATIO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bass_frame(data: &mut [u8], magnitude: u8) {
        // 44.1 kHz over 1024 bins: bins 0..=11 sit below 250 Hz
        for slot in data.iter_mut().take(12) {
            *slot = magnitude;
        }
    }

    #[test]
    fn classifies_bands() {
        assert_eq!(Band::classify(40.0), Band::Bass);
        assert_eq!(Band::classify(249.9), Band::Bass);
        assert_eq!(Band::classify(250.0), Band::Mid);
        assert_eq!(Band::classify(1999.0), Band::Mid);
        assert_eq!(Band::classify(2000.0), Band::Treble);
    }

    #[test]
    fn smoothing_never_jumps() {
        let mut s = Smoothed::new(1.0, 0.1);
        let after = s.chase(0.0, 1.0);
        assert!((after - 0.9).abs() < 1e-6);
        let mut s = Smoothed::new(1.0, 0.1);
        s.chase(0.0, 2.0);
        assert!((s.value() - 0.81).abs() < 1e-6);
    }

    #[test]
    fn noise_gate_zeroes_quiet_input() {
        let shaper = DynamicRangeShaper::new();
        for raw in 0..NOISE_GATE {
            assert_eq!(shaper.shape(raw, Band::Mid, 10, 64, 5.0), 0.0);
        }
        assert!(shaper.shape(NOISE_GATE, Band::Mid, 10, 64, 50.0) > 0.0);
    }

    #[test]
    fn ratio_stays_below_one() {
        let mut shaper = DynamicRangeShaper::new();
        let config = VisualizerConfig {
            prevent_volume_scaling: true,
            ..VisualizerConfig::default()
        };
        let data = [0u8; 1024];
        let frame = FrequencyFrame::new(&data, 44_100.0);
        for _ in 0..300 {
            shaper.begin_frame(Some(&frame), &config, PlaybackState::playing(1.0), 1.0);
        }
        for raw in 0..=255u8 {
            for band in [Band::Bass, Band::Mid, Band::Treble] {
                let ratio = shaper.shape(raw, band, 63, 64, 100.0);
                assert!((0.0..1.0).contains(&ratio), "raw {raw} gave {ratio}");
            }
        }
    }

    #[test]
    fn louder_input_gives_larger_ratio() {
        let shaper = DynamicRangeShaper::new();
        let quiet = shaper.shape(60, Band::Mid, 0, 64, 1.0);
        let loud = shaper.shape(200, Band::Mid, 0, 64, 1.0);
        assert!(loud > quiet);
    }

    #[test]
    fn treble_tilt_boosts_right_side() {
        let shaper = DynamicRangeShaper::new();
        let left = shaper.shape(150, Band::Mid, 0, 64, 1.0);
        let right = shaper.shape(150, Band::Mid, 63, 64, 1.0);
        assert!(right > left);
    }

    #[test]
    fn bass_gain_converges_to_observed_peak() {
        let mut shaper = DynamicRangeShaper::new();
        let config = VisualizerConfig::default();
        let mut data = [0u8; 1024];
        bass_frame(&mut data, 200);
        let frame = FrequencyFrame::new(&data, 44_100.0);
        let mut history = Vec::new();
        for _ in 0..200 {
            shaper.begin_frame(Some(&frame), &config, PlaybackState::playing(1.0), 1.0);
            history.push(shaper.scalars().gain(Band::Bass));
        }
        let expected = 255.0 / 200.0;
        let last = *history.last().unwrap();
        assert!((last - expected).abs() < 0.01, "gain {last}");
        for gain in &history[150..] {
            assert!((gain - expected).abs() / expected < 0.02);
        }
    }

    #[test]
    fn idle_uses_default_peaks() {
        let mut shaper = DynamicRangeShaper::new();
        let config = VisualizerConfig::default();
        let mut data = [0u8; 1024];
        bass_frame(&mut data, 255);
        let frame = FrequencyFrame::new(&data, 44_100.0);
        for _ in 0..400 {
            shaper.begin_frame(Some(&frame), &config, PlaybackState::stopped(), 1.0);
        }
        assert!((shaper.scalars().gain(Band::Bass) - 1.7).abs() < 1e-3);
        assert!((shaper.scalars().gain(Band::Mid) - 2.55).abs() < 1e-3);
        assert!((shaper.scalars().gain(Band::Treble) - 3.1875).abs() < 1e-3);
    }

    #[test]
    fn disabling_normalize_chases_unity_gradually() {
        let mut shaper = DynamicRangeShaper::new();
        let mut config = VisualizerConfig::default();
        let data = [0u8; 1024];
        let frame = FrequencyFrame::new(&data, 44_100.0);
        for _ in 0..400 {
            shaper.begin_frame(Some(&frame), &config, PlaybackState::playing(1.0), 1.0);
        }
        let before = shaper.scalars().gain(Band::Treble);
        config.normalize = false;
        shaper.begin_frame(Some(&frame), &config, PlaybackState::playing(1.0), 1.0);
        let after = shaper.scalars().gain(Band::Treble);
        assert!(after < before);
        assert!((after - (before + (1.0 - before) * GAIN_RATE)).abs() < 1e-5);
    }

    #[test]
    fn volume_factor_follows_playback_volume() {
        let mut shaper = DynamicRangeShaper::new();
        let config = VisualizerConfig::default();
        for _ in 0..200 {
            shaper.begin_frame(None, &config, PlaybackState::playing(0.25), 1.0);
        }
        assert!((shaper.scalars().volume_factor.value() - 0.25).abs() < 1e-4);

        let config = VisualizerConfig {
            prevent_volume_scaling: true,
            ..config
        };
        shaper.begin_frame(None, &config, PlaybackState::playing(0.25), 1.0);
        let value = shaper.scalars().volume_factor.value();
        assert!((value - 0.325).abs() < 1e-4);
    }
}
