use super::types::{FrequencyFrame, VisualizerConfig};

/// Upper edge of the bass band. Peak sampling only applies above it.
pub const BASS_CUTOFF_HZ: f32 = 250.0;
/// Upper edge of the mid band.
pub const MID_CUTOFF_HZ: f32 = 2000.0;

const FREQUENCY_WARP: f32 = 0.6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrequencyWindow {
    pub min_hz: f32,
    pub max_hz: f32,
}

impl FrequencyWindow {
    /// Map the two [0, 100] sliders to an absolute range. `max_hz > min_hz` always.
    pub fn from_params(min_param: f32, max_param: f32) -> Self {
        let min_hz = 20.0 + min_param * 40.0;
        let max_hz = min_hz + 500.0 + max_param * 180.0;
        Self { min_hz, max_hz }
    }

    /// Frequency at normalized position `t` in [0, 1], after the perceptual warp.
    pub fn frequency_at(&self, t: f32) -> f32 {
        let warped = t.clamp(0.0, 1.0).powf(FREQUENCY_WARP);
        let log_min = self.min_hz.log10();
        let log_max = self.max_hz.log10();
        10f32.powf(log_min + warped * (log_max - log_min))
    }
}

/// Maps bar positions to bin indices for one frame geometry.
#[derive(Clone, Copy, Debug)]
pub struct FrequencyIndexMapper {
    window: FrequencyWindow,
    bar_count: usize,
    frame_len: usize,
    bin_size: f32,
}

impl FrequencyIndexMapper {
    /// `None` when the frame has no bins, meaning the tick has nothing to draw.
    pub fn new(config: &VisualizerConfig, frame: &FrequencyFrame) -> Option<Self> {
        if frame.is_empty() {
            return None;
        }
        Some(Self {
            window: FrequencyWindow::from_params(config.min_frequency, config.max_frequency),
            bar_count: config.bar_count.max(1),
            frame_len: frame.len(),
            bin_size: frame.bin_size(),
        })
    }

    pub fn window(&self) -> FrequencyWindow {
        self.window
    }

    pub fn position(&self, bar: usize) -> f32 {
        if self.bar_count <= 1 {
            return 0.0;
        }
        bar as f32 / (self.bar_count - 1) as f32
    }

    pub fn frequency(&self, bar: usize) -> f32 {
        self.window.frequency_at(self.position(bar))
    }

    pub fn index(&self, bar: usize) -> usize {
        let raw = (self.frequency(bar) / self.bin_size).floor();
        // float-to-int casts saturate, NaN becomes 0
        (raw as usize).min(self.frame_len - 1)
    }

    /// Center frequency of a bin.
    pub fn bin_frequency(&self, index: usize) -> f32 {
        index as f32 * self.bin_size
    }
}

/// Raw magnitude chosen for one bar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BarSample {
    pub bin: usize,
    pub magnitude: u8,
}

/// Peak-sample one bar: above the bass region, take the maximum over the bins
/// between this bar's index and the next bar's index.
pub fn peak_sample(
    mapper: &FrequencyIndexMapper,
    magnitudes: &[u8],
    index: usize,
    next_index: Option<usize>,
) -> u8 {
    let single = magnitudes.get(index).copied().unwrap_or(0);
    let Some(next) = next_index else {
        return single;
    };
    if next <= index + 1 || mapper.bin_frequency(index) < BASS_CUTOFF_HZ {
        return single;
    }
    let end = next.min(magnitudes.len());
    magnitudes[index..end].iter().copied().max().unwrap_or(single)
}

/// Sample every bar of the frame into `out`, reusing its allocation.
pub fn sample_bars(mapper: &FrequencyIndexMapper, frame: &FrequencyFrame, out: &mut Vec<BarSample>) {
    out.clear();
    let count = mapper.bar_count;
    let mut index = mapper.index(0);
    for bar in 0..count {
        let next_index = (bar + 1 < count).then(|| mapper.index(bar + 1));
        out.push(BarSample {
            bin: index,
            magnitude: peak_sample(mapper, frame.magnitudes, index, next_index),
        });
        if let Some(next) = next_index {
            index = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper(bar_count: usize, frame: &FrequencyFrame) -> FrequencyIndexMapper {
        let config = VisualizerConfig {
            bar_count,
            min_frequency: 0.0,
            max_frequency: 100.0,
            ..VisualizerConfig::default()
        };
        FrequencyIndexMapper::new(&config, frame).unwrap()
    }

    #[test]
    fn window_is_strictly_increasing() {
        let low = FrequencyWindow::from_params(0.0, 0.0);
        assert_eq!(low.min_hz, 20.0);
        assert_eq!(low.max_hz, 520.0);

        let high = FrequencyWindow::from_params(100.0, 100.0);
        assert_eq!(high.min_hz, 4020.0);
        assert_eq!(high.max_hz, 22_520.0);
        assert!(high.max_hz > high.min_hz);
    }

    #[test]
    fn endpoints_hit_window_edges() {
        let window = FrequencyWindow::from_params(0.0, 100.0);
        assert!((window.frequency_at(0.0) - 20.0).abs() < 1e-3);
        assert!((window.frequency_at(1.0) - 18_520.0).abs() < 1.0);
    }

    #[test]
    fn warp_spreads_the_low_end() {
        let window = FrequencyWindow::from_params(0.0, 100.0);
        let linear_mid = 10f32.powf((20f32.log10() + 18_520f32.log10()) / 2.0);
        // t^0.6 > t for t in (0, 1), so the midpoint lands higher than plain log spacing.
        assert!(window.frequency_at(0.5) > linear_mid);
    }

    #[test]
    fn single_bar_does_not_divide_by_zero() {
        let data = [0u8; 1024];
        let frame = FrequencyFrame::new(&data, 44_100.0);
        let m = mapper(1, &frame);
        assert_eq!(m.position(0), 0.0);
        assert_eq!(m.index(0), 0);
    }

    #[test]
    fn indices_are_clamped_and_non_decreasing() {
        let data = [0u8; 64];
        let frame = FrequencyFrame::new(&data, 8_000.0);
        let m = mapper(32, &frame);
        let indices: Vec<usize> = (0..32).map(|bar| m.index(bar)).collect();
        assert!(indices.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*indices.last().unwrap(), 63);
    }

    #[test]
    fn empty_frame_has_no_mapper() {
        let frame = FrequencyFrame::new(&[], 44_100.0);
        assert!(FrequencyIndexMapper::new(&VisualizerConfig::default(), &frame).is_none());
    }

    #[test]
    fn peak_sampling_skips_bass_bins() {
        let mut data = [0u8; 1024];
        data[2] = 10;
        data[3] = 200;
        let frame = FrequencyFrame::new(&data, 44_100.0);
        let m = mapper(16, &frame);
        // bin 2 sits at ~43 Hz
        assert_eq!(peak_sample(&m, &data, 2, Some(5)), 10);
    }

    #[test]
    fn peak_sampling_takes_range_max_above_bass() {
        let mut data = [0u8; 1024];
        data[100] = 10;
        data[104] = 180;
        data[110] = 255;
        let frame = FrequencyFrame::new(&data, 44_100.0);
        let m = mapper(16, &frame);
        assert_eq!(peak_sample(&m, &data, 100, Some(110)), 180);
        assert_eq!(peak_sample(&m, &data, 100, Some(101)), 10);
        assert_eq!(peak_sample(&m, &data, 100, None), 10);
    }

    #[test]
    fn sample_bars_emits_one_sample_per_bar() {
        let data = [42u8; 1024];
        let frame = FrequencyFrame::new(&data, 44_100.0);
        let m = mapper(48, &frame);
        let mut out = Vec::new();
        sample_bars(&m, &frame, &mut out);
        assert_eq!(out.len(), 48);
        assert!(out.iter().all(|s| s.magnitude == 42));
    }
}
