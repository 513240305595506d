use super::mapping::{sample_bars, BarSample, FrequencyIndexMapper};
use super::physics::{BarPhysics, StepParams};
use super::scheduler::FrameScheduler;
use super::shaper::{Band, DynamicRangeShaper, SmoothedScalars};
use super::source::FrequencySource;
use super::topology::TopologyMapper;
use super::types::{Frame, FrequencyFrame, PlaybackState, VisualizerConfig, Viewport};

/// One visualizer instance: all cross-tick state for a single bar display.
///
/// Instances never share state, even when fed from the same source.
#[derive(Debug, Default)]
pub struct Visualizer {
    scheduler: FrameScheduler,
    buffer: Vec<u8>,
    pipeline: Pipeline,
}

impl Visualizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn physics(&self) -> &BarPhysics {
        &self.pipeline.physics
    }

    pub fn scalars(&self) -> &SmoothedScalars {
        self.pipeline.shaper.scalars()
    }

    /// Drive one display-refresh tick. Returns `None` when the tick is throttled.
    ///
    /// While playing, exactly one frame is pulled from `source`; while stopped
    /// the reused buffer is zeroed instead. Without a source nothing is pulled
    /// or allocated and the frame counts as silent.
    pub fn tick(
        &mut self,
        now_ms: f64,
        config: &VisualizerConfig,
        playback: PlaybackState,
        viewport: Viewport,
        source: Option<&mut dyn FrequencySource>,
    ) -> Option<Frame> {
        let config = config.sanitized();
        let frames = self.scheduler.admit(now_ms, config.fps_limit)?;

        let Some(source) = source else {
            return Some(self.pipeline.run(None, &config, playback, viewport, frames));
        };

        let len = source.frequency_bin_count();
        if self.buffer.len() != len {
            log::debug!("Frequency buffer resized: {} -> {} bins", self.buffer.len(), len);
            self.buffer = vec![0; len];
        }
        if playback.is_playing {
            source.fill_byte_frequency_data(&mut self.buffer);
        } else {
            self.buffer.fill(0);
        }
        let frame = FrequencyFrame::new(&self.buffer, source.sample_rate());
        Some(self.pipeline.run(Some(frame), &config, playback, viewport, frames))
    }

    /// Run the pipeline on an explicit frame, bypassing the scheduler.
    /// `frames` is the elapsed time in nominal (60 Hz) frames.
    pub fn advance(
        &mut self,
        frame: Option<FrequencyFrame<'_>>,
        config: &VisualizerConfig,
        playback: PlaybackState,
        viewport: Viewport,
        frames: f32,
    ) -> Frame {
        let config = config.sanitized();
        self.pipeline.run(frame, &config, playback, viewport, frames)
    }
}

#[derive(Debug, Default)]
struct Pipeline {
    shaper: DynamicRangeShaper,
    physics: BarPhysics,
    samples: Vec<BarSample>,
}

impl Pipeline {
    fn run(
        &mut self,
        frame: Option<FrequencyFrame<'_>>,
        config: &VisualizerConfig,
        playback: PlaybackState,
        viewport: Viewport,
        frames: f32,
    ) -> Frame {
        let bar_count = config.bar_count;
        if self.physics.resize(bar_count) {
            log::debug!("Bar state reallocated for {} bars", bar_count);
        }

        let mapped = match frame {
            Some(frame) => match FrequencyIndexMapper::new(config, &frame) {
                Some(mapper) => Some((frame, mapper)),
                // analyser not ready
                None => return Frame::Bars(Vec::new()),
            },
            None => None,
        };

        self.shaper
            .begin_frame(mapped.as_ref().map(|(frame, _)| frame), config, playback, frames);

        let topology = TopologyMapper::new(config, viewport);
        let params = StepParams::new(config, topology.reference_dimension(), frames);
        let max_height = topology.max_height();

        match &mapped {
            Some((frame, mapper)) => {
                sample_bars(mapper, frame, &mut self.samples);
                for (bar, sample) in self.samples.iter().enumerate() {
                    let band = Band::classify(mapper.bin_frequency(sample.bin));
                    let ratio = self
                        .shaper
                        .shape(sample.magnitude, band, bar, bar_count, config.sensitivity);
                    self.physics.step(bar, ratio * max_height, &params);
                }
            }
            None => {
                for bar in 0..bar_count {
                    self.physics.step(bar, 0.0, &params);
                }
            }
        }

        if self.physics.settle_idle(playback.is_playing) {
            return Frame::Idle;
        }

        let mut bars = Vec::new();
        topology.emit(self.physics.states(), &mut bars);
        Frame::Bars(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viz::types::{BarPosition, Placement};

    struct ConstantSource {
        bins: Vec<u8>,
        pulls: usize,
    }

    impl FrequencySource for ConstantSource {
        fn frequency_bin_count(&self) -> usize {
            self.bins.len()
        }

        fn sample_rate(&self) -> f32 {
            44_100.0
        }

        fn fill_byte_frequency_data(&mut self, buffer: &mut [u8]) {
            self.pulls += 1;
            buffer.copy_from_slice(&self.bins);
        }
    }

    fn viewport() -> Viewport {
        Viewport::new(640.0, 360.0)
    }

    #[test]
    fn pulls_once_per_admitted_tick_only_while_playing() {
        let mut source = ConstantSource { bins: vec![120; 1024], pulls: 0 };
        let mut viz = Visualizer::new();
        let config = VisualizerConfig::default();
        for tick in 0..10 {
            let now = tick as f64 * 16.0;
            viz.tick(now, &config, PlaybackState::playing(1.0), viewport(), Some(&mut source));
        }
        assert_eq!(source.pulls, 10);
        viz.tick(200.0, &config, PlaybackState::stopped(), viewport(), Some(&mut source));
        assert_eq!(source.pulls, 10);
    }

    #[test]
    fn throttled_ticks_do_not_pull() {
        let mut source = ConstantSource { bins: vec![120; 1024], pulls: 0 };
        let mut viz = Visualizer::new();
        let config = VisualizerConfig {
            fps_limit: Some(20.0),
            ..VisualizerConfig::default()
        };
        let mut frames = 0;
        for tick in 0..60 {
            let now = tick as f64 * 1000.0 / 60.0;
            if viz
                .tick(now, &config, PlaybackState::playing(1.0), viewport(), Some(&mut source))
                .is_some()
            {
                frames += 1;
            }
        }
        assert_eq!(frames, 20);
        assert_eq!(source.pulls, 20);
    }

    #[test]
    fn empty_source_yields_no_bars() {
        let mut source = ConstantSource { bins: Vec::new(), pulls: 0 };
        let mut viz = Visualizer::new();
        let frame = viz
            .tick(0.0, &VisualizerConfig::default(), PlaybackState::playing(1.0), viewport(), Some(&mut source))
            .unwrap();
        assert_eq!(frame, Frame::Bars(Vec::new()));
    }

    #[test]
    fn missing_source_is_silent() {
        let mut viz = Visualizer::new();
        let config = VisualizerConfig::default();
        let frame = viz
            .tick(0.0, &config, PlaybackState::playing(1.0), viewport(), None)
            .unwrap();
        assert_eq!(frame.bars().len(), config.bar_count);
        assert!(frame.bars().iter().all(|bar| bar.height == 0.0));
    }

    #[test]
    fn bar_count_change_resets_state() {
        let data = vec![200u8; 1024];
        let mut viz = Visualizer::new();
        let mut config = VisualizerConfig::default();
        let frame = FrequencyFrame::new(&data, 44_100.0);
        viz.advance(Some(frame), &config, PlaybackState::playing(1.0), viewport(), 1.0);
        assert!(viz.physics().peak() > 0.0);

        config.bar_count = 16;
        let silent = vec![0u8; 1024];
        let out = viz.advance(
            Some(FrequencyFrame::new(&silent, 44_100.0)),
            &config,
            PlaybackState::playing(1.0),
            viewport(),
            1.0,
        );
        assert_eq!(out.bars().len(), 16);
        assert_eq!(viz.physics().peak(), 0.0);
    }

    #[test]
    fn circle_mode_caps_heights_by_smaller_side() {
        let data = vec![255u8; 1024];
        let mut viz = Visualizer::new();
        let config = VisualizerConfig {
            position: BarPosition::Circle,
            sensitivity: 10.0,
            ..VisualizerConfig::default()
        };
        let out = viz.advance(
            Some(FrequencyFrame::new(&data, 44_100.0)),
            &config,
            PlaybackState::playing(1.0),
            viewport(),
            1.0,
        );
        for bar in out.bars() {
            assert!(bar.height <= 120.01);
            assert!(matches!(bar.placement, Placement::Radial { .. }));
        }
    }
}
