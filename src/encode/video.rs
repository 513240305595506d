use anyhow::Result;
use std::path::Path;

use super::ffmpeg::{EncoderSettings, FfmpegEncoder};
use super::FrameSink;
use crate::render::canvas::Canvas;
use crate::render::RenderConfig;
use crate::viz::{Frame, VisualizerConfig};

/// Rasterizes each tick on a `Canvas` and pipes it to ffmpeg. Throttled ticks
/// repeat the previous image, as a display would.
pub struct VideoSink {
    canvas: Canvas,
    render: RenderConfig,
    encoder: FfmpegEncoder,
    primed: bool,
}

impl VideoSink {
    pub fn new(output_path: &Path, settings: &EncoderSettings, render: RenderConfig) -> Result<Self> {
        anyhow::ensure!(
            settings.width > 0 && settings.height > 0,
            "Video size must be non-zero, got {}x{}",
            settings.width,
            settings.height
        );
        Ok(Self {
            canvas: Canvas::new(settings.width, settings.height),
            render,
            encoder: FfmpegEncoder::new(output_path, settings)?,
            primed: false,
        })
    }
}

impl FrameSink for VideoSink {
    fn write_tick(&mut self, time: f64, frame: Option<&Frame>, config: &VisualizerConfig) -> Result<()> {
        match frame {
            Some(frame) => {
                self.canvas.render_frame(frame, config, &self.render, time as f32);
                self.primed = true;
            }
            None if !self.primed => {
                self.canvas.clear(self.render.background);
                self.primed = true;
            }
            None => {}
        }
        self.encoder.write_frame(self.canvas.pixels())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        self.encoder.finish()
    }
}
