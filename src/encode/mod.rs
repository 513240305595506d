pub mod ffmpeg;
pub mod json;
pub mod raw;
pub mod video;

use anyhow::Result;

use crate::viz::{Frame, VisualizerConfig};

/// Destination for the ticks of an offline run.
pub trait FrameSink {
    /// Consume one refresh tick. `frame` is `None` when the tick was throttled.
    fn write_tick(&mut self, time: f64, frame: Option<&Frame>, config: &VisualizerConfig) -> Result<()>;

    fn finish(self: Box<Self>) -> Result<()>;
}
