//! Spectral bar engine: frequency frames in, bar draw states out.

pub mod mapping;
pub mod physics;
pub mod pipeline;
pub mod scheduler;
pub mod shaper;
pub mod source;
pub mod topology;
pub mod types;

pub use pipeline::Visualizer;
pub use source::FrequencySource;
pub use types::{
    BarDrawState, BarPosition, Frame, FrequencyFrame, Growth, Placement, PlaybackState, VisualizerConfig,
    Viewport,
};
