use clap::Parser;
use std::path::PathBuf;

use barscope::config::{OutputFormat, Override};
use barscope::render::Style;
use barscope::viz::BarPosition;

#[derive(Parser, Debug)]
#[command(name = "barscope", about = "Spectrum bar visualizer: renders an audio file as bar frames, instance buffers or video")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG, AAC)
    pub input: Option<PathBuf>,

    /// Output file [default: bars.jsonl, instances.bin or output.mp4 by format]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Config file [default: barscope.toml, then the user config dir]
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Preset name or path to a preset .toml
    #[arg(short, long)]
    pub preset: Option<String>,

    /// Override a setting, e.g. --set bar_count=32 --set render.color.mode=rainbow
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub overrides: Vec<Override>,

    /// List available presets and exit
    #[arg(long)]
    pub list_presets: bool,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Viewport width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Viewport height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Simulated display refresh rate in Hz (also the video frame rate)
    #[arg(long)]
    pub refresh_rate: Option<f32>,

    /// Cap on processed frames per second; slower ticks are throttled
    #[arg(long)]
    pub fps_limit: Option<f32>,

    /// Number of bars
    #[arg(long)]
    pub bars: Option<usize>,

    /// Bar anchor
    #[arg(long, value_enum)]
    pub position: Option<BarPosition>,

    /// Render style for video output
    #[arg(long, value_enum)]
    pub style: Option<Style>,

    /// Playback volume reported to the visualizer (0.0-1.0)
    #[arg(long)]
    pub volume: Option<f32>,

    /// Seconds of stopped playback appended after the track
    #[arg(long)]
    pub tail: Option<f32>,

    /// FFmpeg video codec
    #[arg(long)]
    pub codec: Option<String>,

    /// FFmpeg pixel format
    #[arg(long)]
    pub pix_fmt: Option<String>,

    /// H.264 CRF quality (0-51, lower = better). Ignored when --bitrate is set.
    #[arg(long)]
    pub crf: Option<u32>,

    /// Video bitrate (e.g. 2400k, 5M). When set, uses -b:v instead of -crf.
    #[arg(short, long)]
    pub bitrate: Option<String>,

    /// Do not mux the input audio into the video
    #[arg(long)]
    pub no_audio: bool,
}
