mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::path::PathBuf;

use barscope::audio::analyser::TrackAnalyser;
use barscope::config::{self, Config, OutputFormat};
use barscope::encode::ffmpeg::EncoderSettings;
use barscope::encode::json::JsonLinesSink;
use barscope::encode::raw::InstanceSink;
use barscope::encode::video::VideoSink;
use barscope::encode::FrameSink;
use barscope::presets::{self, loader::resolve_settings};
use barscope::viz::{PlaybackState, Viewport, Visualizer};
use cli::Cli;

fn find_config() -> Option<PathBuf> {
    let local = PathBuf::from("barscope.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("barscope").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("barscope").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

fn load_config(cli: &Cli) -> Result<Config> {
    if let Some(ref path) = cli.config {
        let cfg = config::load_config(path)?;
        log::info!("Loaded config from {}", path.display());
        return Ok(cfg);
    }
    let Some(path) = find_config() else {
        return Ok(Config::default());
    };
    match config::load_config(&path) {
        Ok(cfg) => {
            log::info!("Loaded config from {}", path.display());
            Ok(cfg)
        }
        Err(err) => {
            log::warn!("Failed to load config from {}: {}", path.display(), err);
            Ok(Config::default())
        }
    }
}

fn default_output(format: OutputFormat) -> PathBuf {
    PathBuf::from(match format {
        OutputFormat::Json => "bars.jsonl",
        OutputFormat::Instances => "instances.bin",
        OutputFormat::Video => "output.mp4",
    })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    if cli.list_presets {
        println!("Available presets:");
        for name in presets::list_presets() {
            match presets::load_preset(&name) {
                Ok(preset) => println!("  {:<12} {}", preset.name, preset.description),
                Err(_) => println!("  {}", name),
            }
        }
        return Ok(());
    }

    let cfg = load_config(&cli)?;

    // Precedence: config file < preset < --set < dedicated flags
    let preset = match cli.preset.as_deref().or(cfg.preset.as_deref()) {
        Some(name) => {
            let preset = presets::load_preset(name)?;
            log::info!("Preset: {}", preset.name);
            Some(preset)
        }
        None => None,
    };
    let (mut visualizer_cfg, mut render_cfg) =
        resolve_settings(&cfg.visualizer, &cfg.render, preset.as_ref(), &cli.overrides)?;
    if let Some(bars) = cli.bars {
        visualizer_cfg.bar_count = bars;
    }
    if let Some(position) = cli.position {
        visualizer_cfg.position = position;
    }
    if let Some(fps_limit) = cli.fps_limit {
        visualizer_cfg.fps_limit = Some(fps_limit);
    }
    if let Some(style) = cli.style {
        render_cfg.style = style;
    }
    config::warn_if_clamped(&visualizer_cfg, "settings");
    let visualizer_cfg = visualizer_cfg.sanitized();

    let input = cli.input.as_ref().context("Input audio file is required")?;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    let format = cli.format.unwrap_or(cfg.output.format);
    let output = cli.output.clone().unwrap_or_else(|| default_output(format));
    let width = cli.width.unwrap_or(cfg.output.width);
    let height = cli.height.unwrap_or(cfg.output.height);
    let refresh_rate = cli.refresh_rate.unwrap_or(cfg.output.refresh_rate);
    if !(refresh_rate.is_finite() && refresh_rate > 0.0) {
        anyhow::bail!("Refresh rate must be positive, got {}", refresh_rate);
    }
    let tail = cli.tail.unwrap_or(cfg.output.tail).max(0.0);
    let volume = cli.volume.unwrap_or(cfg.playback.volume);

    log::info!("barscope - spectrum bar visualizer");
    log::info!("Input: {}", input.display());
    log::info!("Output: {} ({:?})", output.display(), format);
    log::info!("Viewport: {}x{} @ {}Hz, {} bars", width, height, refresh_rate, visualizer_cfg.bar_count);

    // 1. Decode audio
    log::info!("Decoding audio...");
    let audio_data = barscope::audio::decode::decode_audio(input)?;
    let mut analyser = TrackAnalyser::new(audio_data, cfg.analyser.fft_size)
        .with_smoothing(cfg.analyser.smoothing)
        .with_decibel_range(cfg.analyser.min_decibels, cfg.analyser.max_decibels);
    let duration = analyser.duration();

    // 2. Open the sink
    let mut sink: Box<dyn FrameSink> = match format {
        OutputFormat::Json => {
            let file = File::create(&output).with_context(|| format!("Failed to create {}", output.display()))?;
            Box::new(JsonLinesSink::new(file))
        }
        OutputFormat::Instances => {
            let file = File::create(&output).with_context(|| format!("Failed to create {}", output.display()))?;
            Box::new(InstanceSink::new(file))
        }
        OutputFormat::Video => {
            let settings = EncoderSettings {
                width,
                height,
                fps: refresh_rate,
                codec: cli.codec.clone().unwrap_or(cfg.output.codec.clone()),
                pix_fmt: cli.pix_fmt.clone().unwrap_or(cfg.output.pix_fmt.clone()),
                crf: cli.crf.unwrap_or(cfg.output.crf),
                bitrate: cli.bitrate.clone(),
                audio: (!cli.no_audio).then(|| input.clone()),
            };
            Box::new(VideoSink::new(&output, &settings, render_cfg.clone())?)
        }
    };

    // 3. Drive the refresh clock
    let period_ms = 1000.0 / refresh_rate as f64;
    let total_ticks = ((duration + tail as f64) * refresh_rate as f64).ceil() as u64;
    log::info!("Duration: {:.1}s + {:.1}s tail, {} ticks", duration, tail, total_ticks);

    let viewport = Viewport::new(width as f32, height as f32);
    let mut visualizer = Visualizer::new();
    let (mut throttled, mut idle) = (0u64, 0u64);

    let pb = ProgressBar::new(total_ticks);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ticks ({eta} remaining)")?
            .progress_chars("=>-"),
    );

    for tick in 0..total_ticks {
        let time = tick as f64 / refresh_rate as f64;
        let playback = if time < duration {
            analyser.seek(time);
            PlaybackState::playing(volume)
        } else {
            PlaybackState::stopped()
        };

        let frame = visualizer.tick(tick as f64 * period_ms, &visualizer_cfg, playback, viewport, Some(&mut analyser));
        match frame {
            None => throttled += 1,
            Some(ref f) if f.is_idle() => idle += 1,
            Some(_) => {}
        }
        sink.write_tick(time, frame.as_ref(), &visualizer_cfg)?;
        pb.set_position(tick + 1);
    }

    pb.finish_with_message("Rendering complete");
    log::info!("Ticks: {} processed, {} throttled, {} idle", total_ticks - throttled, throttled, idle);

    // 4. Flush output
    sink.finish()?;

    log::info!("Done! Output: {}", output.display());
    Ok(())
}
