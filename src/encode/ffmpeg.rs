use anyhow::{Context, Result};
use std::ffi::OsString;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;

#[derive(Clone, Debug, PartialEq)]
pub struct EncoderSettings {
    pub width: u32,
    pub height: u32,
    pub fps: f32,
    pub codec: String,
    pub pix_fmt: String,
    pub crf: u32,
    /// When set, uses -b:v instead of -crf.
    pub bitrate: Option<String>,
    /// Audio track muxed alongside the video.
    pub audio: Option<PathBuf>,
}

impl EncoderSettings {
    fn args(&self, output_path: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-y".to_string(),
            "-hide_banner".into(), "-loglevel".into(), "error".into(), "-nostats".into(),
            "-f".into(), "rawvideo".into(),
            "-pixel_format".into(), "rgba".into(),
            "-video_size".into(), format!("{}x{}", self.width, self.height),
            "-framerate".into(), format!("{}", self.fps),
            "-i".into(), "pipe:0".into(),
        ]
        .into_iter()
        .map(OsString::from)
        .collect();

        if let Some(ref audio) = self.audio {
            args.push("-i".into());
            args.push(audio.as_os_str().to_owned());
        }

        args.extend(["-c:v", self.codec.as_str(), "-pix_fmt", self.pix_fmt.as_str()].map(OsString::from));

        if let Some(ref br) = self.bitrate {
            args.extend(["-b:v", br.as_str()].map(OsString::from));
        } else {
            let crf = self.crf.to_string();
            args.extend(["-crf", crf.as_str(), "-preset", "medium"].map(OsString::from));
        }

        if self.audio.is_some() {
            args.extend(["-c:a", "aac", "-b:a", "192k"].map(OsString::from));
        }

        args.push(output_path.as_os_str().to_owned());
        args
    }
}

pub struct FfmpegEncoder {
    child: Child,
    frame_bytes: usize,
    stderr: Option<JoinHandle<String>>,
}

impl FfmpegEncoder {
    pub fn new(output_path: &Path, settings: &EncoderSettings) -> Result<Self> {
        let mut child = Command::new("ffmpeg")
            .args(settings.args(output_path))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn ffmpeg. Is ffmpeg installed?")?;

        // drain stderr so a full pipe cannot block ffmpeg
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut text = String::new();
                let _ = pipe.read_to_string(&mut text);
                text
            })
        });

        log::info!(
            "FFmpeg encoder started: {}x{} @ {}fps, codec={}",
            settings.width, settings.height, settings.fps, settings.codec
        );

        Ok(Self {
            child,
            frame_bytes: settings.width as usize * settings.height as usize * 4,
            stderr,
        })
    }

    pub fn write_frame(&mut self, rgba_pixels: &[u8]) -> Result<()> {
        if rgba_pixels.len() != self.frame_bytes {
            anyhow::bail!(
                "Frame size mismatch: got {} bytes, expected {}",
                rgba_pixels.len(),
                self.frame_bytes
            );
        }
        let stdin = self.child.stdin.as_mut().context("FFmpeg stdin not available")?;
        stdin.write_all(rgba_pixels).context("Failed to write frame to ffmpeg")?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        // EOF on stdin ends the stream
        drop(self.child.stdin.take());

        let status = self.child.wait().context("Failed to wait for ffmpeg")?;
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            anyhow::bail!("FFmpeg exited with error:\n{}", stderr);
        }

        log::info!("FFmpeg encoding complete");
        Ok(())
    }
}
