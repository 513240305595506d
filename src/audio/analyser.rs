use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::decode::AudioData;
use crate::viz::FrequencySource;

pub const DEFAULT_FFT_SIZE: usize = 2048;
pub const DEFAULT_SMOOTHING: f32 = 0.8;
pub const DEFAULT_MIN_DECIBELS: f32 = -100.0;
pub const DEFAULT_MAX_DECIBELS: f32 = -30.0;

/// Byte-spectrum analyser over decoded audio, positioned by an external playhead.
///
/// Follows the usual analyser-node conventions: Blackman window, magnitudes
/// scaled by 1/N, time smoothing between pulls, and a decibel window mapped
/// linearly onto 0-255.
pub struct TrackAnalyser {
    audio: AudioData,
    fft_size: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    playhead: usize,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
}

impl TrackAnalyser {
    pub fn new(audio: AudioData, fft_size: usize) -> Self {
        let fft_size = fft_size.max(32).next_power_of_two();
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);
        Self {
            audio,
            fft_size,
            fft,
            window: blackman_window(fft_size),
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
            smoothed: vec![0.0; fft_size / 2],
            playhead: 0,
            smoothing: DEFAULT_SMOOTHING,
            min_db: DEFAULT_MIN_DECIBELS,
            max_db: DEFAULT_MAX_DECIBELS,
        }
    }

    pub fn with_smoothing(mut self, smoothing: f32) -> Self {
        self.smoothing = smoothing.clamp(0.0, 0.99);
        self
    }

    pub fn with_decibel_range(mut self, min_db: f32, max_db: f32) -> Self {
        if max_db > min_db {
            self.min_db = min_db;
            self.max_db = max_db;
        } else {
            log::warn!("Ignoring empty decibel range {}..{}", min_db, max_db);
        }
        self
    }

    pub fn duration(&self) -> f64 {
        self.audio.duration()
    }

    /// Move the playhead; the next pull analyses the window ending here.
    pub fn seek(&mut self, seconds: f64) {
        let position = (seconds.max(0.0) * self.audio.sample_rate as f64) as usize;
        self.playhead = position.min(self.audio.samples.len());
    }

    fn load_window(&mut self) {
        let samples = &self.audio.samples;
        let end = self.playhead;
        let start = end.saturating_sub(self.fft_size);
        // zero-pad the front while the playhead is within the first window
        let pad = self.fft_size - (end - start);
        for (i, slot) in self.scratch.iter_mut().enumerate() {
            let sample = if i < pad { 0.0 } else { samples[start + i - pad] };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }
    }

    fn to_byte(&self, magnitude: f32) -> u8 {
        if magnitude <= 0.0 {
            return 0;
        }
        let db = 20.0 * magnitude.log10();
        let scaled = 255.0 / (self.max_db - self.min_db) * (db - self.min_db);
        scaled.clamp(0.0, 255.0) as u8
    }
}

impl FrequencySource for TrackAnalyser {
    fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    fn sample_rate(&self) -> f32 {
        self.audio.sample_rate as f32
    }

    fn fill_byte_frequency_data(&mut self, buffer: &mut [u8]) {
        self.load_window();
        self.fft.process(&mut self.scratch);

        let scale = 1.0 / self.fft_size as f32;
        let smoothing = self.smoothing;
        for (smoothed, bin) in self.smoothed.iter_mut().zip(&self.scratch) {
            let magnitude = bin.norm() * scale;
            *smoothed = smoothing * *smoothed + (1.0 - smoothing) * magnitude;
        }

        for (slot, &smoothed) in buffer.iter_mut().zip(&self.smoothed) {
            *slot = self.to_byte(smoothed);
        }
    }
}

fn blackman_window(size: usize) -> Vec<f32> {
    use std::f32::consts::TAU;
    const ALPHA: f32 = 0.16;
    let a0 = 0.5 * (1.0 - ALPHA);
    let a1 = 0.5;
    let a2 = 0.5 * ALPHA;
    (0..size)
        .map(|i| {
            let phase = TAU * i as f32 / size as f32;
            a0 - a1 * phase.cos() + a2 * (2.0 * phase).cos()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(frequency: f32, sample_rate: u32, seconds: f32, amplitude: f32) -> AudioData {
        let len = (sample_rate as f32 * seconds) as usize;
        let samples = (0..len)
            .map(|i| amplitude * (std::f32::consts::TAU * frequency * i as f32 / sample_rate as f32).sin())
            .collect();
        AudioData { samples, sample_rate }
    }

    fn pull(analyser: &mut TrackAnalyser) -> Vec<u8> {
        let mut buffer = vec![0u8; analyser.frequency_bin_count()];
        analyser.fill_byte_frequency_data(&mut buffer);
        buffer
    }

    #[test]
    fn bin_count_is_half_the_fft() {
        let analyser = TrackAnalyser::new(tone(440.0, 44_100, 0.1, 0.5), 2048);
        assert_eq!(analyser.frequency_bin_count(), 1024);
        assert_eq!(analyser.sample_rate(), 44_100.0);
    }

    #[test]
    fn silence_maps_to_zero() {
        let audio = AudioData { samples: vec![0.0; 44_100], sample_rate: 44_100 };
        let mut analyser = TrackAnalyser::new(audio, 2048);
        analyser.seek(0.5);
        assert!(pull(&mut analyser).iter().all(|&b| b == 0));
    }

    #[test]
    fn tone_peaks_at_its_bin() {
        let mut analyser = TrackAnalyser::new(tone(1000.0, 44_100, 1.0, 0.8), 2048)
            .with_smoothing(0.0)
            .with_decibel_range(-100.0, 0.0);
        analyser.seek(0.5);
        let data = pull(&mut analyser);
        let peak = data.iter().enumerate().max_by_key(|(_, &b)| b).map(|(i, _)| i).unwrap();
        let expected = (1000.0f32 / (44_100.0f32 / 2048.0)).round() as usize;
        assert!(peak.abs_diff(expected) <= 1, "peak at bin {peak}");
        assert!(data[peak] > 180);
    }

    #[test]
    fn smoothing_lags_behind_onset() {
        let mut audio = tone(1000.0, 44_100, 1.0, 0.8);
        audio.samples[..22_050].fill(0.0);
        let mut analyser = TrackAnalyser::new(audio, 2048).with_decibel_range(-100.0, 0.0);
        analyser.seek(0.4);
        pull(&mut analyser);
        analyser.seek(0.9);
        let first = pull(&mut analyser);
        let second = pull(&mut analyser);
        let bin = 46;
        assert!(second[bin] > first[bin]);
    }

    #[test]
    fn seek_is_clamped_to_track() {
        let mut analyser = TrackAnalyser::new(tone(440.0, 8_000, 0.5, 0.5), 256);
        analyser.seek(100.0);
        assert_eq!(analyser.playhead, 4_000);
        analyser.seek(-1.0);
        assert_eq!(analyser.playhead, 0);
    }
}
