use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, TAU};

use crate::viz::{BarDrawState, Placement, Viewport};

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct WavePoint {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WavePath {
    pub points: Vec<WavePoint>,
    pub closed: bool,
}

/// Sine carrier whose amplitude envelope follows the bar heights.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveShape {
    /// Carrier periods across the width (or around the circle).
    pub cycles: f32,
    /// Number of segments in the traced path.
    pub resolution: usize,
    /// Phase advance in radians per second.
    pub speed: f32,
    pub thickness: f32,
}

impl Default for WaveShape {
    fn default() -> Self {
        Self {
            cycles: 6.0,
            resolution: 512,
            speed: 2.0,
            thickness: 2.0,
        }
    }
}

/// Piecewise-linear interpolation over (position, height) knots sorted by position.
fn envelope(knots: &[(f32, f32)], at: f32) -> f32 {
    let Some(&(first_pos, first_height)) = knots.first() else {
        return 0.0;
    };
    if at <= first_pos {
        return first_height;
    }
    let upper = knots.partition_point(|&(pos, _)| pos < at);
    if upper >= knots.len() {
        return knots[knots.len() - 1].1;
    }
    let (p0, h0) = knots[upper - 1];
    let (p1, h1) = knots[upper];
    if p1 <= p0 {
        return h1;
    }
    h0 + (h1 - h0) * (at - p0) / (p1 - p0)
}

impl WaveShape {
    /// Trace the wave for one tick. Radial placements produce a closed ring.
    pub fn trace(&self, bars: &[BarDrawState], viewport: Viewport, time: f32) -> WavePath {
        let resolution = self.resolution.max(2);
        let phase = time * self.speed;

        if let Some(BarDrawState { placement: Placement::Radial { cx, cy, radius, .. }, .. }) = bars.first() {
            let (cx, cy, radius) = (*cx, *cy, *radius);
            let mut knots: Vec<(f32, f32)> = bars
                .iter()
                .filter_map(|bar| match bar.placement {
                    Placement::Radial { angle, .. } => Some(((angle + FRAC_PI_2).rem_euclid(TAU), bar.height)),
                    Placement::Linear { .. } => None,
                })
                .collect();
            knots.sort_by(|a, b| a.0.total_cmp(&b.0));
            let points = (0..resolution)
                .map(|i| {
                    let turn = TAU * i as f32 / resolution as f32;
                    let angle = turn - FRAC_PI_2;
                    let amplitude = envelope(&knots, turn);
                    let r = radius + amplitude * (0.5 + 0.5 * (self.cycles * turn + phase).sin());
                    WavePoint {
                        x: cx + r * angle.cos(),
                        y: cy + r * angle.sin(),
                    }
                })
                .collect();
            return WavePath { points, closed: true };
        }

        let mut knots: Vec<(f32, f32)> = bars
            .iter()
            .filter_map(|bar| match bar.placement {
                Placement::Linear { x, .. } => Some((x, bar.height)),
                Placement::Radial { .. } => None,
            })
            .collect();
        knots.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mid = viewport.height * 0.5;
        let width = viewport.width.max(1.0);
        let points = (0..=resolution)
            .map(|i| {
                let x = width * i as f32 / resolution as f32;
                let amplitude = envelope(&knots, x) * 0.5;
                let y = mid - amplitude * (TAU * self.cycles * x / width + phase).sin();
                WavePoint { x, y }
            })
            .collect();
        WavePath { points, closed: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viz::Growth;

    fn linear(x: f32, height: f32) -> BarDrawState {
        BarDrawState {
            index: 0,
            height,
            tip_height: None,
            placement: Placement::Linear { x, y: 100.0, growth: Growth::Up },
            width: 4.0,
            mirrored: false,
            segments: None,
        }
    }

    #[test]
    fn envelope_interpolates_and_clamps() {
        let knots = [(0.0, 0.0), (10.0, 100.0), (20.0, 50.0)];
        assert_eq!(envelope(&knots, -5.0), 0.0);
        assert_eq!(envelope(&knots, 5.0), 50.0);
        assert_eq!(envelope(&knots, 15.0), 75.0);
        assert_eq!(envelope(&knots, 25.0), 50.0);
        assert_eq!(envelope(&[], 3.0), 0.0);
    }

    #[test]
    fn silent_bars_trace_a_flat_line() {
        let shape = WaveShape::default();
        let bars: Vec<BarDrawState> = (0..8).map(|i| linear(i as f32 * 10.0 + 5.0, 0.0)).collect();
        let path = shape.trace(&bars, Viewport::new(80.0, 100.0), 1.5);
        assert!(!path.closed);
        assert_eq!(path.points.len(), shape.resolution + 1);
        assert!(path.points.iter().all(|p| p.y == 50.0));
    }

    #[test]
    fn amplitude_stays_within_half_height() {
        let shape = WaveShape { resolution: 64, ..WaveShape::default() };
        let bars: Vec<BarDrawState> = (0..8).map(|i| linear(i as f32 * 10.0 + 5.0, 60.0)).collect();
        let path = shape.trace(&bars, Viewport::new(80.0, 100.0), 0.0);
        assert!(path.points.iter().all(|p| (p.y - 50.0).abs() <= 30.0 + 1e-3));
        assert!(path.points.iter().any(|p| (p.y - 50.0).abs() > 20.0));
    }

    #[test]
    fn radial_bars_trace_a_closed_ring() {
        let shape = WaveShape { resolution: 32, ..WaveShape::default() };
        let bars: Vec<BarDrawState> = (0..4)
            .map(|i| BarDrawState {
                placement: Placement::Radial {
                    cx: 50.0,
                    cy: 50.0,
                    angle: -FRAC_PI_2 + i as f32 * TAU / 4.0,
                    radius: 20.0,
                },
                ..linear(0.0, 0.0)
            })
            .collect();
        let path = shape.trace(&bars, Viewport::new(100.0, 100.0), 0.0);
        assert!(path.closed);
        assert_eq!(path.points.len(), 32);
        for p in &path.points {
            assert!(((p.x - 50.0).hypot(p.y - 50.0) - 20.0).abs() < 1e-3);
        }
    }
}
