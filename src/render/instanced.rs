use bytemuck::{Pod, Zeroable};
use std::f32::consts::FRAC_PI_2;

use super::TIP_THICKNESS;
use crate::viz::topology::segment_stride;
use crate::viz::{BarDrawState, Growth, Placement, VisualizerConfig};

pub const KIND_BAR: u32 = 0;
pub const KIND_TIP: u32 = 1;

/// Per-instance transform for a unit quad spanning x in -0.5..0.5 and y in
/// 0..1, where +y points away from the anchor.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct InstanceTransform {
    pub translation: [f32; 2],
    pub scale: [f32; 2],
    pub rotation: f32,
    pub bar: u32,
    pub kind: u32,
    pub _padding: u32,
}

fn rotation_for(growth: Growth) -> f32 {
    match growth {
        // screen y grows downward, so "up" flips the quad
        Growth::Up | Growth::Both => std::f32::consts::PI,
        Growth::Down => 0.0,
    }
}

fn push_span(bar: &BarDrawState, start: f32, length: f32, kind: u32, out: &mut Vec<InstanceTransform>) {
    match bar.placement {
        Placement::Linear { x, y, growth } => {
            let mut push = |rotation: f32, direction: f32| {
                out.push(InstanceTransform {
                    translation: [x, y + direction * start],
                    scale: [bar.width, length],
                    rotation,
                    bar: bar.index as u32,
                    kind,
                    _padding: 0,
                });
            };
            match growth {
                Growth::Both => {
                    push(rotation_for(Growth::Up), -1.0);
                    push(rotation_for(Growth::Down), 1.0);
                }
                Growth::Up => push(rotation_for(growth), -1.0),
                Growth::Down => push(rotation_for(growth), 1.0),
            }
        }
        Placement::Radial { cx, cy, angle, radius } => {
            let r = radius + start;
            out.push(InstanceTransform {
                translation: [cx + r * angle.cos(), cy + r * angle.sin()],
                scale: [bar.width, length],
                rotation: angle - FRAC_PI_2,
                bar: bar.index as u32,
                kind,
                _padding: 0,
            });
        }
    }
}

/// Flatten draw states into GPU instance transforms. Bars with zero height
/// emit nothing; tips are emitted after their bar. Segmented bars emit one
/// bar instance per LED block.
pub fn build_instances(bars: &[BarDrawState], config: &VisualizerConfig, out: &mut Vec<InstanceTransform>) {
    out.clear();
    let stride = segment_stride(config.segment_height, config.segment_gap);
    for bar in bars {
        match bar.segments {
            Some(blocks) => {
                for block in 0..blocks {
                    push_span(bar, block as f32 * stride, config.segment_height, KIND_BAR, out);
                }
            }
            None if bar.height > 0.0 => push_span(bar, 0.0, bar.reach(), KIND_BAR, out),
            None => {}
        }
        if let Some(tip) = bar.tip_reach() {
            push_span(bar, tip, TIP_THICKNESS, KIND_TIP, out);
        }
    }
}
