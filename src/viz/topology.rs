use std::f32::consts::{FRAC_PI_2, PI, TAU};

use super::physics::BarRuntimeState;
use super::types::{BarDrawState, BarPosition, Growth, Placement, VisualizerConfig, Viewport};

/// Inner radius of the circular layout as a fraction of the smaller viewport side.
pub const INNER_RADIUS_RATIO: f32 = 0.15;
/// Circular bars may extend up to this fraction of the smaller viewport side.
pub const CIRCLE_HEIGHT_RATIO: f32 = 1.0 / 3.0;

/// Distance between the starts of two neighbouring LED blocks.
pub fn segment_stride(segment_height: f32, segment_gap: f32) -> f32 {
    (segment_height + segment_gap).max(1.0)
}

/// Number of whole LED blocks a bar of `height` fills.
pub fn segment_count(height: f32, segment_height: f32, segment_gap: f32) -> u32 {
    (height.max(0.0) / segment_stride(segment_height, segment_gap)).floor() as u32
}

/// Computes backend-independent bar geometry for one tick.
#[derive(Clone, Copy, Debug)]
pub struct TopologyMapper<'a> {
    config: &'a VisualizerConfig,
    viewport: Viewport,
}

impl<'a> TopologyMapper<'a> {
    pub fn new(config: &'a VisualizerConfig, viewport: Viewport) -> Self {
        Self { config, viewport }
    }

    fn is_circle(&self) -> bool {
        self.config.position == BarPosition::Circle
    }

    /// Height a ratio of 1.0 maps to.
    pub fn max_height(&self) -> f32 {
        if self.is_circle() {
            self.viewport.min_dimension() * CIRCLE_HEIGHT_RATIO
        } else {
            self.viewport.height
        }
    }

    /// Dimension the tip fall speed is expressed against.
    pub fn reference_dimension(&self) -> f32 {
        if self.is_circle() {
            self.viewport.min_dimension()
        } else {
            self.viewport.height
        }
    }

    pub fn inner_radius(&self) -> f32 {
        self.viewport.min_dimension() * INNER_RADIUS_RATIO
    }

    fn bar_width(&self, slot: f32) -> f32 {
        (slot - self.config.bar_gap).max(slot.min(1.0)).max(0.0)
    }

    fn anchor(&self) -> (f32, Growth) {
        match self.config.position {
            BarPosition::Top => (0.0, Growth::Down),
            BarPosition::Center => (self.viewport.height * 0.5, Growth::Both),
            BarPosition::Bottom | BarPosition::Circle => (self.viewport.height, Growth::Up),
        }
    }

    fn draw_state(&self, index: usize, state: BarRuntimeState, placement: Placement, width: f32, mirrored: bool) -> BarDrawState {
        let mut bar = BarDrawState {
            index,
            height: state.decayed_height.max(0.0),
            tip_height: self.config.show_tips.then_some(state.tip_height.max(0.0)),
            placement,
            width,
            mirrored,
            segments: None,
        };
        if self.config.segmented {
            bar.segments = Some(segment_count(bar.reach(), self.config.segment_height, self.config.segment_gap));
        }
        bar
    }

    /// Place one bar. The second element is the reflected copy in mirror mode.
    pub fn place(&self, index: usize, state: BarRuntimeState) -> (BarDrawState, Option<BarDrawState>) {
        let count = self.config.bar_count.max(1) as f32;
        let (cx, cy) = self.viewport.center();
        let offset = index as f32 + 0.5;

        if self.is_circle() {
            let radius = self.inner_radius();
            let radial = |angle: f32| Placement::Radial { cx, cy, angle, radius };
            if self.config.mirror {
                let step = PI / count;
                let width = self.bar_width(radius * step);
                let right = self.draw_state(index, state, radial(-FRAC_PI_2 + offset * step), width, false);
                let left = self.draw_state(index, state, radial(-FRAC_PI_2 - offset * step), width, true);
                return (right, Some(left));
            }
            let step = TAU / count;
            let width = self.bar_width(radius * step);
            let angle = -FRAC_PI_2 + index as f32 * step;
            return (self.draw_state(index, state, radial(angle), width, false), None);
        }

        let (y, growth) = self.anchor();
        if self.config.mirror {
            let slot = self.viewport.width * 0.5 / count;
            let width = self.bar_width(slot);
            let delta = offset * slot;
            let right = Placement::Linear { x: cx + delta, y, growth };
            let left = Placement::Linear { x: cx - delta, y, growth };
            return (
                self.draw_state(index, state, right, width, false),
                Some(self.draw_state(index, state, left, width, true)),
            );
        }

        let slot = self.viewport.width / count;
        let placement = Placement::Linear { x: offset * slot, y, growth };
        (self.draw_state(index, state, placement, self.bar_width(slot), false), None)
    }

    /// Emit every bar in index order, each followed by its mirrored copy.
    pub fn emit(&self, states: &[BarRuntimeState], out: &mut Vec<BarDrawState>) {
        out.reserve(states.len() * if self.config.mirror { 2 } else { 1 });
        for (index, state) in states.iter().enumerate() {
            let (primary, mirrored) = self.place(index, *state);
            out.push(primary);
            if let Some(mirrored) = mirrored {
                out.push(mirrored);
            }
        }
    }
}
