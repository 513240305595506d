use super::types::VisualizerConfig;

/// Heights below this snap to zero so decay terminates.
pub const MIN_VISIBLE_HEIGHT: f32 = 0.01;
/// Idle reset fires once every bar and tip is below this while stopped.
pub const IDLE_EPSILON: f32 = 0.5;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BarRuntimeState {
    pub decayed_height: f32,
    pub tip_height: f32,
}

/// Per-tick physics parameters, derived once before the bar loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepParams {
    /// Decay multiplier already raised to the elapsed frame count.
    pub decay: f32,
    /// Distance a falling tip drops this tick.
    pub tip_fall: f32,
    pub show_tips: bool,
}

impl StepParams {
    pub fn new(config: &VisualizerConfig, reference_dimension: f32, frames: f32) -> Self {
        let frames = frames.max(0.0);
        Self {
            decay: decay_factor(config.bar_gravity).powf(frames),
            tip_fall: (config.tip_speed / 1000.0) * reference_dimension * frames,
            show_tips: config.show_tips,
        }
    }
}

/// Per nominal frame decay multiplier for a gravity setting.
pub fn decay_factor(gravity: f32) -> f32 {
    (0.98 - gravity * 0.05).clamp(0.1, 0.98)
}

/// Owns the cross-tick state of every bar.
#[derive(Clone, Debug, Default)]
pub struct BarPhysics {
    bars: Vec<BarRuntimeState>,
}

impl BarPhysics {
    pub fn new(bar_count: usize) -> Self {
        Self {
            bars: vec![BarRuntimeState::default(); bar_count],
        }
    }

    pub fn states(&self) -> &[BarRuntimeState] {
        &self.bars
    }

    /// Reallocate zeroed state when the bar count changes. Returns whether it did.
    pub fn resize(&mut self, bar_count: usize) -> bool {
        if self.bars.len() == bar_count {
            return false;
        }
        self.bars = vec![BarRuntimeState::default(); bar_count];
        true
    }

    pub fn reset(&mut self) {
        self.bars.fill(BarRuntimeState::default());
    }

    /// Advance one bar: instant attack to `target`, gravity decay otherwise.
    pub fn step(&mut self, bar: usize, target: f32, params: &StepParams) -> BarRuntimeState {
        let Some(state) = self.bars.get_mut(bar) else {
            return BarRuntimeState::default();
        };

        let mut candidate = state.decayed_height * params.decay;
        if candidate < MIN_VISIBLE_HEIGHT {
            candidate = 0.0;
        }
        // f32::max ignores a NaN operand
        state.decayed_height = candidate.max(target.max(0.0));

        if params.show_tips {
            if state.decayed_height > state.tip_height {
                state.tip_height = state.decayed_height;
            } else {
                state.tip_height = (state.tip_height - params.tip_fall).max(0.0);
            }
        } else {
            state.tip_height = 0.0;
        }
        *state
    }

    pub fn peak(&self) -> f32 {
        self.bars
            .iter()
            .map(|s| s.decayed_height.max(s.tip_height))
            .fold(0.0, f32::max)
    }

    /// While stopped, force everything to exactly zero once it is imperceptible.
    /// Returns true when the caller should draw the idle indicator.
    pub fn settle_idle(&mut self, is_playing: bool) -> bool {
        if is_playing || self.peak() >= IDLE_EPSILON {
            return false;
        }
        self.reset();
        true
    }
}
