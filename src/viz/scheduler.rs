use super::types::NOMINAL_FRAME_MS;

/// Upper bound on frames elapsed per tick after a stall (suspended tab, debugger pause).
pub const MAX_FRAMES_ELAPSED: f32 = 6.0;

/// Ticks closer than the throttle interval by less than this still run.
const THROTTLE_SLACK_MS: f64 = 1.0;

/// Decides which display-refresh ticks run the pipeline and how much time they cover.
#[derive(Clone, Debug, Default)]
pub struct FrameScheduler {
    last_frame_ms: Option<f64>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a tick at `now_ms`. Returns the elapsed time in nominal frames,
    /// or `None` when the tick falls inside the `fps_limit` interval.
    pub fn admit(&mut self, now_ms: f64, fps_limit: Option<f32>) -> Option<f32> {
        let Some(last) = self.last_frame_ms else {
            self.last_frame_ms = Some(now_ms);
            return Some(1.0);
        };

        let elapsed = now_ms - last;
        if !elapsed.is_finite() || elapsed < 0.0 {
            // clock went backwards; restart the cadence
            self.last_frame_ms = Some(now_ms);
            return Some(1.0);
        }

        if let Some(fps) = fps_limit {
            let interval = 1000.0 / fps as f64;
            if elapsed + THROTTLE_SLACK_MS < interval {
                return None;
            }
        }

        self.last_frame_ms = Some(now_ms);
        Some(((elapsed / NOMINAL_FRAME_MS as f64) as f32).clamp(0.0, MAX_FRAMES_ELAPSED))
    }
}
