//! Watermark-based flow controller.
//!
//! Observes ring occupancy after each chunk and issues advisory pause/resume
//! directives upstream. Watermarks keep hysteresis (low < high) so the
//! controller cannot oscillate at a single boundary, and pause directives
//! are spaced by a cooldown to avoid command storms.

use std::time::Instant;

use contracts::{FlowControlConfig, FlowDirective};
use tracing::{debug, info};

/// Backpressure state machine.
#[derive(Debug)]
pub struct FlowController {
    config: FlowControlConfig,
    paused: bool,
    last_pause_at: Option<Instant>,
    pauses: u64,
    resumes: u64,
}

impl FlowController {
    /// Create a controller from validated watermarks.
    pub fn new(config: FlowControlConfig) -> Self {
        debug_assert!(
            config.low_watermark < config.high_watermark,
            "watermarks must keep hysteresis"
        );
        Self {
            config,
            paused: false,
            last_pause_at: None,
            pauses: 0,
            resumes: 0,
        }
    }

    /// Whether a pause directive is currently outstanding.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Observe buffer occupancy after a chunk.
    ///
    /// `disturbance` marks that an overflow or resync event just occurred,
    /// which forces a pause regardless of occupancy.
    pub fn observe(
        &mut self,
        occupancy: usize,
        disturbance: bool,
        now: Instant,
    ) -> Option<FlowDirective> {
        if !self.paused {
            if occupancy >= self.config.high_watermark || disturbance {
                let cooled = self
                    .last_pause_at
                    .is_none_or(|at| now.duration_since(at) >= self.config.cooldown());
                if cooled {
                    self.paused = true;
                    self.last_pause_at = Some(now);
                    self.pauses += 1;
                    metrics::counter!("imu_link_flow_pause_total").increment(1);
                    info!(occupancy, disturbance, "flow control: pause");
                    return Some(FlowDirective::Pause);
                }
            }
        } else if occupancy <= self.config.low_watermark {
            self.paused = false;
            self.resumes += 1;
            metrics::counter!("imu_link_flow_resume_total").increment(1);
            debug!(occupancy, "flow control: resume");
            return Some(FlowDirective::Resume);
        }
        None
    }

    /// Pause directives issued this session.
    pub fn pause_count(&self) -> u64 {
        self.pauses
    }

    /// Resume directives issued this session.
    pub fn resume_count(&self) -> u64 {
        self.resumes
    }

    /// Clear state and counters (session boundary).
    pub fn reset(&mut self) {
        self.paused = false;
        self.last_pause_at = None;
        self.pauses = 0;
        self.resumes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn controller() -> FlowController {
        FlowController::new(FlowControlConfig {
            high_watermark: 100,
            low_watermark: 40,
            cooldown_ms: 500,
        })
    }

    #[test]
    fn test_pause_at_high_watermark() {
        let mut flow = controller();
        let now = Instant::now();

        assert_eq!(flow.observe(99, false, now), None);
        assert_eq!(flow.observe(100, false, now), Some(FlowDirective::Pause));
        assert!(flow.is_paused());
        // Already paused: no repeated directive.
        assert_eq!(flow.observe(120, false, now), None);
    }

    #[test]
    fn test_resume_at_low_watermark() {
        let mut flow = controller();
        let now = Instant::now();

        assert_eq!(flow.observe(150, false, now), Some(FlowDirective::Pause));
        // Between watermarks: hysteresis keeps the paused state.
        assert_eq!(flow.observe(41, false, now), None);
        assert_eq!(flow.observe(40, false, now), Some(FlowDirective::Resume));
        assert!(!flow.is_paused());
    }

    #[test]
    fn test_disturbance_forces_pause() {
        let mut flow = controller();
        let now = Instant::now();

        assert_eq!(flow.observe(10, true, now), Some(FlowDirective::Pause));
    }

    #[test]
    fn test_cooldown_suppresses_command_storm() {
        let mut flow = controller();
        let t0 = Instant::now();

        assert_eq!(flow.observe(150, false, t0), Some(FlowDirective::Pause));
        assert_eq!(flow.observe(0, false, t0), Some(FlowDirective::Resume));

        // Immediately back over the watermark: still cooling down.
        assert_eq!(flow.observe(150, false, t0 + Duration::from_millis(100)), None);

        // After the cooldown a new pause goes out.
        assert_eq!(
            flow.observe(150, false, t0 + Duration::from_millis(600)),
            Some(FlowDirective::Pause)
        );
        assert_eq!(flow.pause_count(), 2);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut flow = controller();
        let now = Instant::now();
        flow.observe(150, false, now);
        flow.reset();
        assert!(!flow.is_paused());
        assert_eq!(flow.pause_count(), 0);
        // Cooldown history is gone too.
        assert_eq!(flow.observe(150, false, now), Some(FlowDirective::Pause));
    }
}
