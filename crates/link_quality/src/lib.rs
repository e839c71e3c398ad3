//! # Link Quality
//!
//! Sync-quality tracking over the decoded stream: per-sensor sample rate
//! from firmware-clock deltas, frame-sequence gap detection under rollover,
//! frame-completeness classification, and the aggregation of every loss
//! source into one report.
//!
//! Everything here is derived state: it observes delivered frames and never
//! influences decoding.

mod completeness;
mod gaps;
mod rate;

pub use completeness::CompletenessTracker;
pub use gaps::GapTracker;
pub use rate::RateTracker;

use std::time::Instant;

use contracts::{FrameCompleteness, LossSnapshot, QualityConfig, QualitySnapshot, SyncSampleFrame};

/// Facade combining the three trackers.
#[derive(Debug)]
pub struct LinkQualityTracker {
    rates: RateTracker,
    gaps: GapTracker,
    completeness: CompletenessTracker,
}

impl LinkQualityTracker {
    /// Create a tracker with the given windows and thresholds.
    pub fn new(config: QualityConfig) -> Self {
        Self {
            rates: RateTracker::new(&config),
            gaps: GapTracker::new(&config),
            completeness: CompletenessTracker::new(&config),
        }
    }

    /// Observe one delivered sync frame and classify its completeness.
    pub fn observe_sync_frame(
        &mut self,
        frame: &SyncSampleFrame,
        now: Instant,
    ) -> FrameCompleteness {
        self.gaps.observe(frame.frame_number);

        for sensor in &frame.sensors {
            self.rates.observe(sensor.sensor_id, frame.timestamp_us, now);
        }

        let ids: Vec<u8> = frame.sensors.iter().map(|s| s.sensor_id).collect();
        self.completeness.classify(&ids, now)
    }

    /// Frames lost to sequence gaps so far.
    pub fn gap_drops(&self) -> u64 {
        self.gaps.dropped()
    }

    /// Frame-number jumps classified as firmware restarts.
    pub fn firmware_restarts(&self) -> u64 {
        self.gaps.restarts()
    }

    /// Build a display snapshot; `loss` carries the counters the session
    /// aggregates from the framing and decoding stages.
    pub fn snapshot(&mut self, loss: LossSnapshot, now: Instant) -> QualitySnapshot {
        QualitySnapshot {
            sensors: self.rates.snapshot(now),
            expected_sensor_ids: self.completeness.expected_ids().to_vec(),
            synced_hz: self.completeness.synced_hz(now),
            partial_hz: self.completeness.partial_hz(now),
            recent_gaps: self.gaps.history().iter().copied().collect(),
            loss,
        }
    }

    /// Clear all derived state (session boundary).
    pub fn reset(&mut self) {
        self.rates.reset();
        self.gaps.reset();
        self.completeness.reset();
    }
}
