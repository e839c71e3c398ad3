//! Immutable snapshots crossing the worker boundary.
//!
//! Shared state (loss counters, rate estimates, the trusted-ID set) is
//! mutated only on the worker's own task; everything other threads see is a
//! value snapshot, never a live reference.

use serde::{Deserialize, Serialize};

use crate::LinkEvent;

/// Pipeline session lifecycle.
///
/// All counters and caches are cleared exactly at the `Streaming → Idle`
/// transition, never partially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Not connected; no state retained from a previous session
    #[default]
    Idle,
    /// Actively decoding a byte stream
    Streaming,
}

/// Aggregated pipeline-loss counters.
///
/// Monotonically accumulating for the lifetime of a session; reset only at
/// the session boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LossSnapshot {
    /// Frames lost between consecutive frame numbers
    pub frame_gap_drops: u64,

    /// Ring-buffer overflow events (eviction occurred)
    pub ring_overflow_events: u64,

    /// Bytes evicted by ring-buffer overflow
    pub ring_overflow_bytes: u64,

    /// One-byte desync skips during framing
    pub resync_skips: u64,

    /// Trailing-window discards after the resync-attempt bound was exceeded
    pub resync_window_discards: u64,

    /// Whole frames dropped on CRC-8 mismatch
    pub checksum_rejects: u64,

    /// Recovered frames dropped by the frame-level plausibility gate
    pub corrupt_frame_drops: u64,

    /// Frames whose sensor count could not be reconciled
    pub unparsable_frames: u64,

    /// Sensor slots dropped for an implausible quaternion magnitude
    pub slot_quat_rejects: u64,

    /// Sensor slots dropped for a cleared validity flag
    pub slot_invalid_flag_rejects: u64,

    /// Sensor slots dropped by the (optional) trusted-ID filter
    pub slot_untrusted_rejects: u64,

    /// Environmental / node-info / JSON frames with malformed payloads
    pub aux_rejects: u64,

    /// Frames dropped from the pending queue on overflow
    pub pending_drops: u64,

    /// Frame-number jumps classified as firmware restarts (not loss)
    pub firmware_restarts: u64,

    /// Sync frames whose sensor count was corrected by length inference
    pub recovered_frames: u64,

    /// Sync frames delivered to consumers
    pub delivered_frames: u64,
}

impl LossSnapshot {
    /// Total frame-granularity losses across every pipeline stage.
    pub fn lost_frames(&self) -> u64 {
        self.frame_gap_drops
            + self.resync_window_discards
            + self.checksum_rejects
            + self.corrupt_frame_drops
            + self.unparsable_frames
            + self.pending_drops
    }

    /// Single loss-percentage figure against delivered frames.
    pub fn loss_percent(&self) -> f64 {
        let lost = self.lost_frames();
        let total = lost + self.delivered_frames;
        if total == 0 {
            0.0
        } else {
            lost as f64 / total as f64 * 100.0
        }
    }
}

/// One recorded frame-sequence gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapEvent {
    /// Frame number at which the gap was observed
    pub at_frame: u32,

    /// Number of frames missing before it
    pub missing: u32,
}

/// Per-sensor rate estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorRateSnapshot {
    /// Sensor ID
    pub sensor_id: u8,

    /// Estimated sample rate from firmware-clock deltas
    pub hz: f64,

    /// Milliseconds since this sensor was last seen
    pub last_seen_ms: u64,
}

/// Full link-quality snapshot for display / operators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualitySnapshot {
    /// Per-sensor rate estimates, ordered by sensor ID
    pub sensors: Vec<SensorRateSnapshot>,

    /// Currently expected sensor IDs (auto-detected)
    pub expected_sensor_ids: Vec<u8>,

    /// EMA-smoothed rate of complete (synced) frames
    pub synced_hz: f64,

    /// EMA-smoothed rate of partial frames
    pub partial_hz: f64,

    /// Recent frame-sequence gaps, newest last (bounded history)
    pub recent_gaps: Vec<GapEvent>,

    /// Aggregated loss counters
    pub loss: LossSnapshot,
}

/// Output of one worker processing step: decoded events in extraction order
/// plus the loss counters as of this batch.
#[derive(Debug, Clone, Default)]
pub struct DecodedBatch {
    /// Decoded events, in the order frames were extracted
    pub events: Vec<LinkEvent>,

    /// Loss-counter snapshot taken after this batch
    pub loss: LossSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loss_percent_empty() {
        assert_eq!(LossSnapshot::default().loss_percent(), 0.0);
    }

    #[test]
    fn test_loss_percent_combines_sources() {
        let loss = LossSnapshot {
            frame_gap_drops: 5,
            checksum_rejects: 3,
            corrupt_frame_drops: 1,
            unparsable_frames: 1,
            delivered_frames: 90,
            ..Default::default()
        };
        assert_eq!(loss.lost_frames(), 10);
        assert!((loss.loss_percent() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_restarts_are_not_loss() {
        let loss = LossSnapshot {
            firmware_restarts: 4,
            delivered_frames: 10,
            ..Default::default()
        };
        assert_eq!(loss.lost_frames(), 0);
    }
}
