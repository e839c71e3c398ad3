//! Frame-sequence gap detection.
//!
//! The gateway frame counter is a wrapping u32. A small wrapped distance is
//! frame loss; an implausibly large jump is a firmware restart and is
//! ignored rather than booked as thousands of dropped frames.

use std::collections::VecDeque;

use contracts::{GapEvent, QualityConfig};
use tracing::{debug, info};

/// Tracks the last seen frame number and records losses.
#[derive(Debug)]
pub struct GapTracker {
    last_frame_number: Option<u32>,
    dropped: u64,
    restarts: u64,
    history: VecDeque<GapEvent>,
    restart_threshold: u32,
    history_cap: usize,
}

impl GapTracker {
    /// Create a tracker with the configured restart threshold and history
    /// bound.
    pub fn new(config: &QualityConfig) -> Self {
        Self {
            last_frame_number: None,
            dropped: 0,
            restarts: 0,
            history: VecDeque::new(),
            restart_threshold: config.gap_restart_threshold,
            history_cap: config.gap_history_cap,
        }
    }

    /// Observe a delivered frame number; returns the frames dropped before
    /// it (0 for consecutive, duplicate, or restart).
    pub fn observe(&mut self, frame_number: u32) -> u32 {
        let Some(last) = self.last_frame_number else {
            self.last_frame_number = Some(frame_number);
            return 0;
        };
        self.last_frame_number = Some(frame_number);

        let distance = frame_number.wrapping_sub(last);
        if distance == 0 {
            // Duplicate delivery; nothing lost.
            return 0;
        }
        if distance >= self.restart_threshold {
            self.restarts += 1;
            info!(last, frame_number, "frame counter jump treated as firmware restart");
            return 0;
        }

        let missing = distance - 1;
        if missing > 0 {
            self.dropped += missing as u64;
            metrics::counter!("imu_link_frame_gap_drops_total").increment(missing as u64);
            debug!(frame_number, missing, "frame-sequence gap");

            if self.history.len() == self.history_cap {
                self.history.pop_front();
            }
            self.history.push_back(GapEvent {
                at_frame: frame_number,
                missing,
            });
        }
        missing
    }

    /// Total frames lost to gaps.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Jumps classified as firmware restarts.
    pub fn restarts(&self) -> u64 {
        self.restarts
    }

    /// Recent gap events, oldest first.
    pub fn history(&self) -> &VecDeque<GapEvent> {
        &self.history
    }

    /// Clear all state (session boundary).
    pub fn reset(&mut self) {
        self.last_frame_number = None;
        self.dropped = 0;
        self.restarts = 0;
        self.history.clear();
    }
}
