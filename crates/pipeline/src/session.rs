//! Link session: owned pipeline state plus the inline budget driver.
//!
//! A session is created at connection start, mutated while streaming, and
//! fully reset (never partially) at the `Streaming → Idle` transition, so
//! no stale state can leak across sessions.
//!
//! When no dedicated worker task is available the session runs inline in
//! the transport's scheduling tick: `ingest_chunk` decodes at most a frame
//! budget / time budget per call and parks the remainder in a bounded
//! pending queue, so the read loop is never starved.

use std::collections::VecDeque;
use std::time::Instant;

use contracts::{
    DecodedBatch, FlowDirective, Frame, FrameType, LinkCommand, LinkConfig, LinkError, LinkEvent,
    LossSnapshot, QualitySnapshot, SessionState,
};
use decoder::{decode_environmental, decode_json, decode_node_info, SyncSampleDecoder};
use framing::{ByteRing, FlowController, FrameExtractor};
use link_quality::LinkQualityTracker;
use tracing::{debug, info, warn};

/// Result of ingesting one chunk.
#[derive(Debug, Default)]
pub struct ChunkOutcome {
    /// Decoded events plus the loss snapshot as of this chunk
    pub batch: DecodedBatch,

    /// Flow directive to relay upstream, if one fired
    pub directive: Option<FlowDirective>,
}

/// Owned pipeline state for one connection.
#[derive(Debug)]
pub struct LinkSession {
    state: SessionState,
    ring: ByteRing,
    extractor: FrameExtractor,
    decoder: SyncSampleDecoder,
    tracker: LinkQualityTracker,
    flow: FlowController,
    pending: VecDeque<Frame>,

    pending_cap: usize,
    tick_frame_budget: usize,
    tick_budget: std::time::Duration,

    pending_drops: u64,
    aux_rejects: u64,

    // Disturbance edge detection for the flow controller.
    seen_overflow_events: u64,
    seen_window_discards: u64,
    seen_pending_drops: u64,
}

impl LinkSession {
    /// Build an idle session from configuration.
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            state: SessionState::Idle,
            ring: ByteRing::new(config.framing.ring_capacity),
            extractor: FrameExtractor::new(config.framing.clone()),
            decoder: SyncSampleDecoder::new(config.decoder.clone()),
            tracker: LinkQualityTracker::new(config.quality.clone()),
            flow: FlowController::new(config.flow.clone()),
            pending: VecDeque::new(),
            pending_cap: config.pipeline.pending_frame_cap,
            tick_frame_budget: config.pipeline.tick_frame_budget,
            tick_budget: config.pipeline.tick_budget(),
            pending_drops: 0,
            aux_rejects: 0,
            seen_overflow_events: 0,
            seen_window_discards: 0,
            seen_pending_drops: 0,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Enter the streaming state.
    pub fn connect(&mut self) -> Result<(), LinkError> {
        if self.state == SessionState::Streaming {
            return Err(LinkError::SessionState {
                message: "already streaming".to_string(),
            });
        }
        self.state = SessionState::Streaming;
        info!("link session streaming");
        Ok(())
    }

    /// Leave the streaming state, resetting every stateful cache at once.
    pub fn disconnect(&mut self) {
        self.ring.reset();
        self.extractor.reset();
        self.decoder.reset();
        self.tracker.reset();
        self.flow.reset();
        self.pending.clear();
        self.pending_drops = 0;
        self.aux_rejects = 0;
        self.seen_overflow_events = 0;
        self.seen_window_discards = 0;
        self.seen_pending_drops = 0;
        self.state = SessionState::Idle;
        info!("link session idle, state cleared");
    }

    /// Ingest one raw chunk and decode under the tick budget.
    ///
    /// Chunks arriving while idle are discarded: disconnect stops intake.
    pub fn ingest_chunk(&mut self, chunk: &[u8], now: Instant) -> ChunkOutcome {
        if self.state != SessionState::Streaming {
            debug!(len = chunk.len(), "chunk discarded while idle");
            return ChunkOutcome::default();
        }

        self.ring.write(chunk);
        let events = self.drive(now);

        let disturbance = self.take_disturbance();
        let directive = self.flow.observe(self.ring.len(), disturbance, now);

        ChunkOutcome {
            batch: DecodedBatch {
                events,
                loss: self.loss_snapshot(),
            },
            directive,
        }
    }

    /// Resume decoding queued frames without new input (next tick).
    pub fn drain_pending(&mut self, now: Instant) -> ChunkOutcome {
        self.ingest_chunk(&[], now)
    }

    /// Whether queued frames are waiting for the next tick.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Apply an operator command; returns a directive to relay upstream.
    pub fn handle_command(&mut self, command: LinkCommand) -> Option<FlowDirective> {
        match command {
            LinkCommand::PauseStream => Some(FlowDirective::Pause),
            LinkCommand::ResumeStream => Some(FlowDirective::Resume),
            LinkCommand::ResetAllStats => {
                self.reset_stats();
                None
            }
        }
    }

    /// Aggregate every loss source into one report.
    pub fn loss_snapshot(&self) -> LossSnapshot {
        let extractor = self.extractor.stats();
        let decode = self.decoder.stats();
        LossSnapshot {
            frame_gap_drops: self.tracker.gap_drops(),
            ring_overflow_events: self.ring.overflow_events(),
            ring_overflow_bytes: self.ring.overflow_bytes(),
            resync_skips: extractor.resync_skips,
            resync_window_discards: extractor.window_discards,
            checksum_rejects: decode.checksum_rejects,
            corrupt_frame_drops: decode.corrupt_frame_drops,
            unparsable_frames: decode.unparsable_frames,
            slot_quat_rejects: decode.slot_quat_rejects,
            slot_invalid_flag_rejects: decode.slot_invalid_flag_rejects,
            slot_untrusted_rejects: decode.slot_untrusted_rejects,
            aux_rejects: self.aux_rejects,
            pending_drops: self.pending_drops,
            firmware_restarts: self.tracker.firmware_restarts(),
            recovered_frames: decode.recovered_frames,
            delivered_frames: decode.delivered_frames,
        }
    }

    /// Full quality snapshot for operators / display polling.
    pub fn quality_snapshot(&mut self, now: Instant) -> QualitySnapshot {
        let loss = self.loss_snapshot();
        self.tracker.snapshot(loss, now)
    }

    /// Reset statistics without tearing down the stream (operator command).
    fn reset_stats(&mut self) {
        self.extractor.reset();
        self.decoder.reset_stats();
        self.tracker.reset();
        self.ring.reset_counters();
        self.pending_drops = 0;
        self.aux_rejects = 0;
        self.seen_overflow_events = 0;
        self.seen_window_discards = 0;
        self.seen_pending_drops = 0;
        info!("pipeline statistics reset");
    }

    /// Decode up to the tick budget; park surplus complete frames in the
    /// pending queue so the ring never holds more than the catch-up window.
    fn drive(&mut self, now: Instant) -> Vec<LinkEvent> {
        let started = Instant::now();
        let mut events = Vec::new();
        let mut handled = 0usize;

        while handled < self.tick_frame_budget && started.elapsed() < self.tick_budget {
            let frame = match self.pending.pop_front() {
                Some(frame) => frame,
                None => match self.extractor.extract(&mut self.ring) {
                    Some(frame) => frame,
                    None => break,
                },
            };
            if let Some(event) = self.handle_frame(&frame, now) {
                events.push(event);
            }
            handled += 1;
        }

        // Budget exhausted: queue the remaining complete frames for the next
        // tick rather than letting them pile up in (and overflow) the ring.
        while let Some(frame) = self.extractor.extract(&mut self.ring) {
            if self.pending.len() == self.pending_cap {
                self.pending.pop_front();
                self.pending_drops += 1;
                metrics::counter!("imu_link_pending_drops_total").increment(1);
                warn!(cap = self.pending_cap, "pending queue full, oldest frame dropped");
            }
            self.pending.push_back(frame);
        }

        events
    }

    fn handle_frame(&mut self, frame: &Frame, now: Instant) -> Option<LinkEvent> {
        match frame.frame_type {
            FrameType::SyncSample => {
                let decoded = self.decoder.decode(frame, now)?;
                let completeness = self.tracker.observe_sync_frame(&decoded, now);
                Some(LinkEvent::SyncFrame {
                    frame: decoded,
                    completeness,
                })
            }
            FrameType::Environmental => match decode_environmental(frame) {
                Some(sample) => Some(LinkEvent::Environmental(sample)),
                None => {
                    self.aux_rejects += 1;
                    None
                }
            },
            FrameType::NodeInfo => match decode_node_info(frame) {
                Some(info) => Some(LinkEvent::NodeInfo(info)),
                None => {
                    self.aux_rejects += 1;
                    None
                }
            },
            FrameType::Json => match decode_json(frame) {
                Some(message) => Some(LinkEvent::Gateway(message)),
                None => {
                    self.aux_rejects += 1;
                    None
                }
            },
        }
    }

    /// Edge-detect overflow / resync / pending-drop events since last check.
    fn take_disturbance(&mut self) -> bool {
        let overflow_events = self.ring.overflow_events();
        let window_discards = self.extractor.stats().window_discards;
        let pending_drops = self.pending_drops;

        let disturbed = overflow_events > self.seen_overflow_events
            || window_discards > self.seen_window_discards
            || pending_drops > self.seen_pending_drops;
        self.seen_overflow_events = overflow_events;
        self.seen_window_discards = window_discards;
        self.seen_pending_drops = pending_drops;
        disturbed
    }
}
