//! Resynchronizing frame extractor.
//!
//! Turns the raw byte stream into discrete, type-tagged frames using the
//! length-prefix + type-byte validation scheme. Desync is recovered by
//! skipping a single byte at a time; a bound on consecutive attempts caps
//! the worst-case catch-up cost by discarding all but a trailing window.

use contracts::{Frame, FrameType, FramingConfig, LEN_PREFIX_SIZE, MAX_FRAME_LEN, MIN_FRAME_LEN};
use tracing::{debug, warn};

use crate::ring::ByteRing;

/// Extractor counters, reset at session boundaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractorStats {
    /// Frames successfully matched
    pub frames_extracted: u64,

    /// One-byte skips while desynchronized
    pub resync_skips: u64,

    /// Trailing-window discards after the attempt bound was exceeded
    pub window_discards: u64,
}

/// State machine extracting frames from a [`ByteRing`].
#[derive(Debug)]
pub struct FrameExtractor {
    config: FramingConfig,
    /// Consecutive desync attempts; a matched frame resets this to zero
    resync_attempts: u32,
    stats: ExtractorStats,
}

impl FrameExtractor {
    /// Create an extractor with the given framing bounds.
    pub fn new(config: FramingConfig) -> Self {
        Self {
            config,
            resync_attempts: 0,
            stats: ExtractorStats::default(),
        }
    }

    /// Extract the next complete frame, consuming ring bytes.
    ///
    /// Returns `None` when the buffered bytes do not yet hold a complete
    /// frame; no partial frame is ever emitted.
    pub fn extract(&mut self, ring: &mut ByteRing) -> Option<Frame> {
        loop {
            if self.resync_attempts >= self.config.resync_attempt_limit {
                self.discard_to_window(ring);
            }

            if ring.len() < LEN_PREFIX_SIZE {
                return None;
            }

            let declared =
                u16::from_le_bytes([ring.peek_byte(0), ring.peek_byte(1)]) as usize;
            if !(MIN_FRAME_LEN..=MAX_FRAME_LEN).contains(&declared) {
                self.desync(ring);
                continue;
            }

            // Length is plausible; the next byte must be a known frame type.
            // Serial log lines interleave with binary frames, so an unknown
            // type byte is desync, not a length error.
            if ring.len() < LEN_PREFIX_SIZE + 1 {
                return None;
            }
            let Some(frame_type) = FrameType::from_byte(ring.peek_byte(2)) else {
                self.desync(ring);
                continue;
            };

            if ring.len() < LEN_PREFIX_SIZE + declared {
                // Wait for the full declared length to arrive.
                return None;
            }

            ring.skip(LEN_PREFIX_SIZE);
            let payload = ring.read_bytes(declared);

            if self.resync_attempts > 0 {
                debug!(
                    skipped = self.resync_attempts,
                    "frame matched after resync"
                );
            }
            self.resync_attempts = 0;
            self.stats.frames_extracted += 1;

            return Some(Frame {
                frame_type,
                payload,
            });
        }
    }

    /// Current counters.
    pub fn stats(&self) -> ExtractorStats {
        self.stats
    }

    /// Clear counters and desync state (session boundary).
    pub fn reset(&mut self) {
        self.resync_attempts = 0;
        self.stats = ExtractorStats::default();
    }

    fn desync(&mut self, ring: &mut ByteRing) {
        ring.skip(1);
        self.resync_attempts += 1;
        self.stats.resync_skips += 1;
    }

    fn discard_to_window(&mut self, ring: &mut ByteRing) {
        let keep = self.config.resync_keep_window;
        let discarded = ring.len().saturating_sub(keep);
        if discarded > 0 {
            ring.skip(discarded);
        }
        self.stats.window_discards += 1;
        self.resync_attempts = 0;
        metrics::counter!("imu_link_resync_window_discards_total").increment(1);
        warn!(
            discarded,
            kept = ring.len(),
            "resync bound exceeded, discarded stale buffer window"
        );
    }
}
