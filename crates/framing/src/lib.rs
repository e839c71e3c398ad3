//! # Framing
//!
//! Byte-level front end of the link pipeline: a fixed-capacity circular byte
//! buffer, the resynchronizing frame extractor, and the watermark-based flow
//! controller.
//!
//! The transport is physically unreliable (USB buffering hiccups, firmware
//! log lines interleaved with binary frames, single-byte corruption), so the
//! extractor treats every malformed prefix as desync and resynchronizes
//! byte-by-byte instead of stalling.

mod extractor;
mod flow;
mod ring;

pub use extractor::{ExtractorStats, FrameExtractor};
pub use flow::FlowController;
pub use ring::ByteRing;
