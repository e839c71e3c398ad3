//! # Decoder
//!
//! Frame-payload decoding. The hard case is the cross-sensor synchronized
//! sample frame (type 0x25): a known firmware fault corrupts the declared
//! sensor-count header byte, so the decoder reconciles it against the
//! length-inferred count and gates recovered frames on quaternion
//! plausibility before trusting their data.
//!
//! The environmental, node-info and JSON frame types have small fixed-layout
//! decoders; anything malformed is counted, never propagated as an error.

mod crc;
mod encode;
mod frames;
mod sync_sample;
mod trusted;

pub use frames::{decode_environmental, decode_json, decode_node_info};
pub use crc::crc8;
pub use encode::{encode_sync_frame, wrap_wire};
pub use sync_sample::{DecodeStats, SyncSampleDecoder};
pub use trusted::{is_contiguous_run_mod256, TrustedSensorSet};
