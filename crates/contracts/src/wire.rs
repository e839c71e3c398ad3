//! Wire-format constants and the raw frame type.
//!
//! The gateway streams length-prefixed frames over USB serial:
//! `[len_lo][len_hi][frame_bytes...]` where `len` is the byte length of
//! `frame_bytes` (the 2-byte prefix is excluded) and the first frame byte is
//! the frame type.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Size of the little-endian length prefix.
pub const LEN_PREFIX_SIZE: usize = 2;

/// Smallest declared frame length the extractor accepts.
pub const MIN_FRAME_LEN: usize = 3;

/// Largest declared frame length the extractor accepts.
pub const MAX_FRAME_LEN: usize = 4096;

/// Sync-sample header: type(1) + frame_number(4) + timestamp_us(4) + count(1).
pub const SYNC_HEADER_LEN: usize = 10;

/// Fixed size of one per-sensor record inside a sync-sample frame.
pub const SENSOR_RECORD_LEN: usize = 24;

/// Quaternion components are int16 scaled by this factor.
pub const QUAT_SCALE: f32 = 16384.0;

/// Accelerometer components are int16 scaled by this factor (m/s²).
pub const ACCEL_SCALE: f32 = 100.0;

/// Gyroscope components are int16 scaled by this factor (rad/s).
pub const GYRO_SCALE: f32 = 900.0;

/// Validity bit in the per-sensor flags byte.
pub const SENSOR_FLAG_VALID: u8 = 0x01;

/// Frame type byte values recognized by the extractor.
///
/// Any other value is transport noise (the gateway interleaves text log
/// lines with binary frames) and causes a one-byte resync skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameType {
    /// Magnetometer / barometer sample (0x04)
    Environmental,
    /// Node discovery / status record (0x05)
    NodeInfo,
    /// Gateway JSON status message (0x06)
    Json,
    /// Cross-sensor synchronized sample frame (0x25)
    SyncSample,
}

impl FrameType {
    /// Map a wire type byte to a known frame type.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x04 => Some(Self::Environmental),
            0x05 => Some(Self::NodeInfo),
            0x06 => Some(Self::Json),
            0x25 => Some(Self::SyncSample),
            _ => None,
        }
    }

    /// Wire type byte for this frame type.
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Environmental => 0x04,
            Self::NodeInfo => 0x05,
            Self::Json => 0x06,
            Self::SyncSample => 0x25,
        }
    }
}

/// One extracted frame.
///
/// `payload` is the full `frame_bytes` run, type byte included, so decoder
/// offsets match the wire documentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Validated frame type (parsed from `payload[0]`)
    pub frame_type: FrameType,

    /// Complete frame bytes (length = the declared wire length)
    pub payload: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_type_bytes() {
        assert_eq!(FrameType::from_byte(0x04), Some(FrameType::Environmental));
        assert_eq!(FrameType::from_byte(0x05), Some(FrameType::NodeInfo));
        assert_eq!(FrameType::from_byte(0x06), Some(FrameType::Json));
        assert_eq!(FrameType::from_byte(0x25), Some(FrameType::SyncSample));
    }

    #[test]
    fn test_unknown_type_bytes_are_noise() {
        for byte in [0x00u8, 0x01, 0x07, 0x24, 0x26, 0x41, 0xFF] {
            assert_eq!(FrameType::from_byte(byte), None);
        }
    }

    #[test]
    fn test_round_trip_type_byte() {
        for ty in [
            FrameType::Environmental,
            FrameType::NodeInfo,
            FrameType::Json,
            FrameType::SyncSample,
        ] {
            assert_eq!(FrameType::from_byte(ty.as_byte()), Some(ty));
        }
    }
}
