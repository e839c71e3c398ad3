//! Sync-sample wire encoder.
//!
//! Counterpart of the decoder, used by the mock gateway transport and by
//! round-trip tests. Produces the exact gateway layout: 10-byte header,
//! 24-byte sensor records, optional trailing CRC-8.

use contracts::{
    SyncSampleFrame, ACCEL_SCALE, GYRO_SCALE, LEN_PREFIX_SIZE, QUAT_SCALE, SENSOR_FLAG_VALID,
    SENSOR_RECORD_LEN, SYNC_HEADER_LEN,
};

use crate::crc::crc8;

/// Encode a decoded frame back into `frame_bytes` (no length prefix).
///
/// The declared sensor-count byte is written from `sensors.len()`; tests
/// overwrite it afterwards to reproduce the firmware fault.
pub fn encode_sync_frame(frame: &SyncSampleFrame) -> Vec<u8> {
    let body_len = frame.sensors.len() * SENSOR_RECORD_LEN;
    let total = SYNC_HEADER_LEN + body_len + usize::from(frame.has_checksum);
    let mut out = Vec::with_capacity(total);

    out.push(0x25);
    out.extend_from_slice(&frame.frame_number.to_le_bytes());
    out.extend_from_slice(&frame.timestamp_us.to_le_bytes());
    out.push(frame.sensors.len() as u8);

    for sensor in &frame.sensors {
        out.push(sensor.sensor_id);
        for component in sensor.quat {
            out.extend_from_slice(&scale_i16(component, QUAT_SCALE).to_le_bytes());
        }
        for component in sensor.accel {
            out.extend_from_slice(&scale_i16(component, ACCEL_SCALE).to_le_bytes());
        }
        for component in sensor.gyro {
            out.extend_from_slice(&scale_i16(component, GYRO_SCALE).to_le_bytes());
        }
        out.push(SENSOR_FLAG_VALID);
        out.extend_from_slice(&[0, 0]); // reserved
    }

    if frame.has_checksum {
        out.push(crc8(&out));
    }
    out
}

/// Prepend the little-endian length prefix for serial transmission.
pub fn wrap_wire(frame_bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(LEN_PREFIX_SIZE + frame_bytes.len());
    out.extend_from_slice(&(frame_bytes.len() as u16).to_le_bytes());
    out.extend_from_slice(frame_bytes);
    out
}

fn scale_i16(value: f32, scale: f32) -> i16 {
    (value * scale).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}
