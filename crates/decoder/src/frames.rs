//! Fixed-layout decoders for the non-sample frame types.
//!
//! These mirror the gateway's packed structs byte for byte. Malformed
//! payloads return `None`; the caller counts them, nothing escapes.

use contracts::{EnvironmentalSample, Frame, GatewayMessage, NodeInfo};

/// Environmental frame: type(1) + sensor_id(1) + timestamp_us(4) +
/// mag 3×int16(6) + pressure f32(4) + temperature f32(4) = 20 bytes.
const ENVIRONMENTAL_LEN: usize = 20;

/// Node-info frame: type(1) + node_id(1) + sensor_count(1) + has_mag(1) +
/// has_baro(1) + fw(3) + name(16) + mac(6) = 30 bytes.
const NODE_INFO_LEN: usize = 30;

/// Magnetometer components are int16 in µT × 10.
const MAG_SCALE: f32 = 10.0;

/// Decode an environmental (0x04) frame payload.
pub fn decode_environmental(frame: &Frame) -> Option<EnvironmentalSample> {
    let b = &frame.payload[..];
    if b.len() != ENVIRONMENTAL_LEN {
        return None;
    }

    Some(EnvironmentalSample {
        sensor_id: b[1],
        timestamp_us: u32::from_le_bytes([b[2], b[3], b[4], b[5]]),
        mag: [
            i16::from_le_bytes([b[6], b[7]]) as f32 / MAG_SCALE,
            i16::from_le_bytes([b[8], b[9]]) as f32 / MAG_SCALE,
            i16::from_le_bytes([b[10], b[11]]) as f32 / MAG_SCALE,
        ],
        pressure_hpa: f32::from_le_bytes([b[12], b[13], b[14], b[15]]),
        temperature_c: f32::from_le_bytes([b[16], b[17], b[18], b[19]]),
    })
}

/// Decode a node-info (0x05) frame payload.
pub fn decode_node_info(frame: &Frame) -> Option<NodeInfo> {
    let b = &frame.payload[..];
    if b.len() != NODE_INFO_LEN {
        return None;
    }

    let name_bytes = &b[8..24];
    let name_end = name_bytes
        .iter()
        .position(|&c| c == 0)
        .unwrap_or(name_bytes.len());
    let name = String::from_utf8_lossy(&name_bytes[..name_end]).into_owned();

    let mut mac = [0u8; 6];
    mac.copy_from_slice(&b[24..30]);

    Some(NodeInfo {
        node_id: b[1],
        sensor_count: b[2],
        has_mag: b[3] != 0,
        has_baro: b[4] != 0,
        firmware_version: (b[5], b[6], b[7]),
        name,
        mac,
    })
}

/// Decode a gateway JSON (0x06) frame payload.
pub fn decode_json(frame: &Frame) -> Option<GatewayMessage> {
    let body = serde_json::from_slice(&frame.payload[1..]).ok()?;
    Some(GatewayMessage { body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::FrameType;

    fn frame(frame_type: FrameType, payload: Vec<u8>) -> Frame {
        Frame {
            frame_type,
            payload: Bytes::from(payload),
        }
    }

    #[test]
    fn test_environmental_round_values() {
        let mut payload = vec![0x04, 7];
        payload.extend_from_slice(&123_456u32.to_le_bytes());
        payload.extend_from_slice(&250i16.to_le_bytes()); // 25.0 µT
        payload.extend_from_slice(&(-120i16).to_le_bytes()); // -12.0 µT
        payload.extend_from_slice(&0i16.to_le_bytes());
        payload.extend_from_slice(&1013.25f32.to_le_bytes());
        payload.extend_from_slice(&21.5f32.to_le_bytes());

        let sample = decode_environmental(&frame(FrameType::Environmental, payload)).unwrap();
        assert_eq!(sample.sensor_id, 7);
        assert_eq!(sample.timestamp_us, 123_456);
        assert_eq!(sample.mag, [25.0, -12.0, 0.0]);
        assert_eq!(sample.pressure_hpa, 1013.25);
        assert_eq!(sample.temperature_c, 21.5);
    }

    #[test]
    fn test_environmental_wrong_length_rejected() {
        let payload = vec![0x04; 19];
        assert!(decode_environmental(&frame(FrameType::Environmental, payload)).is_none());
    }

    #[test]
    fn test_node_info_name_nul_padding() {
        let mut payload = vec![0x05, 2, 4, 1, 0, 1, 2, 3];
        let mut name = [0u8; 16];
        name[..5].copy_from_slice(b"thigh");
        payload.extend_from_slice(&name);
        payload.extend_from_slice(&[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);

        let info = decode_node_info(&frame(FrameType::NodeInfo, payload)).unwrap();
        assert_eq!(info.node_id, 2);
        assert_eq!(info.sensor_count, 4);
        assert!(info.has_mag);
        assert!(!info.has_baro);
        assert_eq!(info.firmware_version, (1, 2, 3));
        assert_eq!(info.name, "thigh");
        assert_eq!(info.mac, [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
    }

    #[test]
    fn test_json_frame() {
        let payload = b"\x06{\"status\":\"streaming\",\"nodes\":2}".to_vec();
        let msg = decode_json(&frame(FrameType::Json, payload)).unwrap();
        assert_eq!(msg.body["status"], "streaming");
        assert_eq!(msg.body["nodes"], 2);
    }

    #[test]
    fn test_malformed_json_rejected() {
        let payload = b"\x06{not json".to_vec();
        assert!(decode_json(&frame(FrameType::Json, payload)).is_none());
    }
}
