//! Decoded events handed to downstream consumers.
//!
//! Consumers (orientation fusion, recording, display) receive these plain
//! structured events and never see raw bytes.

use serde::{Deserialize, Serialize};

/// One validated sensor sample inside a sync frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    /// Unique sensor ID (node ID + local index)
    pub sensor_id: u8,

    /// Unit quaternion (w, x, y, z)
    pub quat: [f32; 4],

    /// Accelerometer (x, y, z) in m/s²
    pub accel: [f32; 3],

    /// Gyroscope (x, y, z) in rad/s
    pub gyro: [f32; 3],
}

/// One decoded cross-sensor synchronized sample frame.
///
/// `sensors` holds only the slots that survived validation; rejected slots
/// are counted in the loss stats, never surfaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSampleFrame {
    /// Monotonic gateway frame counter (wraps)
    pub frame_number: u32,

    /// Synchronized firmware timestamp in microseconds (wraps)
    pub timestamp_us: u32,

    /// Reconciled sensor count (length-inferred when the header byte was
    /// corrupted)
    pub sensor_count: u8,

    /// Whether the wire frame carried a trailing CRC-8 byte
    pub has_checksum: bool,

    /// True when the declared header count disagreed with length inference
    /// and the frame was recovered rather than trusted
    pub recovered: bool,

    /// Surviving per-sensor samples, in wire order
    pub sensors: Vec<SensorRecord>,
}

/// Completeness classification of a delivered sync frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameCompleteness {
    /// All currently expected sensor IDs are present and valid
    Synced,
    /// At least one valid sensor, but not the full expected set
    Partial,
    /// No valid sensors survived (frame delivered for sequence tracking only)
    Empty,
}

/// Environmental sample (magnetometer + barometer), frame type 0x04.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalSample {
    /// Source sensor ID
    pub sensor_id: u8,

    /// Firmware timestamp in microseconds (wraps)
    pub timestamp_us: u32,

    /// Magnetometer (x, y, z) in µT
    pub mag: [f32; 3],

    /// Barometric pressure in hPa
    pub pressure_hpa: f32,

    /// Temperature in °C
    pub temperature_c: f32,
}

/// Node discovery / status record, frame type 0x05.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Node ID
    pub node_id: u8,

    /// Number of sensors the node carries
    pub sensor_count: u8,

    /// Node has a magnetometer
    pub has_mag: bool,

    /// Node has a barometer
    pub has_baro: bool,

    /// Firmware version (major, minor, patch)
    pub firmware_version: (u8, u8, u8),

    /// Human-readable node name (NUL padding stripped)
    pub name: String,

    /// WiFi MAC address
    pub mac: [u8; 6],
}

/// Parsed gateway JSON status message, frame type 0x06.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Parsed message body
    pub body: serde_json::Value,
}

/// One decoded event delivered to consumers, in extraction order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LinkEvent {
    /// A synchronized multi-sensor sample with its completeness metadata
    SyncFrame {
        frame: SyncSampleFrame,
        completeness: FrameCompleteness,
    },

    /// Environmental data
    Environmental(EnvironmentalSample),

    /// Node status
    NodeInfo(NodeInfo),

    /// Gateway status/diagnostic message
    Gateway(GatewayMessage),
}
