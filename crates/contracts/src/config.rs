//! Link configuration contracts shared across crates.
//!
//! The corruption-recovery heuristics (the firmware-bug value set, the
//! quaternion plausibility band, resync bounds, trusted-ID policy) are
//! deliberate configuration fields rather than buried constants, so the
//! decoder stays adaptable if the firmware is fixed.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete link configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Transport selection
    #[serde(default)]
    pub transport: TransportConfig,

    /// Byte-level framing
    #[serde(default)]
    pub framing: FramingConfig,

    /// Backpressure watermarks
    #[serde(default)]
    pub flow: FlowControlConfig,

    /// Sync-sample decoding policy
    #[serde(default)]
    pub decoder: DecoderConfig,

    /// Link-quality tracking windows
    #[serde(default)]
    pub quality: QualityConfig,

    /// Worker / channel sizing
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Which chunk source feeds the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Synthetic gateway generating wire-format frames (development)
    #[default]
    Mock,
    /// Replay of a recorded byte stream from a file
    Replay,
    /// USB serial port (requires the `serial` feature)
    Serial,
}

/// Transport configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Source kind
    #[serde(default)]
    pub kind: TransportKind,

    /// Serial settings (used when `kind = "serial"`)
    #[serde(default)]
    pub serial: SerialConfig,

    /// Replay settings (used when `kind = "replay"`)
    #[serde(default)]
    pub replay: ReplayConfig,

    /// Mock gateway settings (used when `kind = "mock"`)
    #[serde(default)]
    pub mock: MockGatewayConfig,
}

/// Serial port settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port path, e.g. `/dev/ttyACM0`
    pub port: String,

    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Read buffer size per chunk
    #[serde(default = "default_chunk_bytes")]
    pub chunk_bytes: usize,
}

fn default_baud_rate() -> u32 {
    921_600
}

fn default_chunk_bytes() -> usize {
    4096
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_baud_rate(),
            chunk_bytes: default_chunk_bytes(),
        }
    }
}

/// Replay-file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Path to the recorded byte stream
    pub path: String,

    /// Bytes per chunk handed to the pipeline
    #[serde(default = "default_replay_chunk")]
    pub chunk_bytes: usize,

    /// Inter-chunk delay in milliseconds (0 = as fast as possible)
    #[serde(default)]
    pub pace_ms: u64,
}

fn default_replay_chunk() -> usize {
    512
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            chunk_bytes: default_replay_chunk(),
            pace_ms: 0,
        }
    }
}

/// Mock gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MockGatewayConfig {
    /// Number of synthetic sensors per frame
    pub sensor_count: u8,

    /// First sensor ID (IDs are contiguous from here)
    pub first_sensor_id: u8,

    /// Frame rate in Hz
    pub rate_hz: f64,

    /// Append the CRC-8 trailer (current wire format)
    pub with_checksum: bool,

    /// Corrupt the declared sensor-count header byte on every Nth frame
    /// (0 = never), reproducing the known firmware fault
    pub corrupt_every: u32,
}

impl Default for MockGatewayConfig {
    fn default() -> Self {
        Self {
            sensor_count: 4,
            first_sensor_id: 1,
            rate_hz: 200.0,
            with_checksum: true,
            corrupt_every: 0,
        }
    }
}

/// Byte-level framing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingConfig {
    /// Ring buffer capacity in bytes
    pub ring_capacity: usize,

    /// One-byte resync attempts tolerated before the trailing-window discard
    pub resync_attempt_limit: u32,

    /// Bytes kept (newest) when the resync bound is exceeded
    pub resync_keep_window: usize,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            ring_capacity: 64 * 1024,
            resync_attempt_limit: 64,
            resync_keep_window: 512,
        }
    }
}

/// Watermark-based flow control configuration.
///
/// `low_watermark < high_watermark` is required (hysteresis); violations are
/// rejected by the config validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowControlConfig {
    /// Ring occupancy (bytes) at which a pause directive is issued
    pub high_watermark: usize,

    /// Ring occupancy (bytes) at which a resume directive is issued
    pub low_watermark: usize,

    /// Minimum spacing between pause directives, in milliseconds
    pub cooldown_ms: u64,
}

impl FlowControlConfig {
    /// Pause-directive cooldown as a `Duration`.
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

impl Default for FlowControlConfig {
    fn default() -> Self {
        Self {
            high_watermark: 48 * 1024,
            low_watermark: 16 * 1024,
            cooldown_ms: 500,
        }
    }
}

/// Sync-sample decoder policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Upper bound on a plausible per-frame sensor count
    pub max_sensor_count: u8,

    /// Header-byte values the known firmware fault produces (correlated with
    /// the low byte of the wrapping timestamp)
    pub corrupt_count_values: Vec<u8>,

    /// Lower bound of the accepted quaternion magnitude² band
    pub quat_norm_min: f32,

    /// Upper bound of the accepted quaternion magnitude² band
    pub quat_norm_max: f32,

    /// Drop sensor slots whose ID is absent from the trusted set.
    ///
    /// Default OFF: hard-filtering during topology churn rejects valid new
    /// sensors faster than it rejects corruption.
    pub trusted_id_filter: bool,

    /// Trusted-set time-to-live in milliseconds
    pub trusted_id_ttl_ms: u64,

    /// Minimum spacing between count-mismatch warnings, in milliseconds
    pub mismatch_log_interval_ms: u64,
}

impl DecoderConfig {
    /// Trusted-set TTL as a `Duration`.
    pub fn trusted_id_ttl(&self) -> Duration {
        Duration::from_millis(self.trusted_id_ttl_ms)
    }

    /// Mismatch-warning interval as a `Duration`.
    pub fn mismatch_log_interval(&self) -> Duration {
        Duration::from_millis(self.mismatch_log_interval_ms)
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_sensor_count: 32,
            corrupt_count_values: vec![0, 1, 254, 255],
            quat_norm_min: 0.8,
            quat_norm_max: 1.2,
            trusted_id_filter: false,
            trusted_id_ttl_ms: 1000,
            mismatch_log_interval_ms: 1000,
        }
    }
}

/// Link-quality tracker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Per-sensor rate window in milliseconds
    pub rate_window_ms: u64,

    /// Decay factor applied to the previous Hz estimate when a window closes
    /// with zero samples
    pub rate_decay: f64,

    /// Expected-sensor-set refresh interval in milliseconds
    pub expected_refresh_ms: u64,

    /// Wrapped frame-number distance at or above which a jump is treated as
    /// a firmware restart instead of loss
    pub gap_restart_threshold: u32,

    /// Maximum retained gap-history entries (oldest dropped)
    pub gap_history_cap: usize,

    /// EMA smoothing factor for the synced/partial frame rates
    pub ema_alpha: f64,

    /// Silence (milliseconds) after which category rates decay toward zero
    pub silence_timeout_ms: u64,
}

impl QualityConfig {
    /// Rate window as a `Duration`.
    pub fn rate_window(&self) -> Duration {
        Duration::from_millis(self.rate_window_ms)
    }

    /// Expected-set refresh interval as a `Duration`.
    pub fn expected_refresh(&self) -> Duration {
        Duration::from_millis(self.expected_refresh_ms)
    }

    /// Category silence timeout as a `Duration`.
    pub fn silence_timeout(&self) -> Duration {
        Duration::from_millis(self.silence_timeout_ms)
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            rate_window_ms: 2000,
            rate_decay: 0.5,
            expected_refresh_ms: 5000,
            gap_restart_threshold: 1000,
            gap_history_cap: 100,
            ema_alpha: 0.2,
            silence_timeout_ms: 500,
        }
    }
}

/// Worker / channel sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Inbound chunk channel capacity
    pub chunk_channel_capacity: usize,

    /// Outbound decoded-batch channel capacity
    pub batch_channel_capacity: usize,

    /// Time budget per inline scheduling tick, in milliseconds
    pub tick_budget_ms: u64,

    /// Frame budget per inline scheduling tick
    pub tick_frame_budget: usize,

    /// Hard capacity of the pending-frame queue (oldest dropped on overflow)
    pub pending_frame_cap: usize,
}

impl PipelineConfig {
    /// Per-tick time budget as a `Duration`.
    pub fn tick_budget(&self) -> Duration {
        Duration::from_millis(self.tick_budget_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_channel_capacity: 64,
            batch_channel_capacity: 256,
            tick_budget_ms: 10,
            tick_frame_budget: 256,
            pending_frame_cap: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_recovery_policy() {
        let decoder = DecoderConfig::default();
        assert_eq!(decoder.corrupt_count_values, vec![0, 1, 254, 255]);
        assert_eq!(decoder.max_sensor_count, 32);
        assert!(!decoder.trusted_id_filter);
        assert_eq!(decoder.trusted_id_ttl(), Duration::from_secs(1));

        let flow = FlowControlConfig::default();
        assert!(flow.low_watermark < flow.high_watermark);

        let quality = QualityConfig::default();
        assert_eq!(quality.gap_restart_threshold, 1000);
        assert_eq!(quality.gap_history_cap, 100);
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config: LinkConfig = Default::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: LinkConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(
            parsed.framing.ring_capacity,
            config.framing.ring_capacity
        );
    }
}
