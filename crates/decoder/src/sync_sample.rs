//! Sync-sample frame decoder (type 0x25).
//!
//! Header is a fixed 10 bytes: type(1) + frame_number u32LE(4) +
//! timestamp_us u32LE(4) + declared sensor count u8(1); each sensor record
//! is 24 bytes. A trailing CRC-8 byte is present iff the payload length is
//! ≡ 1 (mod 24).
//!
//! The declared count byte is known to corrupt to a specific value set
//! correlated with the low byte of the wrapping timestamp; length inference
//! is immune to that fault and therefore always preferred. Recovered frames
//! must additionally pass a whole-frame quaternion plausibility gate before
//! any of their data is trusted.

use std::collections::HashMap;
use std::time::Instant;

use contracts::{
    DecoderConfig, Frame, FrameType, SensorRecord, SyncSampleFrame, ACCEL_SCALE, GYRO_SCALE,
    QUAT_SCALE, SENSOR_FLAG_VALID, SENSOR_RECORD_LEN, SYNC_HEADER_LEN,
};
use tracing::{trace, warn};

use crate::crc::crc8;
use crate::trusted::{is_contiguous_run_mod256, TrustedSensorSet};

/// Decoder counters, reset at session boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Whole frames dropped on CRC-8 mismatch
    pub checksum_rejects: u64,

    /// Recovered frames dropped by the plausibility gate
    pub corrupt_frame_drops: u64,

    /// Frames whose sensor count could not be reconciled
    pub unparsable_frames: u64,

    /// Slots dropped for an implausible quaternion magnitude
    pub slot_quat_rejects: u64,

    /// Slots dropped for a cleared validity flag
    pub slot_invalid_flag_rejects: u64,

    /// Slots dropped by the trusted-ID soft filter
    pub slot_untrusted_rejects: u64,

    /// Frames whose count was corrected by length inference
    pub recovered_frames: u64,

    /// Frames decoded and handed on
    pub delivered_frames: u64,

    /// Histogram: corrupted declared-count value → occurrences
    pub declared_mismatch: HashMap<u8, u64>,

    /// Histogram: inferred count chosen on mismatch → occurrences
    pub inferred_mismatch: HashMap<u8, u64>,
}

/// Stateful decoder for sync-sample frames.
#[derive(Debug)]
pub struct SyncSampleDecoder {
    config: DecoderConfig,
    trusted: TrustedSensorSet,
    stats: DecodeStats,
    last_mismatch_warn: Option<Instant>,
}

impl SyncSampleDecoder {
    /// Create a decoder with the given corruption-recovery policy.
    pub fn new(config: DecoderConfig) -> Self {
        let trusted = TrustedSensorSet::new(config.trusted_id_ttl());
        Self {
            config,
            trusted,
            stats: DecodeStats::default(),
            last_mismatch_warn: None,
        }
    }

    /// Decode one sync-sample frame.
    ///
    /// Returns `None` when the whole frame is dropped (checksum failure,
    /// unreconcilable count, or an implausible recovered frame); every drop
    /// reason is counted. Individual bad sensor slots are dropped without
    /// taking the frame down.
    pub fn decode(&mut self, frame: &Frame, now: Instant) -> Option<SyncSampleFrame> {
        debug_assert_eq!(frame.frame_type, FrameType::SyncSample);
        let bytes = &frame.payload[..];

        if bytes.len() < SYNC_HEADER_LEN {
            self.stats.unparsable_frames += 1;
            return None;
        }
        let payload_bytes = bytes.len() - SYNC_HEADER_LEN;

        // Checksum variant detection is structural: a trailing CRC-8 byte is
        // present iff the sensor payload is one byte off record alignment.
        let (body, has_checksum) = if payload_bytes % SENSOR_RECORD_LEN == 1 {
            let crc_index = bytes.len() - 1;
            if crc8(&bytes[..crc_index]) != bytes[crc_index] {
                self.stats.checksum_rejects += 1;
                metrics::counter!("imu_link_checksum_rejects_total").increment(1);
                trace!(len = bytes.len(), "sync frame failed CRC-8, dropped");
                return None;
            }
            (&bytes[SYNC_HEADER_LEN..crc_index], true)
        } else {
            // Legacy wire format without trailer; misaligned lengths fall
            // through to count reconciliation and are dropped there.
            (&bytes[SYNC_HEADER_LEN..], false)
        };

        let declared = bytes[9];
        let sensor_count = match self.reconcile_count(declared, body.len()) {
            Some(count) => count,
            None => {
                self.stats.unparsable_frames += 1;
                metrics::counter!("imu_link_unparsable_frames_total").increment(1);
                return None;
            }
        };
        let recovered = sensor_count != declared as usize;

        if recovered {
            self.record_mismatch(declared, sensor_count as u8, now);

            // Random bytes rarely produce a near-unit quaternion: if not a
            // single slot looks plausible, the whole frame is garbage.
            let any_plausible =
                (0..sensor_count).any(|i| self.quat_plausible(record_at(body, i)));
            if !any_plausible {
                self.stats.corrupt_frame_drops += 1;
                metrics::counter!("imu_link_corrupt_frame_drops_total").increment(1);
                return None;
            }
        }

        let mut sensors = Vec::with_capacity(sensor_count);
        for i in 0..sensor_count {
            if let Some(record) = self.decode_slot(record_at(body, i), now) {
                sensors.push(record);
            }
        }

        // Learn the trusted set only from unambiguous frames.
        if !recovered && sensors.len() == sensor_count && sensor_count >= 2 {
            let ids: Vec<u8> = sensors.iter().map(|s| s.sensor_id).collect();
            if is_contiguous_run_mod256(&ids) {
                self.trusted.learn(&ids, now);
            }
        }

        self.stats.delivered_frames += 1;
        if recovered {
            self.stats.recovered_frames += 1;
        }

        Some(SyncSampleFrame {
            frame_number: read_u32_le(bytes, 1),
            timestamp_us: read_u32_le(bytes, 5),
            sensor_count: sensor_count as u8,
            has_checksum,
            recovered,
            sensors,
        })
    }

    /// Current counters.
    pub fn stats(&self) -> &DecodeStats {
        &self.stats
    }

    /// Trusted-ID set (diagnostics).
    pub fn trusted(&self) -> &TrustedSensorSet {
        &self.trusted
    }

    /// Clear counters, histograms and the trusted set (session boundary).
    pub fn reset(&mut self) {
        self.reset_stats();
        self.trusted.reset();
    }

    /// Clear counters and histograms only, keeping the trusted set
    /// (operator stats reset mid-stream).
    pub fn reset_stats(&mut self) {
        self.stats = DecodeStats::default();
        self.last_mismatch_warn = None;
    }

    /// Reconcile the declared sensor count against length inference.
    ///
    /// Priority: a valid length-inferred count always wins (the declared
    /// byte is the corruptible one); a plausible declared count backed by a
    /// matching frame length is the fallback; otherwise the frame is
    /// unparsable.
    fn reconcile_count(&self, declared: u8, body_len: usize) -> Option<usize> {
        let max = self.config.max_sensor_count as usize;
        let inferred = body_len / SENSOR_RECORD_LEN;
        let aligned = body_len % SENSOR_RECORD_LEN == 0;

        if aligned && (1..=max).contains(&inferred) {
            return Some(inferred);
        }
        let declared = declared as usize;
        if (1..=max).contains(&declared) && body_len == declared * SENSOR_RECORD_LEN {
            return Some(declared);
        }
        None
    }

    fn record_mismatch(&mut self, declared: u8, inferred: u8, now: Instant) {
        *self.stats.declared_mismatch.entry(declared).or_insert(0) += 1;
        *self.stats.inferred_mismatch.entry(inferred).or_insert(0) += 1;
        metrics::counter!("imu_link_count_mismatch_total").increment(1);

        let due = self
            .last_mismatch_warn
            .is_none_or(|at| now.duration_since(at) >= self.config.mismatch_log_interval());
        if due {
            self.last_mismatch_warn = Some(now);
            let known_fault = self.config.corrupt_count_values.contains(&declared);
            warn!(
                declared,
                inferred,
                known_fault,
                "sensor count recovered from length inference"
            );
        }
    }

    fn quat_plausible(&self, record: &[u8]) -> bool {
        let mag_sq = quat_mag_sq(record);
        mag_sq >= self.config.quat_norm_min && mag_sq <= self.config.quat_norm_max
    }

    fn decode_slot(&mut self, record: &[u8], now: Instant) -> Option<SensorRecord> {
        if !self.quat_plausible(record) {
            self.stats.slot_quat_rejects += 1;
            return None;
        }

        // Bit 0 of the flags byte marks the slot as carrying real data;
        // the gateway emits cleared slots when a node's sample was missing.
        let flags = record[21];
        if flags & SENSOR_FLAG_VALID == 0 {
            self.stats.slot_invalid_flag_rejects += 1;
            return None;
        }

        let sensor_id = record[0];
        if self.config.trusted_id_filter
            && !self.trusted.is_empty()
            && self.trusted.is_fresh(now)
            && !self.trusted.contains(sensor_id)
        {
            self.stats.slot_untrusted_rejects += 1;
            return None;
        }

        Some(SensorRecord {
            sensor_id,
            quat: [
                read_i16_le(record, 1) as f32 / QUAT_SCALE,
                read_i16_le(record, 3) as f32 / QUAT_SCALE,
                read_i16_le(record, 5) as f32 / QUAT_SCALE,
                read_i16_le(record, 7) as f32 / QUAT_SCALE,
            ],
            accel: [
                read_i16_le(record, 9) as f32 / ACCEL_SCALE,
                read_i16_le(record, 11) as f32 / ACCEL_SCALE,
                read_i16_le(record, 13) as f32 / ACCEL_SCALE,
            ],
            gyro: [
                read_i16_le(record, 15) as f32 / GYRO_SCALE,
                read_i16_le(record, 17) as f32 / GYRO_SCALE,
                read_i16_le(record, 19) as f32 / GYRO_SCALE,
            ],
        })
    }
}

fn record_at(body: &[u8], index: usize) -> &[u8] {
    &body[index * SENSOR_RECORD_LEN..(index + 1) * SENSOR_RECORD_LEN]
}

fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn read_i16_le(bytes: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn quat_mag_sq(record: &[u8]) -> f32 {
    let mut mag_sq = 0.0f32;
    for i in 0..4 {
        let component = read_i16_le(record, 1 + i * 2) as f32 / QUAT_SCALE;
        mag_sq += component * component;
    }
    mag_sq
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode_sync_frame;
    use bytes::Bytes;
    use contracts::FrameType;
    use std::time::Duration;

    fn decoder() -> SyncSampleDecoder {
        SyncSampleDecoder::new(DecoderConfig::default())
    }

    fn sample(sensor_id: u8) -> SensorRecord {
        SensorRecord {
            sensor_id,
            quat: [1.0, 0.0, 0.0, 0.0],
            accel: [0.0, 0.0, 9.81],
            gyro: [0.0, 0.0, 0.9],
        }
    }

    fn sync_frame(sensor_ids: &[u8], with_checksum: bool) -> SyncSampleFrame {
        SyncSampleFrame {
            frame_number: 100,
            timestamp_us: 5000,
            sensor_count: sensor_ids.len() as u8,
            has_checksum: with_checksum,
            recovered: false,
            sensors: sensor_ids.iter().map(|&id| sample(id)).collect(),
        }
    }

    fn as_frame(payload: Vec<u8>) -> Frame {
        Frame {
            frame_type: FrameType::SyncSample,
            payload: Bytes::from(payload),
        }
    }

    #[test]
    fn test_round_trip_with_checksum() {
        let original = sync_frame(&[3, 4], true);
        let wire = encode_sync_frame(&original);
        let decoded = decoder()
            .decode(&as_frame(wire), Instant::now())
            .expect("valid frame must decode");
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_round_trip_legacy_without_checksum() {
        let original = sync_frame(&[3, 4, 5], false);
        let wire = encode_sync_frame(&original);
        let decoded = decoder()
            .decode(&as_frame(wire), Instant::now())
            .expect("legacy frame must decode");
        assert_eq!(decoded, original);
        assert!(!decoded.has_checksum);
    }

    #[test]
    fn test_checksum_mismatch_drops_frame() {
        let mut wire = encode_sync_frame(&sync_frame(&[3, 4], true));
        let body_byte = SYNC_HEADER_LEN + 5;
        wire[body_byte] ^= 0x01;

        let mut dec = decoder();
        assert!(dec.decode(&as_frame(wire), Instant::now()).is_none());
        assert_eq!(dec.stats().checksum_rejects, 1);
        assert_eq!(dec.stats().delivered_frames, 0);
    }

    #[test]
    fn test_corrupted_declared_count_recovered_by_inference() {
        // Declared 255 with a payload of exactly 4 records: the decoder must
        // prefer the inferred count and flag the frame as recovered.
        let mut wire = encode_sync_frame(&sync_frame(&[1, 2, 3, 4], false));
        wire[9] = 255;

        let mut dec = decoder();
        let decoded = dec.decode(&as_frame(wire), Instant::now()).unwrap();
        assert!(decoded.recovered);
        assert_eq!(decoded.sensor_count, 4);
        assert_eq!(decoded.sensors.len(), 4);
        assert_eq!(dec.stats().recovered_frames, 1);
        assert_eq!(dec.stats().declared_mismatch.get(&255), Some(&1));
        assert_eq!(dec.stats().inferred_mismatch.get(&4), Some(&1));
    }

    #[test]
    fn test_recovered_frame_with_no_plausible_quat_dropped() {
        let mut frame = sync_frame(&[1, 2], false);
        for sensor in &mut frame.sensors {
            sensor.quat = [0.0, 0.0, 0.0, 0.0]; // magnitude² = 0, implausible
        }
        let mut wire = encode_sync_frame(&frame);
        wire[9] = 254; // force the recovery path

        let mut dec = decoder();
        assert!(dec.decode(&as_frame(wire), Instant::now()).is_none());
        assert_eq!(dec.stats().corrupt_frame_drops, 1);
        assert_eq!(dec.stats().delivered_frames, 0);
    }

    #[test]
    fn test_bad_quat_drops_slot_not_frame() {
        let mut frame = sync_frame(&[1, 2, 3], false);
        frame.sensors[1].quat = [2.0, 2.0, 2.0, 2.0]; // magnitude² = 16
        let wire = encode_sync_frame(&frame);

        let mut dec = decoder();
        let decoded = dec.decode(&as_frame(wire), Instant::now()).unwrap();
        assert_eq!(decoded.sensors.len(), 2);
        assert_eq!(decoded.sensors[0].sensor_id, 1);
        assert_eq!(decoded.sensors[1].sensor_id, 3);
        assert_eq!(dec.stats().slot_quat_rejects, 1);
    }

    #[test]
    fn test_cleared_validity_flag_drops_slot() {
        let frame = sync_frame(&[1, 2], false);
        let mut wire = encode_sync_frame(&frame);
        // Clear the flags byte of the second record.
        let flags_index = SYNC_HEADER_LEN + SENSOR_RECORD_LEN + 21;
        wire[flags_index] = 0x00;

        let mut dec = decoder();
        let decoded = dec.decode(&as_frame(wire), Instant::now()).unwrap();
        assert_eq!(decoded.sensors.len(), 1);
        assert_eq!(dec.stats().slot_invalid_flag_rejects, 1);
    }

    #[test]
    fn test_unreconcilable_frame_counted_and_dropped() {
        // 10-byte header plus 30 payload bytes: neither 0 nor 1 mod 24.
        let mut payload = vec![0u8; SYNC_HEADER_LEN + 30];
        payload[0] = 0x25;
        payload[9] = 7;

        let mut dec = decoder();
        assert!(dec.decode(&as_frame(payload), Instant::now()).is_none());
        assert_eq!(dec.stats().unparsable_frames, 1);
    }

    #[test]
    fn test_trusted_set_learned_from_unambiguous_frame() {
        let wire = encode_sync_frame(&sync_frame(&[5, 6, 7], true));
        let mut dec = decoder();
        let now = Instant::now();
        dec.decode(&as_frame(wire), now).unwrap();

        assert_eq!(dec.trusted().ids(), &[5, 6, 7]);
        assert!(dec.trusted().is_fresh(now));
    }

    #[test]
    fn test_trusted_set_not_learned_from_recovered_frame() {
        let mut wire = encode_sync_frame(&sync_frame(&[5, 6, 7], false));
        wire[9] = 0; // corrupt header -> recovered path
        let mut dec = decoder();
        dec.decode(&as_frame(wire), Instant::now()).unwrap();
        assert!(dec.trusted().is_empty());
    }

    #[test]
    fn test_trusted_set_not_learned_from_single_sensor() {
        let wire = encode_sync_frame(&sync_frame(&[5], true));
        let mut dec = decoder();
        dec.decode(&as_frame(wire), Instant::now()).unwrap();
        assert!(dec.trusted().is_empty());
    }

    #[test]
    fn test_trusted_set_not_learned_from_gap_in_ids() {
        let wire = encode_sync_frame(&sync_frame(&[5, 9], true));
        let mut dec = decoder();
        dec.decode(&as_frame(wire), Instant::now()).unwrap();
        assert!(dec.trusted().is_empty());
    }

    #[test]
    fn test_trusted_filter_default_off() {
        let mut dec = decoder();
        let now = Instant::now();
        dec.decode(&as_frame(encode_sync_frame(&sync_frame(&[1, 2], true))), now)
            .unwrap();

        // A frame from an unknown sensor still passes: the filter defaults
        // to disabled because hard-filtering during topology churn rejects
        // valid new sensors.
        let decoded = dec
            .decode(&as_frame(encode_sync_frame(&sync_frame(&[200], true))), now)
            .unwrap();
        assert_eq!(decoded.sensors.len(), 1);
        assert_eq!(dec.stats().slot_untrusted_rejects, 0);
    }

    #[test]
    fn test_trusted_filter_enabled_drops_unknown_ids() {
        let config = DecoderConfig {
            trusted_id_filter: true,
            ..Default::default()
        };
        let mut dec = SyncSampleDecoder::new(config);
        let now = Instant::now();
        dec.decode(&as_frame(encode_sync_frame(&sync_frame(&[1, 2], true))), now)
            .unwrap();

        let decoded = dec
            .decode(&as_frame(encode_sync_frame(&sync_frame(&[200], true))), now)
            .unwrap();
        assert!(decoded.sensors.is_empty());
        assert_eq!(dec.stats().slot_untrusted_rejects, 1);

        // Past the TTL the stale set stops filtering.
        let later = now + Duration::from_secs(2);
        let decoded = dec
            .decode(
                &as_frame(encode_sync_frame(&sync_frame(&[200], true))),
                later,
            )
            .unwrap();
        assert_eq!(decoded.sensors.len(), 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut dec = decoder();
        let now = Instant::now();
        let mut wire = encode_sync_frame(&sync_frame(&[1, 2], true));
        wire[9] = 255;
        dec.decode(&as_frame(wire), now);
        dec.decode(&as_frame(encode_sync_frame(&sync_frame(&[1, 2], true))), now);

        dec.reset();
        assert_eq!(*dec.stats(), DecodeStats::default());
        assert!(dec.trusted().is_empty());
    }
}
