//! Mock gateway source.
//!
//! Generates wire-format frames at a configurable rate without hardware,
//! including the documented firmware fault (corrupting the declared
//! sensor-count byte) on demand. Used for development, demos and e2e tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use contracts::{FlowDirective, MockGatewayConfig, SensorRecord, SyncSampleFrame};
use decoder::{crc8, encode_sync_frame, wrap_wire};
use tracing::{debug, trace};

use crate::source::{ChunkCallback, ChunkSource};

/// Synthetic gateway implementing [`ChunkSource`].
pub struct MockGatewaySource {
    config: MockGatewayConfig,
    listening: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
}

impl MockGatewaySource {
    /// Create a mock gateway.
    pub fn new(config: MockGatewayConfig) -> Self {
        Self {
            config,
            listening: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Build the wire bytes for one frame, applying the header fault when
    /// `corrupt` is set. The fault happens before the CRC trailer is
    /// appended, as it does in the gateway's memory.
    fn build_frame(config: &MockGatewayConfig, frame_number: u32, timestamp_us: u32, corrupt: bool) -> Bytes {
        let sensors: Vec<SensorRecord> = (0..config.sensor_count)
            .map(|i| SensorRecord {
                sensor_id: config.first_sensor_id.wrapping_add(i),
                quat: [1.0, 0.0, 0.0, 0.0],
                accel: [0.0, 0.0, 9.81],
                gyro: [0.0, 0.0, 0.0],
            })
            .collect();

        let frame = SyncSampleFrame {
            frame_number,
            timestamp_us,
            sensor_count: config.sensor_count,
            has_checksum: false, // trailer appended below, after the fault
            recovered: false,
            sensors,
        };

        let mut bytes = encode_sync_frame(&frame);
        if corrupt {
            // The fault tracks the low byte of the wrapping timestamp.
            bytes[9] = timestamp_us as u8;
        }
        if config.with_checksum {
            bytes.push(crc8(&bytes));
        }
        Bytes::from(wrap_wire(&bytes))
    }
}

impl ChunkSource for MockGatewaySource {
    fn name(&self) -> &str {
        "mock-gateway"
    }

    fn listen(&self, callback: ChunkCallback) {
        // Idempotent: if already listening, don't start again
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let config = self.config.clone();
        let listening = self.listening.clone();
        let paused = self.paused.clone();

        let interval = Duration::from_secs_f64(1.0 / config.rate_hz.max(1.0));
        let period_us = (1_000_000.0 / config.rate_hz.max(1.0)) as u32;

        thread::spawn(move || {
            debug!(
                rate_hz = config.rate_hz,
                sensors = config.sensor_count,
                "mock gateway started"
            );

            let mut frame_number: u32 = 0;
            let mut timestamp_us: u32 = 0;

            while listening.load(Ordering::Relaxed) {
                if paused.load(Ordering::Relaxed) {
                    thread::sleep(interval);
                    continue;
                }

                frame_number = frame_number.wrapping_add(1);
                timestamp_us = timestamp_us.wrapping_add(period_us);

                let corrupt = config.corrupt_every > 0
                    && frame_number % config.corrupt_every == 0;
                let chunk =
                    MockGatewaySource::build_frame(&config, frame_number, timestamp_us, corrupt);

                trace!(frame_number, corrupt, "mock frame emitted");
                callback(chunk);

                thread::sleep(interval);
            }

            debug!("mock gateway stopped");
        });
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }

    fn send_directive(&self, directive: FlowDirective) {
        match directive {
            FlowDirective::Pause => self.paused.store(true, Ordering::SeqCst),
            FlowDirective::Resume => self.paused.store(false, Ordering::SeqCst),
        }
    }
}
