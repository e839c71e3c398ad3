//! Per-sensor sample-rate estimation.
//!
//! Rates are computed from firmware clock deltas, not local wall-clock
//! deltas: USB buffering makes arrival times jittery while the firmware
//! timestamps are beacon-synchronized. Timestamps are accumulated per sensor
//! inside a fixed window; the window close divides interval count by the
//! wrapped firmware-clock span.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use contracts::{QualityConfig, SensorRateSnapshot};

#[derive(Debug)]
struct SensorWindow {
    timestamps: Vec<u32>,
    window_start: Instant,
    hz: f64,
    last_seen: Instant,
}

/// Windowed per-sensor Hz estimator.
#[derive(Debug)]
pub struct RateTracker {
    sensors: BTreeMap<u8, SensorWindow>,
    window: Duration,
    decay: f64,
}

impl RateTracker {
    /// Create a tracker with the configured window and decay factor.
    pub fn new(config: &QualityConfig) -> Self {
        Self {
            sensors: BTreeMap::new(),
            window: config.rate_window(),
            decay: config.rate_decay,
        }
    }

    /// Record one firmware timestamp for a sensor.
    pub fn observe(&mut self, sensor_id: u8, timestamp_us: u32, now: Instant) {
        let entry = self.sensors.entry(sensor_id).or_insert_with(|| SensorWindow {
            timestamps: Vec::new(),
            window_start: now,
            hz: 0.0,
            last_seen: now,
        });

        if now.duration_since(entry.window_start) >= self.window {
            close_window(entry, now, self.decay);
        }

        entry.timestamps.push(timestamp_us);
        entry.last_seen = now;
    }

    /// Close any windows that are due (also called before snapshots so a
    /// silent sensor's estimate still decays).
    pub fn tick(&mut self, now: Instant) {
        for entry in self.sensors.values_mut() {
            if now.duration_since(entry.window_start) >= self.window {
                close_window(entry, now, self.decay);
            }
        }
    }

    /// Per-sensor estimates ordered by sensor ID.
    pub fn snapshot(&mut self, now: Instant) -> Vec<SensorRateSnapshot> {
        self.tick(now);
        self.sensors
            .iter()
            .map(|(&sensor_id, entry)| SensorRateSnapshot {
                sensor_id,
                hz: entry.hz,
                last_seen_ms: now.duration_since(entry.last_seen).as_millis() as u64,
            })
            .collect()
    }

    /// Forget all sensors (session boundary).
    pub fn reset(&mut self) {
        self.sensors.clear();
    }
}

fn close_window(entry: &mut SensorWindow, now: Instant, decay: f64) {
    let elapsed = now.duration_since(entry.window_start).as_secs_f64();
    let count = entry.timestamps.len();

    match count {
        // Transient silence: decay the previous estimate instead of
        // resetting to zero.
        0 => entry.hz *= decay,
        // One sample says nothing about the firmware clock; use local time.
        1 => {
            if elapsed > 0.0 {
                entry.hz = 1.0 / elapsed;
            }
        }
        _ => {
            entry.timestamps.sort_unstable();
            let span_us = wrapped_span_us(
                entry.timestamps[0],
                entry.timestamps[count - 1],
            );
            if span_us == 0 {
                if elapsed > 0.0 {
                    entry.hz = count as f64 / elapsed;
                }
            } else {
                entry.hz = (count as f64 - 1.0) / (span_us as f64 / 1_000_000.0);
            }
        }
    }

    entry.timestamps.clear();
    entry.window_start = now;
}

/// Span between the smallest and largest timestamp, accounting for one u32
/// rollover inside the window.
fn wrapped_span_us(min: u32, max: u32) -> u64 {
    let direct = (max - min) as u64;
    if direct > u32::MAX as u64 / 2 {
        // The window straddles a rollover: the short way around is the span.
        (u32::MAX as u64 + 1) - direct
    } else {
        direct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> RateTracker {
        RateTracker::new(&QualityConfig::default())
    }

    #[test]
    fn test_steady_rate_from_firmware_clock() {
        let mut t = tracker();
        let t0 = Instant::now();

        // 100 Hz: 10 ms firmware spacing, window closes after 2 s.
        for i in 0..201u32 {
            t.observe(1, i * 10_000, t0 + Duration::from_millis(10 * i as u64));
        }

        let snap = t.snapshot(t0 + Duration::from_millis(2010));
        assert_eq!(snap.len(), 1);
        assert!((snap[0].hz - 100.0).abs() < 1.0, "hz = {}", snap[0].hz);
    }

    #[test]
    fn test_rate_ignores_local_jitter() {
        let mut t = tracker();
        let t0 = Instant::now();

        // Samples arrive in bursts (USB buffering) but carry clean firmware
        // timestamps; the estimate must follow the firmware clock.
        for i in 0..400u32 {
            let burst_arrival = t0 + Duration::from_millis((i / 50) as u64 * 250);
            t.observe(1, i * 5_000, burst_arrival);
        }
        t.observe(1, 400 * 5_000, t0 + Duration::from_millis(2100));

        let snap = t.snapshot(t0 + Duration::from_millis(2100));
        assert!((snap[0].hz - 200.0).abs() < 20.0, "hz = {}", snap[0].hz);
    }

    #[test]
    fn test_rollover_inside_window() {
        let mut t = tracker();
        let t0 = Instant::now();

        // Firmware clock wraps mid-window.
        let start = u32::MAX - 500_000;
        for i in 0..201u32 {
            t.observe(
                1,
                start.wrapping_add(i * 10_000),
                t0 + Duration::from_millis(10 * i as u64),
            );
        }

        let snap = t.snapshot(t0 + Duration::from_millis(2010));
        assert!((snap[0].hz - 100.0).abs() < 1.0, "hz = {}", snap[0].hz);
    }

    #[test]
    fn test_single_sample_falls_back_to_local_clock() {
        let mut t = tracker();
        let t0 = Instant::now();
        t.observe(1, 12345, t0);

        let snap = t.snapshot(t0 + Duration::from_secs(2));
        assert!((snap[0].hz - 0.5).abs() < 0.01, "hz = {}", snap[0].hz);
    }

    #[test]
    fn test_silence_decays_instead_of_zeroing() {
        let mut t = tracker();
        let t0 = Instant::now();
        for i in 0..201u32 {
            t.observe(1, i * 10_000, t0 + Duration::from_millis(10 * i as u64));
        }
        // Drain the one pending timestamp left after the in-observe close.
        let first = t.snapshot(t0 + Duration::from_millis(4010))[0].hz;
        assert!(first > 0.0);

        // A fully silent window: the previous estimate decays, never zeroes.
        let second = t.snapshot(t0 + Duration::from_millis(6020))[0].hz;
        assert!(second > 0.0);
        assert!((second - first * 0.5).abs() < 1e-9, "second = {second}");
    }

    #[test]
    fn test_wrapped_span() {
        assert_eq!(wrapped_span_us(0, 1000), 1000);
        assert_eq!(wrapped_span_us(u32::MAX - 99, u32::MAX), 99);
        // min/max straddle the rollover: sorted order inverts them.
        assert_eq!(wrapped_span_us(100, u32::MAX - 99), 200);
    }
}
