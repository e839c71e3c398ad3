//! Link metric recording and aggregation.
//!
//! Records counters/gauges/histograms from decoded batches and quality
//! snapshots, and keeps an in-memory aggregator for end-of-run summaries.

use contracts::{DecodedBatch, FlowDirective, LinkEvent, LossSnapshot, QualitySnapshot};
use metrics::{counter, gauge, histogram};

/// Record metrics for one decoded batch.
///
/// Call once per batch received from the worker.
pub fn record_batch(batch: &DecodedBatch) {
    let mut sync_frames = 0u64;
    let mut samples = 0u64;
    for event in &batch.events {
        if let LinkEvent::SyncFrame { frame, .. } = event {
            sync_frames += 1;
            samples += frame.sensors.len() as u64;
            if frame.recovered {
                counter!("imu_link_recovered_frames_total").increment(1);
            }
        }
    }

    if sync_frames > 0 {
        counter!("imu_link_frames_total").increment(sync_frames);
        counter!("imu_link_samples_total").increment(samples);
    }

    gauge!("imu_link_loss_percent").set(batch.loss.loss_percent());
}

/// Record metrics from a quality snapshot.
pub fn record_quality(snapshot: &QualitySnapshot) {
    gauge!("imu_link_synced_hz").set(snapshot.synced_hz);
    gauge!("imu_link_partial_hz").set(snapshot.partial_hz);
    gauge!("imu_link_expected_sensors").set(snapshot.expected_sensor_ids.len() as f64);

    for sensor in &snapshot.sensors {
        gauge!(
            "imu_link_sensor_hz",
            "sensor_id" => sensor.sensor_id.to_string()
        )
        .set(sensor.hz);

        histogram!(
            "imu_link_sensor_hz_hist",
            "sensor_id" => sensor.sensor_id.to_string()
        )
        .record(sensor.hz);
    }

    let loss = &snapshot.loss;
    gauge!("imu_link_delivered_frames").set(loss.delivered_frames as f64);
    gauge!("imu_link_frame_gap_drops").set(loss.frame_gap_drops as f64);
    gauge!("imu_link_ring_overflow_bytes").set(loss.ring_overflow_bytes as f64);
}

/// Record a flow directive.
pub fn record_directive(directive: FlowDirective) {
    let kind = match directive {
        FlowDirective::Pause => "pause",
        FlowDirective::Resume => "resume",
    };
    counter!("imu_link_directives_total", "kind" => kind.to_string()).increment(1);
}

/// In-memory aggregator for end-of-run summaries.
#[derive(Debug, Clone, Default)]
pub struct LinkMetricsAggregator {
    /// Batches observed
    pub total_batches: u64,

    /// Sync frames delivered
    pub total_frames: u64,

    /// Per-sensor samples delivered
    pub total_samples: u64,

    /// Recovered frames seen
    pub total_recovered: u64,

    /// Pause directives observed
    pub pause_directives: u64,

    /// Resume directives observed
    pub resume_directives: u64,

    /// Per-sensor Hz statistics
    pub sensor_hz_stats: RunningStats,

    /// Synced-rate statistics
    pub synced_hz_stats: RunningStats,

    /// Latest loss snapshot
    pub last_loss: LossSnapshot,
}

impl LinkMetricsAggregator {
    /// Create a new aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one decoded batch into the aggregate.
    pub fn update_batch(&mut self, batch: &DecodedBatch) {
        self.total_batches += 1;
        for event in &batch.events {
            if let LinkEvent::SyncFrame { frame, .. } = event {
                self.total_frames += 1;
                self.total_samples += frame.sensors.len() as u64;
                if frame.recovered {
                    self.total_recovered += 1;
                }
            }
        }
        self.last_loss = batch.loss;
    }

    /// Fold one quality snapshot into the aggregate.
    pub fn update_quality(&mut self, snapshot: &QualitySnapshot) {
        for sensor in &snapshot.sensors {
            self.sensor_hz_stats.push(sensor.hz);
        }
        self.synced_hz_stats.push(snapshot.synced_hz);
        self.last_loss = snapshot.loss;
    }

    /// Count one directive.
    pub fn update_directive(&mut self, directive: FlowDirective) {
        match directive {
            FlowDirective::Pause => self.pause_directives += 1,
            FlowDirective::Resume => self.resume_directives += 1,
        }
    }

    /// Produce a summary report.
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_batches: self.total_batches,
            total_frames: self.total_frames,
            total_samples: self.total_samples,
            total_recovered: self.total_recovered,
            pause_directives: self.pause_directives,
            resume_directives: self.resume_directives,
            loss_percent: self.last_loss.loss_percent(),
            sensor_hz: StatsSummary::from(&self.sensor_hz_stats),
            synced_hz: StatsSummary::from(&self.synced_hz_stats),
            loss: self.last_loss,
        }
    }

    /// Reset the aggregate.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Aggregated metrics summary.
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_batches: u64,
    pub total_frames: u64,
    pub total_samples: u64,
    pub total_recovered: u64,
    pub pause_directives: u64,
    pub resume_directives: u64,
    pub loss_percent: f64,
    pub sensor_hz: StatsSummary,
    pub synced_hz: StatsSummary,
    pub loss: LossSnapshot,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Link Metrics Summary ===")?;
        writeln!(f, "Frames delivered: {}", self.total_frames)?;
        writeln!(f, "Sensor samples: {}", self.total_samples)?;
        writeln!(
            f,
            "Recovered frames: {} | Loss: {:.2}%",
            self.total_recovered, self.loss_percent
        )?;
        writeln!(
            f,
            "Flow directives: {} pause / {} resume",
            self.pause_directives, self.resume_directives
        )?;
        writeln!(f, "Per-sensor Hz: {}", self.sensor_hz)?;
        writeln!(f, "Synced Hz: {}", self.synced_hz)?;
        writeln!(
            f,
            "Gaps: {} | Checksum rejects: {} | Resync discards: {} | Overflow bytes: {}",
            self.loss.frame_gap_drops,
            self.loss.checksum_rejects,
            self.loss.resync_window_discards,
            self.loss.ring_overflow_bytes
        )?;
        Ok(())
    }
}

/// Statistics summary.
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm).
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a new value.
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// Sample count.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Variance.
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// Standard deviation.
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Minimum.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Maximum.
    pub fn max(&self) -> f64 {
        self.max
    }
}
