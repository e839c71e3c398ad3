//! Run statistics and end-of-run reporting.

use std::time::Duration;

use contracts::LossSnapshot;
use observability::LinkMetricsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Sync frames delivered to the consumer
    pub frames_delivered: u64,

    /// Individual sensor samples delivered
    pub samples_delivered: u64,

    /// Total duration of the run
    pub duration: Duration,

    /// Final loss counters
    pub loss: LossSnapshot,

    /// Link metrics aggregator
    pub link_metrics: LinkMetricsAggregator,
}

impl RunStats {
    /// Delivered sync frames per second.
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.frames_delivered as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!();
        println!("================ Link Run Summary ================");
        println!("Duration:          {:.2}s", self.duration.as_secs_f64());
        println!("Frames delivered:  {}", self.frames_delivered);
        println!("Sensor samples:    {}", self.samples_delivered);
        println!("Frame rate:        {:.1} Hz", self.fps());
        println!("Loss:              {:.3}%", self.loss.loss_percent());
        println!("--------------------------------------------------");
        println!("Recovered frames:  {}", self.loss.recovered_frames);
        println!("Sequence gaps:     {}", self.loss.frame_gap_drops);
        println!("Checksum rejects:  {}", self.loss.checksum_rejects);
        println!("Corrupt drops:     {}", self.loss.corrupt_frame_drops);
        println!("Unparsable frames: {}", self.loss.unparsable_frames);
        println!("Resync skips:      {}", self.loss.resync_skips);
        println!("Window discards:   {}", self.loss.resync_window_discards);
        println!(
            "Ring overflow:     {} events / {} bytes",
            self.loss.ring_overflow_events, self.loss.ring_overflow_bytes
        );
        println!("Pending drops:     {}", self.loss.pending_drops);
        println!(
            "Slot rejects:      {} quat / {} flag / {} untrusted",
            self.loss.slot_quat_rejects,
            self.loss.slot_invalid_flag_rejects,
            self.loss.slot_untrusted_rejects
        );
        println!("Firmware restarts: {}", self.loss.firmware_restarts);
        println!("==================================================");
        println!();
        println!("{}", self.link_metrics.summary());
    }
}
