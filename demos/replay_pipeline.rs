//! Replay Pipeline Demo
//!
//! Writes a short synthetic capture to disk (valid frames interleaved with
//! log-line noise and one corrupted header), then replays it through the
//! pipeline and prints the recovered stream's quality report.
//!
//! Run with: cargo run --bin replay_pipeline

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use contracts::{LinkConfig, LinkEvent, SensorRecord, SyncSampleFrame, TransportKind};
use decoder::{crc8, encode_sync_frame, wrap_wire};
use pipeline::LinkWorker;
use transport::{ChunkSource, ReplaySource};

fn capture_frame(frame_number: u32, corrupt_header: bool) -> Vec<u8> {
    let sensors: Vec<SensorRecord> = (1..=3u8)
        .map(|id| SensorRecord {
            sensor_id: id,
            quat: [1.0, 0.0, 0.0, 0.0],
            accel: [0.0, 0.0, 9.81],
            gyro: [0.0; 3],
        })
        .collect();

    let frame = SyncSampleFrame {
        frame_number,
        timestamp_us: frame_number.wrapping_mul(5000),
        sensor_count: 3,
        has_checksum: false,
        recovered: false,
        sensors,
    };

    let mut bytes = encode_sync_frame(&frame);
    if corrupt_header {
        bytes[9] = 255;
    }
    bytes.push(crc8(&bytes));
    wrap_wire(&bytes)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("Starting Replay Pipeline Demo");

    // ==== Stage 1: Write a synthetic capture ====
    let path = std::env::temp_dir().join("imu_link_demo_capture.bin");
    {
        let mut file = std::fs::File::create(&path)?;
        for i in 1..=500u32 {
            file.write_all(&capture_frame(i, i % 100 == 0))?;
            if i % 25 == 0 {
                file.write_all(b"[GW] node 2 battery 3.91V\r\n")?;
            }
        }
    }
    tracing::info!(path = %path.display(), "Capture written");

    // ==== Stage 2: Pipeline with a replay transport ====
    let mut config = LinkConfig::default();
    config.transport.kind = TransportKind::Replay;
    config.transport.replay.path = path.to_string_lossy().into_owned();

    let mut worker = LinkWorker::spawn(config.clone());
    let mut batches = worker.take_batches().expect("fresh worker");

    let source = Arc::new(ReplaySource::new(&config.transport.replay));
    let chunk_tx = worker.chunk_sender();
    source.listen(Arc::new(move |chunk| {
        let _ = chunk_tx.try_send(chunk);
    }));

    // ==== Stage 3: Collect the recovered stream ====
    let mut delivered = 0u64;
    let mut recovered = 0u64;
    let mut last_loss = contracts::LossSnapshot::default();

    let collect = async {
        while delivered < 500 {
            let Some(batch) = batches.recv().await else { break };
            for event in &batch.events {
                if let LinkEvent::SyncFrame { frame, .. } = event {
                    delivered += 1;
                    if frame.recovered {
                        recovered += 1;
                    }
                }
            }
            last_loss = batch.loss;
        }
    };
    let _ = tokio::time::timeout(Duration::from_secs(10), collect).await;

    source.stop();
    drop(batches);
    worker.shutdown().await;

    println!("frames delivered:  {delivered}");
    println!("recovered headers: {recovered}");
    println!("resync skips:      {}", last_loss.resync_skips);
    println!("loss:              {:.3}%", last_loss.loss_percent());

    std::fs::remove_file(&path).ok();
    Ok(())
}
