//! Mock Pipeline Demo
//!
//! Runs the full link pipeline against the built-in mock gateway, including
//! the documented header-corruption fault, without any hardware.
//!
//! Run with: cargo run --bin mock_pipeline

use std::sync::Arc;
use std::time::Duration;

use contracts::{LinkConfig, LinkEvent, MockGatewayConfig};
use observability::LinkMetricsAggregator;
use pipeline::LinkWorker;
use transport::{ChunkSource, MockGatewaySource};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("Starting Mock Pipeline Demo");

    // ==== Stage 1: Use default config or load from file ====
    let config = if let Some(path) = std::env::args().nth(1) {
        tracing::info!(path = %path, "Loading link config");
        config_loader::ConfigLoader::load_from_path(std::path::Path::new(&path))?
    } else {
        LinkConfig::default()
    };

    // ==== Stage 2: Spawn the worker ====
    let mut worker = LinkWorker::spawn(config);
    let mut batches = worker.take_batches().expect("fresh worker");
    let mut directives = worker.take_directives().expect("fresh worker");

    // ==== Stage 3: Start the mock gateway ====
    let source = Arc::new(MockGatewaySource::new(MockGatewayConfig {
        sensor_count: 6,
        rate_hz: 200.0,
        corrupt_every: 50, // reproduce the header fault every 50th frame
        ..Default::default()
    }));

    let chunk_tx = worker.chunk_sender();
    source.listen(Arc::new(move |chunk| {
        let _ = chunk_tx.try_send(chunk);
    }));

    // Relay flow directives back to the source.
    let directive_source = Arc::clone(&source);
    tokio::spawn(async move {
        while let Some(directive) = directives.recv().await {
            tracing::info!(?directive, "flow directive");
            directive_source.send_directive(directive);
        }
    });

    // ==== Stage 4: Consume decoded events ====
    let target_frames = 1000u64;
    tracing::info!(target_frames, "Pipeline running");

    let mut aggregator = LinkMetricsAggregator::new();
    let mut frames = 0u64;

    let deadline = tokio::time::sleep(Duration::from_secs(30));
    tokio::pin!(deadline);

    while frames < target_frames {
        tokio::select! {
            maybe = batches.recv() => {
                let Some(batch) = maybe else { break };
                aggregator.update_batch(&batch);
                for event in &batch.events {
                    if let LinkEvent::SyncFrame { frame, completeness } = event {
                        frames += 1;
                        if frames % 200 == 0 {
                            tracing::info!(
                                frames,
                                sensors = frame.sensors.len(),
                                ?completeness,
                                recovered = frame.recovered,
                                loss_percent = batch.loss.loss_percent(),
                                "progress"
                            );
                        }
                    }
                }
            }
            _ = &mut deadline => {
                tracing::warn!("deadline reached before target frames");
                break;
            }
        }
    }

    // ==== Stage 5: Teardown and summary ====
    source.stop();
    drop(batches);
    worker.shutdown().await;

    println!("{}", aggregator.summary());
    Ok(())
}
