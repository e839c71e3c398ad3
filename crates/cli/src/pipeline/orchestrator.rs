//! Pipeline orchestrator - wires a chunk source to the link worker.
//!
//! Builds the transport selected by configuration, spawns the worker task,
//! forwards chunks in and flow directives back, and consumes decoded
//! batches until the frame limit, duration, or a shutdown signal ends the
//! run.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{LinkConfig, LinkEvent, TransportKind};
use observability::{record_batch, record_directive, LinkMetricsAggregator};
use pipeline::LinkWorker;
use tracing::{info, warn};
use transport::{ChunkSource, MockGatewaySource, ReplaySource};

use super::RunStats;

/// Run configuration
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// The link configuration
    pub link: LinkConfig,

    /// Maximum number of sync frames to deliver (None = unlimited)
    pub max_frames: Option<u64>,

    /// Run duration (None = until interrupted)
    pub duration: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main orchestrator
pub struct Orchestrator {
    config: RunConfig,
}

impl Orchestrator {
    /// Create an orchestrator with the given configuration
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline to completion
    pub async fn run(self) -> Result<RunStats> {
        let started = Instant::now();

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!(port, "Metrics endpoint available");
        }

        let source = build_source(&self.config.link)?;
        info!(source = source.name(), "Transport ready");

        // Spawn the worker and wire the source into its chunk channel.
        let mut worker = LinkWorker::spawn(self.config.link.clone());
        let mut batches = worker
            .take_batches()
            .context("batch receiver already taken")?;
        let mut directives = worker
            .take_directives()
            .context("directive receiver already taken")?;

        source.listen(worker_chunk_sink(&worker));

        // Relay flow directives back to the gateway.
        let directive_source = Arc::clone(&source);
        let directive_task = tokio::spawn(async move {
            while let Some(directive) = directives.recv().await {
                record_directive(directive);
                info!(?directive, "flow directive relayed");
                directive_source.send_directive(directive);
            }
        });

        // Consume decoded batches until a stop condition fires.
        let mut aggregator = LinkMetricsAggregator::new();
        let mut frames: u64 = 0;
        let mut samples: u64 = 0;
        let max_frames = self.config.max_frames.unwrap_or(u64::MAX);
        let deadline = self.config.duration.map(|d| started + d);

        info!("Link pipeline running (ctrl-c to stop)");
        loop {
            let batch = tokio::select! {
                maybe = batches.recv() => match maybe {
                    Some(batch) => batch,
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupt received, shutting down");
                    break;
                }
                _ = sleep_until_opt(deadline) => {
                    info!("Run duration reached");
                    break;
                }
            };

            record_batch(&batch);
            aggregator.update_batch(&batch);

            for event in &batch.events {
                if let LinkEvent::SyncFrame { frame, .. } = event {
                    frames += 1;
                    samples += frame.sensors.len() as u64;
                }
            }

            if frames >= max_frames {
                info!(frames, "Frame limit reached");
                break;
            }
        }

        // Teardown: stop the source, release the batch receiver so the
        // worker can never park on a full channel, then join it.
        source.stop();
        drop(batches);
        let loss = aggregator.last_loss;
        worker.shutdown().await;
        directive_task.abort();

        if loss.loss_percent() > 1.0 {
            warn!(loss_percent = loss.loss_percent(), "Link quality degraded this run");
        }

        Ok(RunStats {
            frames_delivered: frames,
            samples_delivered: samples,
            duration: started.elapsed(),
            loss,
            link_metrics: aggregator,
        })
    }
}

/// Build the configured chunk source.
fn build_source(config: &LinkConfig) -> Result<Arc<dyn ChunkSource>> {
    match config.transport.kind {
        TransportKind::Mock => Ok(Arc::new(MockGatewaySource::new(
            config.transport.mock.clone(),
        ))),
        TransportKind::Replay => Ok(Arc::new(ReplaySource::new(&config.transport.replay))),
        #[cfg(feature = "serial")]
        TransportKind::Serial => {
            let source = transport::SerialSource::open(config.transport.serial.clone())
                .with_context(|| {
                    format!("Failed to open serial port {}", config.transport.serial.port)
                })?;
            Ok(Arc::new(source))
        }
        #[cfg(not(feature = "serial"))]
        TransportKind::Serial => anyhow::bail!(
            "serial transport requested but this binary was built without the `serial` feature"
        ),
    }
}

/// Chunk callback that moves chunks into the worker without blocking the
/// source's read loop.
fn worker_chunk_sink(worker: &pipeline::LinkWorkerHandle) -> transport::ChunkCallback {
    let chunk_tx = worker.chunk_sender();
    Arc::new(move |chunk| {
        match chunk_tx.try_send(chunk) {
            Ok(()) => {}
            Err(async_channel::TrySendError::Full(_)) => {
                // The worker is saturated; the flow controller has already
                // asked the gateway to pause. Dropping here is the last
                // resort, visible in the worker's overflow counters.
                warn!("chunk channel full, chunk dropped at transport edge");
            }
            Err(async_channel::TrySendError::Closed(_)) => {
                warn!("chunk channel closed");
            }
        }
    })
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending::<()>().await,
    }
}
