//! Worker actor: an isolated task owning the whole pipeline.
//!
//! The transport hands ownership of each raw chunk through a bounded
//! channel (a move, not a copy); the worker owns its own ring buffer,
//! extractor, decoder and tracker, and returns a batch of decoded results
//! plus a stats snapshot per chunk. Flow directives travel back on a
//! dedicated control channel. No mutable state is shared across the
//! boundary.

use std::time::Instant;

use bytes::Bytes;
use contracts::{DecodedBatch, FlowDirective, LinkCommand, LinkConfig, LinkError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::session::LinkSession;

/// Handle to a running link worker.
pub struct LinkWorkerHandle {
    chunk_tx: async_channel::Sender<Bytes>,
    command_tx: mpsc::Sender<LinkCommand>,
    batch_rx: Option<mpsc::Receiver<DecodedBatch>>,
    directive_rx: Option<mpsc::Receiver<FlowDirective>>,
    worker_handle: JoinHandle<()>,
}

/// Spawns the worker task.
pub struct LinkWorker;

impl LinkWorker {
    /// Spawn a worker with its own pipeline state.
    pub fn spawn(config: LinkConfig) -> LinkWorkerHandle {
        let (chunk_tx, chunk_rx) =
            async_channel::bounded(config.pipeline.chunk_channel_capacity);
        let (batch_tx, batch_rx) = mpsc::channel(config.pipeline.batch_channel_capacity);
        let (directive_tx, directive_rx) = mpsc::channel(8);
        let (command_tx, command_rx) = mpsc::channel(8);

        let worker_handle = tokio::spawn(async move {
            worker_loop(config, chunk_rx, batch_tx, directive_tx, command_rx).await;
        });

        LinkWorkerHandle {
            chunk_tx,
            command_tx,
            batch_rx: Some(batch_rx),
            directive_rx: Some(directive_rx),
            worker_handle,
        }
    }
}

impl LinkWorkerHandle {
    /// Hand a chunk to the worker without blocking (transport read loop).
    ///
    /// Returns `false` when the inbound channel is full or closed; the ring
    /// and flow controller inside the worker are the real backpressure, this
    /// is only the last-resort relief valve.
    pub fn try_push_chunk(&self, chunk: Bytes) -> bool {
        match self.chunk_tx.try_send(chunk) {
            Ok(()) => true,
            Err(async_channel::TrySendError::Full(_)) => {
                warn!("chunk channel full, chunk dropped");
                false
            }
            Err(async_channel::TrySendError::Closed(_)) => {
                error!("chunk channel closed unexpectedly");
                false
            }
        }
    }

    /// Clone of the inbound chunk sender, for transports that outlive the
    /// handle borrow (callback-style sources).
    pub fn chunk_sender(&self) -> async_channel::Sender<Bytes> {
        self.chunk_tx.clone()
    }

    /// Hand a chunk to the worker, waiting for channel space (replay paths).
    pub async fn push_chunk(&self, chunk: Bytes) -> Result<(), LinkError> {
        self.chunk_tx
            .send(chunk)
            .await
            .map_err(|_| LinkError::channel_closed("worker chunk channel"))
    }

    /// Send an operator command to the worker.
    pub async fn send_command(&self, command: LinkCommand) -> Result<(), LinkError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| LinkError::channel_closed("worker command channel"))
    }

    /// Take the decoded-batch receiver.
    ///
    /// Note: Can only be called once, subsequent calls return None.
    pub fn take_batches(&mut self) -> Option<mpsc::Receiver<DecodedBatch>> {
        self.batch_rx.take()
    }

    /// Take the flow-directive receiver (wired to the transport).
    ///
    /// Note: Can only be called once, subsequent calls return None.
    pub fn take_directives(&mut self) -> Option<mpsc::Receiver<FlowDirective>> {
        self.directive_rx.take()
    }

    /// Disconnect: stop accepting chunks, flush worker state, wait for the
    /// task to reset and exit.
    #[instrument(name = "link_worker_shutdown", skip(self))]
    pub async fn shutdown(self) {
        let Self {
            chunk_tx,
            command_tx,
            batch_rx,
            directive_rx,
            worker_handle,
        } = self;
        // Close every channel end we still hold so the worker cannot stay
        // parked on a send while we wait for it.
        drop(chunk_tx);
        drop(command_tx);
        drop(batch_rx);
        drop(directive_rx);
        if let Err(e) = worker_handle.await {
            error!(error = ?e, "worker task panicked");
        }
        debug!("link worker shutdown complete");
    }
}

#[instrument(name = "link_worker_loop", skip_all)]
async fn worker_loop(
    config: LinkConfig,
    chunk_rx: async_channel::Receiver<Bytes>,
    batch_tx: mpsc::Sender<DecodedBatch>,
    directive_tx: mpsc::Sender<FlowDirective>,
    mut command_rx: mpsc::Receiver<LinkCommand>,
) {
    let mut session = LinkSession::new(&config);
    if let Err(e) = session.connect() {
        error!(error = %e, "worker could not enter streaming state");
        return;
    }
    info!("link worker started");

    loop {
        tokio::select! {
            chunk = chunk_rx.recv() => {
                match chunk {
                    Ok(chunk) => {
                        let outcome = session.ingest_chunk(&chunk, Instant::now());
                        if let Some(directive) = outcome.directive {
                            if directive_tx.send(directive).await.is_err() {
                                debug!("directive receiver dropped");
                            }
                        }
                        if batch_tx.send(outcome.batch).await.is_err() {
                            info!("batch receiver dropped, worker stopping");
                            break;
                        }
                        // Frames beyond the tick budget resume before the
                        // next chunk is accepted.
                        while session.has_pending() {
                            let outcome = session.drain_pending(Instant::now());
                            if let Some(directive) = outcome.directive {
                                let _ = directive_tx.send(directive).await;
                            }
                            if batch_tx.send(outcome.batch).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(_) => break, // transport closed the channel
                }
            }
            command = command_rx.recv() => {
                match command {
                    Some(command) => {
                        debug!(?command, "worker command");
                        if let Some(directive) = session.handle_command(command) {
                            let _ = directive_tx.send(directive).await;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    // Cancellation: reset every stateful cache before the next connect.
    session.disconnect();
    info!("link worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{LinkEvent, SensorRecord, SyncSampleFrame};
    use decoder::{encode_sync_frame, wrap_wire};

    fn sync_wire(frame_number: u32, ids: &[u8]) -> Bytes {
        let frame = SyncSampleFrame {
            frame_number,
            timestamp_us: frame_number.wrapping_mul(5000),
            sensor_count: ids.len() as u8,
            has_checksum: true,
            recovered: false,
            sensors: ids
                .iter()
                .map(|&id| SensorRecord {
                    sensor_id: id,
                    quat: [1.0, 0.0, 0.0, 0.0],
                    accel: [0.0; 3],
                    gyro: [0.0; 3],
                })
                .collect(),
        };
        Bytes::from(wrap_wire(&encode_sync_frame(&frame)))
    }

    #[tokio::test]
    async fn test_worker_decodes_chunks_in_order() {
        let mut handle = LinkWorker::spawn(LinkConfig::default());
        let mut batches = handle.take_batches().unwrap();

        for i in 1..=3u32 {
            handle.push_chunk(sync_wire(i, &[1, 2])).await.unwrap();
        }

        let mut numbers = Vec::new();
        while numbers.len() < 3 {
            let batch = batches.recv().await.expect("worker alive");
            for event in batch.events {
                if let LinkEvent::SyncFrame { frame, .. } = event {
                    numbers.push(frame.frame_number);
                }
            }
        }
        assert_eq!(numbers, vec![1, 2, 3]);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_take_receivers_once() {
        let mut handle = LinkWorker::spawn(LinkConfig::default());
        assert!(handle.take_batches().is_some());
        assert!(handle.take_batches().is_none());
        assert!(handle.take_directives().is_some());
        assert!(handle.take_directives().is_none());
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_operator_pause_reaches_directive_channel() {
        let mut handle = LinkWorker::spawn(LinkConfig::default());
        let mut directives = handle.take_directives().unwrap();

        handle.send_command(LinkCommand::PauseStream).await.unwrap();
        assert_eq!(directives.recv().await, Some(FlowDirective::Pause));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_resets_cleanly() {
        let handle = LinkWorker::spawn(LinkConfig::default());
        handle.push_chunk(sync_wire(1, &[1])).await.unwrap();
        handle.shutdown().await; // must not hang or panic
    }
}
