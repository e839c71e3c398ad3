//! Replay source - feeds a recorded byte stream back into the pipeline.
//!
//! The recording is the raw serial capture, noise and all, so replay
//! exercises the exact resynchronization paths a live link does.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use contracts::ReplayConfig;
use tracing::{debug, error, info};

use crate::source::{ChunkCallback, ChunkSource};

/// File-backed chunk source.
pub struct ReplaySource {
    path: PathBuf,
    chunk_bytes: usize,
    pace: Duration,
    listening: Arc<AtomicBool>,
}

impl ReplaySource {
    /// Create a replay source from configuration.
    pub fn new(config: &ReplayConfig) -> Self {
        Self {
            path: PathBuf::from(&config.path),
            chunk_bytes: config.chunk_bytes.max(1),
            pace: Duration::from_millis(config.pace_ms),
            listening: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl ChunkSource for ReplaySource {
    fn name(&self) -> &str {
        "replay"
    }

    fn listen(&self, callback: ChunkCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let path = self.path.clone();
        let chunk_bytes = self.chunk_bytes;
        let pace = self.pace;
        let listening = self.listening.clone();

        thread::spawn(move || {
            let mut file = match File::open(&path) {
                Ok(file) => file,
                Err(e) => {
                    error!(path = %path.display(), error = %e, "replay file open failed");
                    listening.store(false, Ordering::SeqCst);
                    return;
                }
            };

            info!(path = %path.display(), chunk_bytes, "replay started");
            let mut buf = vec![0u8; chunk_bytes];
            let mut total = 0u64;

            while listening.load(Ordering::Relaxed) {
                match file.read(&mut buf) {
                    Ok(0) => break, // end of recording
                    Ok(n) => {
                        total += n as u64;
                        callback(Bytes::copy_from_slice(&buf[..n]));
                        if !pace.is_zero() {
                            thread::sleep(pace);
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "replay read failed");
                        break;
                    }
                }
            }

            debug!(total, "replay finished");
            listening.store(false, Ordering::SeqCst);
        });
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}
