//! USB serial chunk source (feature `serial`).
//!
//! Reads raw chunks from the gateway's CDC serial port and writes flow
//! directives back as single-line JSON commands, the format the gateway's
//! command handler consumes.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use contracts::{FlowDirective, LinkCommand, LinkError, SerialConfig};
use tracing::{debug, error, info, warn};

use crate::source::{ChunkCallback, ChunkSource};

type SharedPort = Arc<Mutex<Box<dyn serialport::SerialPort>>>;

/// Serial-port chunk source.
pub struct SerialSource {
    config: SerialConfig,
    port: SharedPort,
    listening: Arc<AtomicBool>,
}

impl SerialSource {
    /// Open the configured port.
    pub fn open(config: SerialConfig) -> Result<Self, LinkError> {
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|e| LinkError::transport(&config.port, e.to_string()))?;

        info!(port = %config.port, baud = config.baud_rate, "serial port open");
        Ok(Self {
            config,
            port: Arc::new(Mutex::new(port)),
            listening: Arc::new(AtomicBool::new(false)),
        })
    }
}

impl ChunkSource for SerialSource {
    fn name(&self) -> &str {
        &self.config.port
    }

    fn listen(&self, callback: ChunkCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let reader = match self.port.lock() {
            Ok(port) => match port.try_clone() {
                Ok(clone) => clone,
                Err(e) => {
                    error!(error = %e, "serial clone failed");
                    self.listening.store(false, Ordering::SeqCst);
                    return;
                }
            },
            Err(_) => {
                error!("serial port mutex poisoned");
                self.listening.store(false, Ordering::SeqCst);
                return;
            }
        };

        let listening = self.listening.clone();
        let chunk_bytes = self.config.chunk_bytes.max(64);
        let port_name = self.config.port.clone();

        thread::spawn(move || {
            let mut reader = reader;
            let mut buf = vec![0u8; chunk_bytes];
            debug!(port = %port_name, "serial read loop started");

            while listening.load(Ordering::Relaxed) {
                match reader.read(&mut buf) {
                    Ok(0) => {}
                    Ok(n) => callback(Bytes::copy_from_slice(&buf[..n])),
                    Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
                    Err(e) => {
                        // Disconnect surfaces as a status transition, not an
                        // exception out of the parsing path.
                        error!(port = %port_name, error = %e, "serial read failed, stopping");
                        break;
                    }
                }
            }

            listening.store(false, Ordering::SeqCst);
            debug!(port = %port_name, "serial read loop stopped");
        });
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }

    fn send_directive(&self, directive: FlowDirective) {
        let line = LinkCommand::from(directive).to_json_line();
        match self.port.lock() {
            Ok(mut port) => {
                if let Err(e) = port.write_all(line.as_bytes()) {
                    warn!(error = %e, "flow directive write failed");
                }
            }
            Err(_) => warn!("serial port mutex poisoned, directive dropped"),
        }
    }
}
