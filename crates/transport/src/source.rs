//! ChunkSource trait - transport abstraction
//!
//! Defines a unified interface for byte-stream sources, decoupling the
//! pipeline from concrete transports. The mock gateway, replay files and
//! the real serial port all implement it.

use std::sync::Arc;

use bytes::Bytes;
use contracts::FlowDirective;

/// Chunk delivery callback.
///
/// When the source produces bytes it hands an owned chunk through this
/// callback; ownership transfers, the source keeps no alias.
pub type ChunkCallback = Arc<dyn Fn(Bytes) + Send + Sync>;

/// Byte-stream source abstraction.
///
/// # Design Principles
///
/// 1. **Ownership transfer**: chunks move through the callback, no shared
///    buffers
/// 2. **Advisory backpressure**: [`ChunkSource::send_directive`] relays
///    pause/resume upstream; the pipeline never blocks the read loop
/// 3. **Idempotent start**: repeated `listen` calls must not spawn twice
pub trait ChunkSource: Send + Sync {
    /// Source name for logging.
    fn name(&self) -> &str;

    /// Start delivering chunks through `callback`.
    fn listen(&self, callback: ChunkCallback);

    /// Stop delivering chunks.
    fn stop(&self);

    /// Whether the source is currently delivering.
    fn is_listening(&self) -> bool;

    /// Relay a flow directive to the gateway.
    ///
    /// Default no-op for sources without a back-channel (replay files).
    fn send_directive(&self, directive: FlowDirective) {
        let _ = directive;
    }
}
