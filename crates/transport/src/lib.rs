//! # Transport
//!
//! Chunk sources feeding the link pipeline: a synthetic mock gateway, a
//! recorded-stream replay, and (behind the `serial` feature) the real USB
//! serial port. All sources deliver owned byte chunks through a callback
//! and accept advisory flow directives back.

mod mock;
mod replay;
#[cfg(feature = "serial")]
mod serial;
mod source;

pub use mock::MockGatewaySource;
pub use replay::ReplaySource;
#[cfg(feature = "serial")]
pub use serial::SerialSource;
pub use source::{ChunkCallback, ChunkSource};
