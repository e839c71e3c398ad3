//! # Pipeline
//!
//! Assembly of the link pipeline: one [`LinkSession`] owns the ring buffer,
//! frame extractor, sample decoder and quality tracker, and drives them
//! under a per-tick budget; [`LinkWorker`] wraps a session in an isolated
//! tokio task with message-passing channels (chunk ownership moves in,
//! decoded batches move out, flow directives flow back).
//!
//! Data flows one way (bytes → frames → samples → quality metrics); the
//! only thing flowing backwards is the pause/resume control channel.

mod session;
mod worker;

pub use session::{ChunkOutcome, LinkSession};
pub use worker::{LinkWorker, LinkWorkerHandle};
