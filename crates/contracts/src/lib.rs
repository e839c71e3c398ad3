//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-crate data structures.
//! All business crates can only depend on this crate, reverse dependencies
//! are prohibited.
//!
//! ## Time Model
//! - Firmware timestamps are microseconds since node boot (`u32`, wraps)
//! - Frame numbers are a monotonic gateway counter (`u32`, wraps)
//! - Local time is `std::time::Instant`, injected by callers so the parsing
//!   path stays deterministic under test

mod command;
mod config;
mod error;
mod event;
mod snapshot;
mod wire;

pub use command::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use snapshot::*;
pub use wire::*;
