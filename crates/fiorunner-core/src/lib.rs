//! fiorunner core: runtime-agnostic job types, stats framing, snapshot
//! decoding and the metrics model shared by the agent and tests.
//!
//! Nothing here spawns processes or touches the network. The pieces that
//! hold shared state (`stats::StatsStore`) use `std::sync` locks only and
//! never block on I/O while a lock is held.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `FioRunnerError`/`Result` so a
//! malformed report from `fio` can never take the agent down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod job;
pub mod stats;

/// Shared result type.
pub use error::{FioRunnerError, Result};
