//! In-process metrics for the agent itself, rendered next to the fio
//! projection by the `/metrics` handler.

pub mod metrics;
