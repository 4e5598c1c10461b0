//! fio runner agent library entry.
//!
//! Wires config, job admission, the fio runner and the HTTP surface into
//! one router. Consumed by the binary (`main.rs`) and by integration tests.

pub mod api;
pub mod app_state;
pub mod config;
pub mod job;
pub mod obs;
pub mod ops;
pub mod router;
