//! Top-level facade crate for fiorunner.
//!
//! Re-exports the core model (framer, snapshots, store, errors) and the agent
//! library so users can depend on a single crate.

pub mod core {
    pub use fiorunner_core::*;
}

pub mod agent {
    pub use fiorunner_agent::*;
}
