//! # Integration Tests
//!
//! Worker-level scenarios. Every test starts a full [`worker_runtime::WorkerRuntime`]
//! from a configuration document; nothing is stubbed below the transports.

pub mod dispatcher_flows;
pub mod fixtures;
pub mod macro_resolution;
pub mod mle_fanout;
