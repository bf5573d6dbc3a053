//! # DOP Worker Runtime
//!
//! Library side of the `dop-worker` binary: configuration, the processor
//! environment, the built-in processors, start-up wiring and the
//! dispatcher. Exposed for embedding and testing.
//!
//! ## Module Layout
//!
//! - `container/` - JSON configuration and the processor environment
//! - `adapters/` - Resource-manager ports and their in-process adapters
//! - `processors/` - Built-in main and finally processors
//! - `registry/` - Name to processor factory table
//! - `wiring/` - Provider catalogue, macro resolution, pipeline table
//! - `handlers/` - Input validation and the dispatcher
//! - `runtime` - Start-up, receive loop, shutdown
//!
//! ## Event Flow
//!
//! ```text
//! InputProvider ──→ validate ──→ PipelineTable[label]
//!                                   │
//!                     ┌─────────────┴─────────────┐
//!                     ▼                           ▼
//!            main (db + blk tx)            finally (always)
//!                     └─────────────┬─────────────┘
//!                                   ▼
//!                     notify ──→ OutputProvider(destination)
//! ```

#![allow(clippy::type_complexity)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod container;
pub mod handlers;
pub mod logger;
pub mod processors;
pub mod registry;
pub mod runtime;
pub mod wiring;

pub use container::{ProcessorEnv, WorkerConfig};
pub use handlers::{DispatchReport, Dispatcher, Outcome};
pub use logger::WorkerLog;
pub use registry::ProcessorRegistry;
pub use runtime::{WorkerBuilder, WorkerRuntime};
