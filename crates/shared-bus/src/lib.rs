//! # Shared Bus - Worker Transports
//!
//! Input and output transport contracts plus the in-process transports the
//! worker ships with.
//!
//! ## Message Flow
//!
//! ```text
//! ┌──────────────┐   recv()    ┌──────────────┐  write_to_endpoint()  ┌──────────────┐
//! │ Input        │ ──────────→ │  Dispatcher  │ ────────────────────→ │ Output       │
//! │ (stdin/chan) │             │              │  (payload, dest)      │ (stdout/bus) │
//! └──────────────┘             └──────────────┘                       └──────┬───────┘
//!                                                                            │ subscribe(dest)
//!                                                                            ▼
//!                                                                      clients
//! ```
//!
//! ## Contracts
//!
//! - [`InputProvider`] is async: the worker awaits the next message.
//! - [`OutputProvider`] is sync: Notify writes from inside the dispatcher.
//! - Both are [`shared_types::Provider`]s and carry a retry policy read from
//!   `retrycount`/`rc` and `retrydelay`/`rd`.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod errors;
pub mod input;
pub mod message;
pub mod output;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use errors::TransportError;
pub use input::{ChannelInput, InputProvider, StdinInput};
pub use message::{InboundMessage, OutboundMessage};
pub use output::{MemoryOutput, OutputProvider, StdoutOutput};
pub use publisher::BroadcastOutput;
pub use subscriber::Subscription;

/// Maximum messages to buffer per channel before backpressure.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
