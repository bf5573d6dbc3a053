//! # Shared Types Crate
//!
//! Value types shared by every crate of the DOP worker: the event model,
//! the error value and its code catalogue, the pipeline scratch memory,
//! session rows and the provider lifecycle.
//!
//! ## Design Principles
//!
//! - **Single Error Value**: every stage reports through [`DopError`]; the
//!   `notifiable` flag decides between an `error` event and a log line.
//! - **Opaque Memory**: [`PipelineMemory`] stores whatever the processors
//!   agree on; the worker only moves keys around.
//! - **Uniform Lifecycle**: anything configured by the worker implements
//!   [`Provider`].

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod codes;
pub mod config;
pub mod errors;
pub mod event;
pub mod memory;
pub mod provider;
pub mod session;

pub use codes::ErrorCode;
pub use config::{config_to_dict, ConfigMap};
pub use errors::{DopError, DopResult, ErrorKind};
pub use event::{Event, EventHeader, ERROR_EVENT, NOT_AVAILABLE, UNAUTHENTICATED_EVENTS};
pub use memory::PipelineMemory;
pub use provider::{open_with_retry, Provider, RetryPolicy};
pub use session::{EncryptedSession, Session, SessionWithMle, User, MAX_SESSION_AGE_SECS};
