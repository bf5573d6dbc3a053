//! # Processors
//!
//! A processor is one stage of a pipeline. Two kinds exist:
//!
//! | Kind | Called with | Runs |
//! |------|-------------|------|
//! | [`Processor`] | `(event, env)` | in `main`, inside the transaction |
//! | [`FinallyProcessor`] | `(stacks, providers)` | in `finally`, always after `main` |
//!
//! ## Built-ins
//!
//! | Name | Stage |
//! |------|-------|
//! | `authentication_check` | main |
//! | `update_session` | main |
//! | `start_session` | main |
//! | `client_ready` | main |
//! | `cipher_suite_selection` | main |
//! | `find_sessions_mle` | main |
//! | `event_multiplication_mle` | finally |
//! | `event_type_to_session` | finally |
//!
//! Replies of main processors are pushed on the events stack keyed by the
//! event label; a finally processor re-keys them by session.

pub mod authentication_check;
pub mod cipher_suite_selection;
pub mod client_ready;
pub mod event_multiplication_mle;
pub mod event_type_to_session;
pub mod find_sessions_mle;
pub mod start_session;
pub mod update_session;

pub use authentication_check::AuthenticationCheck;
pub use cipher_suite_selection::CipherSuiteSelection;
pub use client_ready::ClientReady;
pub use event_multiplication_mle::EventMultiplicationMle;
pub use event_type_to_session::EventTypeToSession;
pub use find_sessions_mle::FindSessionsMle;
pub use start_session::StartSession;
pub use update_session::UpdateSession;

use crate::container::{PipelineStacks, ProcessorEnv, Providers};
use serde_json::{Map, Value};
use shared_types::{DopResult, Event, EventHeader, Provider};
use std::sync::Arc;

/// Main-stage processor.
pub trait Processor: Provider {
    /// Registry name.
    fn name(&self) -> &str;

    /// Handle one event. An error stops the main pipeline and rolls back.
    fn handle_event(&self, event: &Event, env: &mut ProcessorEnv) -> DopResult<()>;
}

/// Finally-stage processor.
pub trait FinallyProcessor: Provider {
    /// Registry name.
    fn name(&self) -> &str;

    /// Rework the stacks after the main pipeline, whatever its outcome.
    fn handle_pipeline_stack(
        &self,
        stacks: &mut PipelineStacks,
        providers: &Providers,
    ) -> DopResult<()>;
}

/// Stage a processor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// `main` list.
    Main,
    /// `finally` list.
    Finally,
}

/// A loaded processor instance. Clones share the instance.
#[derive(Clone)]
pub enum ProcessorHandle {
    /// Main-stage instance.
    Main(Arc<dyn Processor>),
    /// Finally-stage instance.
    Finally(Arc<dyn FinallyProcessor>),
}

impl ProcessorHandle {
    /// Registry name of the instance.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Main(p) => p.name(),
            Self::Finally(p) => p.name(),
        }
    }

    /// Stage of the instance.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::Main(_) => Stage::Main,
            Self::Finally(_) => Stage::Finally,
        }
    }

    /// Whether both handles point at the same instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }

    /// Address of the instance, stable for its lifetime.
    #[must_use]
    pub fn addr(&self) -> *const () {
        match self {
            Self::Main(p) => Arc::as_ptr(p).cast::<()>(),
            Self::Finally(p) => Arc::as_ptr(p).cast::<()>(),
        }
    }

    /// `init` of the instance.
    pub fn init(&self, config: &str) -> DopResult<()> {
        match self {
            Self::Main(p) => p.init(config),
            Self::Finally(p) => p.init(config),
        }
    }

    /// `open` of the instance.
    pub fn open(&self) -> DopResult<()> {
        match self {
            Self::Main(p) => p.open(),
            Self::Finally(p) => p.open(),
        }
    }

    /// `close` of the instance.
    pub fn close(&self) -> DopResult<()> {
        match self {
            Self::Main(p) => p.close(),
            Self::Finally(p) => p.close(),
        }
    }
}

impl std::fmt::Debug for ProcessorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorHandle")
            .field("name", &self.name())
            .field("stage", &self.stage())
            .field("addr", &self.addr())
            .finish()
    }
}

/// Reply to `event` carrying `payload`, same session, task and label.
pub(crate) fn reply(event: &Event, payload: Value) -> Event {
    let header = EventHeader::new(
        event.header.session.clone(),
        event.header.task.clone(),
        event.header.event.clone(),
    );
    let payload = match payload {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".into(), other);
            map
        }
    };
    Event::new(header, payload)
}

/// Push a reply keyed by the event label.
pub(crate) fn push_reply(env: &mut ProcessorEnv, event: &Event, payload: Value) {
    let out = reply(event, payload);
    env.events().push(event.label(), out);
}
