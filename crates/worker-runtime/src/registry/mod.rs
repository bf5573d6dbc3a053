//! # Processor Registry
//!
//! Compiled-in table from processor name to factory. The configuration
//! selects processors by name; there is no loading from files.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     ProcessorRegistry                        │
//! │                                                              │
//! │  "authentication_check" ──→ || Main(AuthenticationCheck)     │
//! │  "find_sessions_mle"    ──→ || Main(FindSessionsMle)         │
//! │  "event_multiplication_mle" → || Finally(EventMultiplication)│
//! │  ...                                                         │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │ create(spec): factory() + init(configuration)
//!                                ▼
//!                         ProcessorHandle
//! ```
//!
//! Embedders add their own factories with [`ProcessorRegistry::register`]
//! before the worker is built.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use shared_types::codes;
use shared_types::{DopError, DopResult};
use tracing::{debug, info, warn};

use crate::container::ProcessorSpec;
use crate::processors::{
    AuthenticationCheck, CipherSuiteSelection, ClientReady, EventMultiplicationMle,
    EventTypeToSession, FindSessionsMle, ProcessorHandle, StartSession, UpdateSession,
};

/// Builds a fresh, uninitialized processor.
pub type ProcessorFactory = Arc<dyn Fn() -> ProcessorHandle + Send + Sync>;

/// Name to factory table.
pub struct ProcessorRegistry {
    factories: RwLock<HashMap<String, ProcessorFactory>>,
}

impl ProcessorRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Registry holding the built-in processors.
    #[must_use]
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register(AuthenticationCheck::NAME, || {
            ProcessorHandle::Main(Arc::new(AuthenticationCheck))
        });
        registry.register(UpdateSession::NAME, || {
            ProcessorHandle::Main(Arc::new(UpdateSession))
        });
        registry.register(StartSession::NAME, || {
            ProcessorHandle::Main(Arc::new(StartSession))
        });
        registry.register(ClientReady::NAME, || ProcessorHandle::Main(Arc::new(ClientReady)));
        registry.register(CipherSuiteSelection::NAME, || {
            ProcessorHandle::Main(Arc::new(CipherSuiteSelection))
        });
        registry.register(FindSessionsMle::NAME, || {
            ProcessorHandle::Main(Arc::new(FindSessionsMle::new()))
        });
        registry.register(EventMultiplicationMle::NAME, || {
            ProcessorHandle::Finally(Arc::new(EventMultiplicationMle))
        });
        registry.register(EventTypeToSession::NAME, || {
            ProcessorHandle::Finally(Arc::new(EventTypeToSession))
        });
        info!("[Registry] {} built-in processors registered", registry.len());
        registry
    }

    /// Register (or replace) the factory for `name`.
    pub fn register<F>(&self, name: &str, factory: F)
    where
        F: Fn() -> ProcessorHandle + Send + Sync + 'static,
    {
        if self
            .factories
            .write()
            .insert(name.to_string(), Arc::new(factory))
            .is_some()
        {
            warn!("[Registry] Factory for {} replaced", name);
        }
    }

    /// Whether a factory exists for `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.read().contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered factories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.read().len()
    }

    /// Whether no factory is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.read().is_empty()
    }

    /// Build and initialize the processor described by `spec`.
    ///
    /// # Errors
    ///
    /// 24215 for an unknown name, 24216 wrapping the `init` failure.
    pub fn create(&self, spec: &ProcessorSpec) -> DopResult<ProcessorHandle> {
        let factory = self
            .factories
            .read()
            .get(&spec.processor)
            .cloned()
            .ok_or_else(|| {
                DopError::from(codes::ERR_LOAD_PROCESSOR)
                    .rip()
                    .caused_by(DopError::new(0, format!("unknown processor {}", spec.processor)))
            })?;
        let handle = factory();
        handle.init(&spec.configuration).map_err(|e| {
            DopError::from(codes::ERR_INIT_PROCESSOR).rip().caused_by(e)
        })?;
        debug!(stage = ?handle.stage(), "[Registry] Processor {} loaded", spec.processor);
        Ok(handle)
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("names", &self.names())
            .finish()
    }
}
