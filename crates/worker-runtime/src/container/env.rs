//! # Processor Environment
//!
//! What a processor sees while handling an event:
//!
//! ```text
//! ProcessorEnv
//! ├── db          SessionStore      (set once at start-up)
//! ├── blk         ResourceManager   (set once at start-up)
//! ├── providers   crypto table, logger, integrity, encoding (set once)
//! └── stacks      events + data     (emptied before every main pipeline)
//! ```
//!
//! Every setter is set-once: a setter that finds a value already in place
//! leaves it untouched and returns `false`.

use crate::adapters::ports::{ResourceManager, SessionStore};
use crate::logger::WorkerLog;
use serde_json::Value;
use shared_crypto::{CryptoProvider, EncodingProvider, IntegrityProvider, MleProviders};
use shared_types::codes;
use shared_types::{DopError, DopResult, Event, PipelineMemory};
use std::collections::HashMap;
use std::sync::Arc;

fn set_once<T>(slot: &mut Option<T>, value: T) -> bool {
    if slot.is_some() {
        return false;
    }
    *slot = Some(value);
    true
}

fn unset(what: &str) -> DopError {
    DopError::from(codes::ERR_SERVER).caused_by(DopError::new(0, format!("{what} not configured")))
}

/// Outgoing events and cross-processor scratch data.
#[derive(Debug, Default)]
pub struct PipelineStacks {
    /// Outgoing events keyed by destination (label or session).
    pub events: PipelineMemory<Event>,
    /// Scratch values keyed by whatever the processors agree on.
    pub data: PipelineMemory<Value>,
}

impl PipelineStacks {
    /// Empty stacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every buffered event.
    pub fn empty_events(&mut self) {
        self.events.empty();
    }

    /// Drop every scratch value.
    pub fn empty_data(&mut self) {
        self.data.empty();
    }
}

/// Long-lived providers handed to finally processors.
#[derive(Clone, Default)]
pub struct Providers {
    crypto: Option<HashMap<String, Arc<dyn CryptoProvider>>>,
    logger: Option<WorkerLog>,
    integrity: Option<Arc<dyn IntegrityProvider>>,
    encoding: Option<Arc<dyn EncodingProvider>>,
}

impl Providers {
    /// Set the crypto table (keys are lowercase provider names).
    pub fn set_crypto(&mut self, crypto: HashMap<String, Arc<dyn CryptoProvider>>) -> bool {
        set_once(&mut self.crypto, crypto)
    }

    /// Set the logger.
    pub fn set_logger(&mut self, logger: WorkerLog) -> bool {
        set_once(&mut self.logger, logger)
    }

    /// Set the integrity provider.
    pub fn set_integrity(&mut self, integrity: Arc<dyn IntegrityProvider>) -> bool {
        set_once(&mut self.integrity, integrity)
    }

    /// Set the encoding provider.
    pub fn set_encoding(&mut self, encoding: Arc<dyn EncodingProvider>) -> bool {
        set_once(&mut self.encoding, encoding)
    }

    /// Crypto table.
    pub fn crypto(&self) -> DopResult<&HashMap<String, Arc<dyn CryptoProvider>>> {
        self.crypto.as_ref().ok_or_else(|| unset("crypto providers"))
    }

    /// Logger.
    pub fn logger(&self) -> DopResult<&WorkerLog> {
        self.logger.as_ref().ok_or_else(|| unset("logging provider"))
    }

    /// Integrity provider.
    pub fn integrity(&self) -> DopResult<&Arc<dyn IntegrityProvider>> {
        self.integrity.as_ref().ok_or_else(|| unset("integrity provider"))
    }

    /// Encoding provider.
    pub fn encoding(&self) -> DopResult<&Arc<dyn EncodingProvider>> {
        self.encoding.as_ref().ok_or_else(|| unset("encoding provider"))
    }

    /// The bundle the MLE envelope works with.
    pub fn mle(&self) -> DopResult<MleProviders> {
        Ok(MleProviders {
            crypto: self.crypto()?.clone(),
            encoding: Arc::clone(self.encoding()?),
            integrity: Arc::clone(self.integrity()?),
        })
    }
}

impl std::fmt::Debug for Providers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut crypto: Vec<&String> = self.crypto.iter().flat_map(HashMap::keys).collect();
        crypto.sort();
        f.debug_struct("Providers")
            .field("crypto", &crypto)
            .field("logger", &self.logger.is_some())
            .field("integrity", &self.integrity.is_some())
            .field("encoding", &self.encoding.is_some())
            .finish()
    }
}

/// Environment of one worker.
#[derive(Default)]
pub struct ProcessorEnv {
    db: Option<Arc<dyn SessionStore>>,
    blk: Option<Arc<dyn ResourceManager>>,
    /// Shared providers.
    pub providers: Providers,
    /// Per-dispatch stacks.
    pub stacks: PipelineStacks,
}

impl ProcessorEnv {
    /// Environment with nothing configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the persistence manager.
    pub fn set_db(&mut self, db: Arc<dyn SessionStore>) -> bool {
        set_once(&mut self.db, db)
    }

    /// Set the blockchain manager.
    pub fn set_blk(&mut self, blk: Arc<dyn ResourceManager>) -> bool {
        set_once(&mut self.blk, blk)
    }

    /// Persistence manager.
    pub fn db(&self) -> DopResult<&Arc<dyn SessionStore>> {
        self.db.as_ref().ok_or_else(|| unset("database provider"))
    }

    /// Blockchain manager.
    pub fn blk(&self) -> DopResult<&Arc<dyn ResourceManager>> {
        self.blk.as_ref().ok_or_else(|| unset("blockchain provider"))
    }

    /// Outgoing events.
    pub fn events(&mut self) -> &mut PipelineMemory<Event> {
        &mut self.stacks.events
    }

    /// Scratch data.
    pub fn data(&mut self) -> &mut PipelineMemory<Value> {
        &mut self.stacks.data
    }
}

impl std::fmt::Debug for ProcessorEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorEnv")
            .field("db", &self.db.is_some())
            .field("blk", &self.blk.is_some())
            .field("providers", &self.providers)
            .field("events", &self.stacks.events.len())
            .field("data", &self.stacks.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryStore, NullLedger};
    use shared_crypto::{DefaultEncoding, DefaultIntegrity, NoneCipher};
    use shared_types::EventHeader;

    #[test]
    fn test_resource_setters_are_set_once() {
        let mut env = ProcessorEnv::new();
        let first = Arc::new(MemoryStore::new());
        assert!(env.set_db(first.clone()));
        assert!(!env.set_db(Arc::new(MemoryStore::new())));
        first.insert_user(5, "bob");
        assert!(env.db().unwrap().get_user(5).unwrap().is_some());

        assert!(env.blk().is_err());
        assert!(env.set_blk(Arc::new(NullLedger::new())));
        assert!(!env.set_blk(Arc::new(NullLedger::new())));
    }

    #[test]
    fn test_unset_provider_is_server_error() {
        let providers = Providers::default();
        let err = providers.mle().unwrap_err();
        assert_eq!(err.code, 816);
    }

    #[test]
    fn test_mle_bundle() {
        let mut providers = Providers::default();
        let mut crypto: HashMap<String, Arc<dyn CryptoProvider>> = HashMap::new();
        crypto.insert("none".into(), Arc::new(NoneCipher));
        assert!(providers.set_crypto(crypto));
        assert!(providers.set_integrity(Arc::new(DefaultIntegrity)));
        assert!(providers.set_encoding(Arc::new(DefaultEncoding)));
        assert!(!providers.set_encoding(Arc::new(DefaultEncoding)));
        let mle = providers.mle().unwrap();
        assert!(mle.cipher("NONE").is_ok());
    }

    #[test]
    fn test_stacks_empty() {
        let mut env = ProcessorEnv::new();
        env.events().push("k", Event::new(EventHeader::new("aa", "1", "x"), Default::default()));
        env.data().push("k", Value::from(1));
        env.stacks.empty_events();
        env.stacks.empty_data();
        assert!(env.stacks.events.properties().is_empty());
        assert!(env.stacks.data.is_empty());
    }
}
