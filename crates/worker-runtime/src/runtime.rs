//! # Worker Runtime
//!
//! Owns every provider of one worker and drives the receive loop.
//!
//! ## Start-up Sequence
//!
//! | Step | What | Failure codes |
//! |------|------|---------------|
//! | 1 | Validate the macro graph | 199 |
//! | 2 | Logger: load, init, open | 24211, 24212, 24304 |
//! | 3 | Output transport: load, init | 24202, 24204 |
//! | 4 | Input transport: load, init | 24201, 24203 |
//! | 5 | Database then blockchain manager: load, init | 24205, 24206, 24209, 24210 |
//! | 6 | Resolve macros, build the pipeline table | 24215, 24216 |
//! | 7 | Crypto providers: load, init, open | 24213, 24214, 24308 |
//! | 8 | Integrity and encoding providers | 24207, 24208 |
//! | 9 | Open processors, output, input, database, blockchain | 24307, 24301, 24302, 24305, 24306 |
//!
//! Every start-up error is terminal. Transports and resource managers open
//! with their retry policy (`retrycount`/`rc`, `retrydelay`/`rd`).
//!
//! ## Shutdown Sequence
//!
//! input → output → each distinct processor → database → blockchain
//! (24501, 24502, 24504, 24503, 24505).
//! A failing `close` is logged and the sequence continues.

use crate::adapters::{ResourceManager, SessionStore};
use crate::container::{ProcessorEnv, ProviderSpec, WorkerConfig};
use crate::handlers::{DispatchReport, Dispatcher};
use crate::logger::WorkerLog;
use crate::registry::ProcessorRegistry;
use crate::wiring::{providers, validate_macros, MacroResolver, PipelineTable};
use serde_json::json;
use shared_bus::{InboundMessage, InputProvider, OutputProvider};
use shared_crypto::CryptoProvider;
use shared_types::codes::{self, ErrorCode};
use shared_types::{open_with_retry, ConfigMap, DopError, DopResult, Provider, RetryPolicy};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

fn fail(code: ErrorCode) -> impl FnOnce(DopError) -> DopError {
    move |cause| DopError::from(code).rip().caused_by(cause)
}

/// Open retry policy of a resource manager, from its configuration string.
fn retry_policy(spec: &ProviderSpec) -> RetryPolicy {
    RetryPolicy::from_config(&ConfigMap::parse(&spec.configuration))
}

fn init_with<P: Provider + ?Sized>(provider: &P, spec: &ProviderSpec, code: ErrorCode) -> DopResult<()> {
    provider.init(&spec.configuration).map_err(fail(code))
}

/// Assembles a [`WorkerRuntime`] from a configuration, with optional
/// pre-built providers taking the place of the configured ones.
pub struct WorkerBuilder {
    config: WorkerConfig,
    registry: Option<ProcessorRegistry>,
    input: Option<Arc<dyn InputProvider>>,
    output: Option<Arc<dyn OutputProvider>>,
    database: Option<Arc<dyn SessionStore>>,
    blockchain: Option<Arc<dyn ResourceManager>>,
}

impl WorkerBuilder {
    /// Builder for `config`.
    #[must_use]
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config,
            registry: None,
            input: None,
            output: None,
            database: None,
            blockchain: None,
        }
    }

    /// Use `registry` instead of the built-in one.
    #[must_use]
    pub fn with_registry(mut self, registry: ProcessorRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use `input` instead of `inputProvider`.
    #[must_use]
    pub fn with_input(mut self, input: Arc<dyn InputProvider>) -> Self {
        self.input = Some(input);
        self
    }

    /// Use `output` instead of `outputProvider`.
    #[must_use]
    pub fn with_output(mut self, output: Arc<dyn OutputProvider>) -> Self {
        self.output = Some(output);
        self
    }

    /// Use `database` instead of `databaseProvider`.
    #[must_use]
    pub fn with_database(mut self, database: Arc<dyn SessionStore>) -> Self {
        self.database = Some(database);
        self
    }

    /// Use `blockchain` instead of `blockchainWorkerProvider`.
    #[must_use]
    pub fn with_blockchain(mut self, blockchain: Arc<dyn ResourceManager>) -> Self {
        self.blockchain = Some(blockchain);
        self
    }

    /// Run the start-up sequence.
    ///
    /// # Errors
    ///
    /// The first failing step, see the module table.
    pub fn start(self) -> DopResult<WorkerRuntime> {
        let Self {
            config,
            registry,
            input,
            output,
            database,
            blockchain,
        } = self;
        info!("===========================================");
        info!("  DOP Worker Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        validate_macros(&config.macros)?;

        let log = providers::load_logger(&config.logging_provider.provider)?;
        init_with(&log, &config.logging_provider, codes::ERR_INIT_LOGGER)?;
        log.open().map_err(fail(codes::ERR_OPEN_LOGGER))?;
        info!(component = %log.name(), level = log.level(), "[Worker] Logger ready");

        let output = match output {
            Some(output) => output,
            None => providers::load_output(&config.output_provider.provider)?,
        };
        init_with(output.as_ref(), &config.output_provider, codes::ERR_INIT_OUTPUT)?;

        let (input, sender) = match input {
            Some(input) => (input, None),
            None => {
                let loaded = providers::load_input(&config.input_provider.provider)?;
                (loaded.provider, loaded.sender)
            }
        };
        init_with(input.as_ref(), &config.input_provider, codes::ERR_INIT_INPUT)?;

        let db = match database {
            Some(db) => db,
            None => providers::load_database(&config.database_provider.provider)?,
        };
        init_with(db.as_ref(), &config.database_provider, codes::ERR_INIT_PERSISTENCE)?;
        let blk = match blockchain {
            Some(blk) => blk,
            None => providers::load_blockchain(&config.blockchain_worker_provider.provider)?,
        };
        init_with(blk.as_ref(), &config.blockchain_worker_provider, codes::ERR_INIT_BLOCKCHAIN)?;

        let registry = registry.unwrap_or_default();
        let mut resolver = MacroResolver::new(&registry);
        resolver.resolve(&config.macros)?;
        let table = Arc::new(PipelineTable::build(&config.pipelines, &resolver)?);

        let mut crypto: HashMap<String, Arc<dyn CryptoProvider>> = HashMap::new();
        for (key, spec) in &config.crypto_providers {
            let provider = providers::load_crypto(&spec.provider)?;
            init_with(provider.as_ref(), spec, codes::ERR_INIT_CRYPTO)?;
            provider.open().map_err(fail(codes::ERR_OPEN_CRYPTO))?;
            debug!(entry = %key, cipher = provider.name(), "[Worker] Crypto provider ready");
            crypto.insert(provider.name().to_ascii_lowercase(), provider);
        }

        let integrity = providers::load_integrity(&config.integrity_provider.provider)?;
        init_with(integrity.as_ref(), &config.integrity_provider, codes::ERR_LOAD_INTEGRITY)?;
        let encoding = providers::load_encoding(&config.encoding_provider.provider)?;
        init_with(encoding.as_ref(), &config.encoding_provider, codes::ERR_LOAD_ENCODING)?;

        for processor in table.distinct_processors() {
            processor.open().map_err(fail(codes::ERR_OPEN_PROCESSOR))?;
        }
        open_with_retry(output.as_ref(), "output", output.retry_policy())
            .map_err(fail(codes::ERR_OPEN_OUTPUT))?;
        open_with_retry(input.as_ref(), "input", input.retry_policy())
            .map_err(fail(codes::ERR_OPEN_INPUT))?;
        open_with_retry(db.as_ref(), "database", retry_policy(&config.database_provider))
            .map_err(fail(codes::ERR_OPEN_PERSISTENCE))?;
        open_with_retry(blk.as_ref(), "blockchain", retry_policy(&config.blockchain_worker_provider))
            .map_err(fail(codes::ERR_OPEN_BLOCKCHAIN))?;

        let mut env = ProcessorEnv::new();
        env.set_db(Arc::clone(&db));
        env.set_blk(Arc::clone(&blk));
        env.providers.set_crypto(crypto);
        env.providers.set_logger(log.clone());
        env.providers.set_integrity(integrity);
        env.providers.set_encoding(encoding);

        info!(
            pipelines = table.len(),
            processors = table.distinct_processors().len(),
            "[Worker] Started, listening for events"
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(WorkerRuntime {
            dispatcher: Dispatcher::new(Arc::clone(&output), table, env),
            input,
            sender,
            output,
            db,
            blk,
            log,
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        })
    }
}

/// A started worker.
pub struct WorkerRuntime {
    dispatcher: Dispatcher,
    input: Arc<dyn InputProvider>,
    sender: Option<mpsc::Sender<InboundMessage>>,
    output: Arc<dyn OutputProvider>,
    db: Arc<dyn SessionStore>,
    blk: Arc<dyn ResourceManager>,
    log: WorkerLog,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl WorkerRuntime {
    /// Start a worker with every provider taken from `config`.
    ///
    /// # Errors
    ///
    /// As [`WorkerBuilder::start`].
    pub fn from_config(config: WorkerConfig) -> DopResult<Self> {
        WorkerBuilder::new(config).start()
    }

    /// Feeding side of a `channel` input. Dropping every clone ends [`run`](Self::run).
    #[must_use]
    pub fn sender(&self) -> Option<mpsc::Sender<InboundMessage>> {
        self.sender.clone()
    }

    /// Handle used to stop [`run`](Self::run): send `true`.
    #[must_use]
    pub fn shutdown_signal(&self) -> Arc<watch::Sender<bool>> {
        Arc::clone(&self.shutdown_tx)
    }

    /// The dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Output transport.
    #[must_use]
    pub fn output(&self) -> &Arc<dyn OutputProvider> {
        &self.output
    }

    /// Persistence manager.
    #[must_use]
    pub fn database(&self) -> &Arc<dyn SessionStore> {
        &self.db
    }

    /// Handle one raw message outside the receive loop.
    pub fn handle_message(&mut self, raw: &str) -> DispatchReport {
        self.dispatcher.handle_message(raw)
    }

    /// Receive and dispatch until the input ends or shutdown is signalled.
    /// Returns the number of messages handled.
    pub async fn run(&mut self) -> u64 {
        let input = Arc::clone(&self.input);
        let mut stop = self.shutdown_rx.clone();
        let mut handled = 0u64;
        loop {
            if *stop.borrow() {
                info!("[Worker] Shutdown requested");
                break;
            }
            tokio::select! {
                message = input.recv() => {
                    let Some(message) = message else {
                        info!("[Worker] Input closed");
                        break;
                    };
                    debug!(topic = %message.topic, "[Worker] Message received");
                    let report = self.dispatcher.handle_message(&message.payload);
                    debug!(outcome = ?report.outcome, sent = report.sent, "[Worker] Message handled");
                    handled += 1;
                }
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        handled
    }

    /// Close every provider in shutdown order. Returns the failures, which
    /// are also logged.
    pub fn shutdown(&self) -> Vec<DopError> {
        info!("[Worker] Shutting down");
        let mut failures = Vec::new();
        let mut close = |result: DopResult<()>, code: ErrorCode, what: &str| {
            if let Err(cause) = result {
                let err = DopError::from(code).caused_by(cause);
                self.log.error(err.code, &json!({"closing": what, "perr": err.cause_code()}));
                warn!(code = err.code, "[Worker] Closing {} failed", what);
                failures.push(err);
            }
        };
        close(self.input.close(), codes::ERR_CLOSE_INPUT, "input");
        close(self.output.close(), codes::ERR_CLOSE_OUTPUT, "output");
        for processor in self.dispatcher.table().distinct_processors() {
            close(processor.close(), codes::ERR_CLOSE_PROCESSOR, processor.name());
        }
        close(self.db.close(), codes::ERR_CLOSE_PERSISTENCE, "database");
        close(self.blk.close(), codes::ERR_CLOSE_BLOCKCHAIN, "blockchain");
        info!(failures = failures.len(), "[Worker] Shutdown complete");
        failures
    }
}

impl std::fmt::Debug for WorkerRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerRuntime")
            .field("dispatcher", &self.dispatcher)
            .field("has_sender", &self.sender.is_some())
            .finish_non_exhaustive()
    }
}
