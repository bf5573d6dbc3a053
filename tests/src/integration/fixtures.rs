//! Shared fixtures: configuration documents and a worker wired to
//! in-memory transports and managers the test can inspect.

use serde_json::{json, Value};
use shared_bus::MemoryOutput;
use std::sync::Arc;
use worker_runtime::adapters::{MemoryStore, NullLedger};
use worker_runtime::{DispatchReport, ProcessorRegistry, WorkerBuilder, WorkerConfig, WorkerRuntime};

/// Session value of the first test client.
pub const SESSION_A: &str = "aa01";
/// Second session of the same client.
pub const SESSION_B: &str = "bb02";
/// Auth token shared by the test sessions.
pub const TOKEN: &str = "beef";
/// Username of the test client.
pub const SUBJECT: &str = "alice@example.com";

/// Macros used by the standard pipelines.
pub const STANDARD_MACROS: &str = r#"{
    "AUTH": [
        {"processor": "authentication_check", "configuration": ""},
        {"processor": "update_session", "configuration": ""}
    ],
    "SESSIONS": [{"processor": "find_sessions_mle", "configuration": "multiple_sessions=true"}],
    "MLE": [{"processor": "event_multiplication_mle", "configuration": ""}]
}"#;

/// Pipelines of a worker serving the MLE handshake.
pub const STANDARD_PIPELINES: &str = r#"{
    "start_session": {
        "main": [{"processor": "start_session", "configuration": ""}],
        "finally": [{"processor": "event_type_to_session", "configuration": ""}]
    },
    "dop_client_ready": {
        "main": ["$AUTH", "$SESSIONS", {"processor": "client_ready", "configuration": ""}],
        "finally": ["$MLE"]
    },
    "dop_cipher_suite_selection": {
        "main": ["$AUTH", "$SESSIONS", {"processor": "cipher_suite_selection", "configuration": ""}],
        "finally": ["$MLE"]
    }
}"#;

/// Full configuration document around `macros` and `pipelines`.
#[must_use]
pub fn config_text(macros: &str, pipelines: &str) -> String {
    format!(
        r#"{{
            "macros": {macros},
            "pipelines": {pipelines},
            "inputProvider": {{"provider": "channel", "configuration": "rc=0"}},
            "outputProvider": {{"provider": "memory", "configuration": ""}},
            "databaseProvider": {{"provider": "memory", "configuration": ""}},
            "blockchainWorkerProvider": {{"provider": "null", "configuration": ""}},
            "loggingProvider": {{"provider": "tracing", "configuration": "name=24;ll=5"}},
            "cryptoProviders": {{
                "none": {{"provider": "none", "configuration": ""}},
                "aes": {{"provider": "aes", "configuration": ""}},
                "xchacha20": {{"provider": "xchacha20", "configuration": ""}}
            }},
            "integrityProvider": {{"provider": "default", "configuration": ""}},
            "encodingProvider": {{"provider": "default", "configuration": ""}}
        }}"#
    )
}

/// Parsed configuration around `macros` and `pipelines`.
pub fn config(macros: &str, pipelines: &str) -> WorkerConfig {
    WorkerConfig::from_json(&config_text(macros, pipelines)).expect("fixture configuration parses")
}

/// Raw inbound message.
#[must_use]
pub fn message(session: &str, label: &str, params: Value) -> String {
    json!({"session": session, "task": "1", "event": label, "params": params}).to_string()
}

/// A started worker and handles on its in-memory collaborators.
pub struct TestWorker {
    /// The worker.
    pub runtime: WorkerRuntime,
    /// Everything the worker wrote.
    pub output: Arc<MemoryOutput>,
    /// Session store.
    pub store: Arc<MemoryStore>,
    /// Blockchain manager.
    pub ledger: Arc<NullLedger>,
}

impl TestWorker {
    /// Start a worker for `config` with the built-in processors.
    pub fn start(config: WorkerConfig) -> Self {
        Self::start_with(config, ProcessorRegistry::with_builtins())
    }

    /// Start a worker for `config` with `registry`.
    pub fn start_with(config: WorkerConfig, registry: ProcessorRegistry) -> Self {
        let output = Arc::new(MemoryOutput::new());
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(NullLedger::new());
        let runtime = WorkerBuilder::new(config)
            .with_registry(registry)
            .with_output(output.clone())
            .with_database(store.clone())
            .with_blockchain(ledger.clone())
            .start()
            .expect("worker starts");
        Self {
            runtime,
            output,
            store,
            ledger,
        }
    }

    /// Standard MLE worker with one user and no session.
    pub fn standard() -> Self {
        let worker = Self::start(config(STANDARD_MACROS, STANDARD_PIPELINES));
        worker.store.insert_user(1, SUBJECT);
        worker
    }

    /// Dispatch one raw message.
    pub fn send(&mut self, raw: &str) -> DispatchReport {
        self.runtime.handle_message(raw)
    }

    /// Open `session` for the test user through the `start_session` pipeline.
    pub fn open_session(&mut self, session: &str) -> DispatchReport {
        let raw = message(session, "start_session", json!({"subject": SUBJECT, "auth_token": TOKEN}));
        self.send(&raw)
    }

    /// Bodies written to `destination`, parsed, draining nothing.
    #[must_use]
    pub fn bodies_to(&self, destination: &str) -> Vec<Value> {
        self.output
            .sent_to(destination)
            .iter()
            .filter_map(shared_bus::OutboundMessage::json)
            .collect()
    }
}
