//! # Worker Configuration
//!
//! JSON document read once at start-up.
//!
//! ```json
//! {
//!   "macros":    { "AUTH": [{"processor": "authentication_check", "configuration": ""}] },
//!   "pipelines": { "dop_client_ready": { "main": ["$AUTH", ...], "finally": [...] } },
//!   "inputProvider":            {"provider": "stdin",  "configuration": "rc=3;rd=1"},
//!   "outputProvider":           {"provider": "stdout", "configuration": ""},
//!   "databaseProvider":         {"provider": "memory", "configuration": ""},
//!   "blockchainWorkerProvider": {"provider": "null",   "configuration": ""},
//!   "loggingProvider":          {"provider": "tracing","configuration": "name=24;loglevel=4"},
//!   "cryptoProviders":          {"aes": {"provider": "aes", "configuration": ""}},
//!   "integrityProvider":        {"provider": "default","configuration": ""},
//!   "encodingProvider":         {"provider": "default","configuration": ""}
//! }
//! ```
//!
//! Provider and processor entries also accept `"class"` in place of
//! `"provider"`/`"processor"`; a `"path"` key is ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::codes::{self, ErrorCode};
use shared_types::DopError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "DOP_WORKER_CONFIG";

/// Required top-level keys, checked in this order.
const REQUIRED_KEYS: [(&str, ErrorCode); 9] = [
    ("inputProvider", codes::ERR_CONFIG_INPUT),
    ("outputProvider", codes::ERR_CONFIG_OUTPUT),
    ("databaseProvider", codes::ERR_CONFIG_DATABASE),
    ("blockchainWorkerProvider", codes::ERR_CONFIG_BLOCKCHAIN),
    ("pipelines", codes::ERR_CONFIG_PIPELINES),
    ("loggingProvider", codes::ERR_CONFIG_LOGGING),
    ("integrityProvider", codes::ERR_CONFIG_INTEGRITY),
    ("cryptoProviders", codes::ERR_CONFIG_CRYPTO),
    ("encodingProvider", codes::ERR_CONFIG_ENCODING),
];

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Cannot read configuration file {path}: {msg}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        msg: String,
    },

    /// The document is not valid JSON or does not match the schema.
    #[error("Error in parsing the configuration file: {0}")]
    Parse(String),

    /// A required top-level key is absent.
    #[error("Configuration value error: {key} key is undefined/missing")]
    MissingKey {
        /// Missing key.
        key: &'static str,
        /// Catalogue code for the key.
        code: u32,
    },

    /// No configuration path on the command line or in the environment.
    #[error("No configuration file given (argument or {CONFIG_ENV_VAR})")]
    NoPath,
}

impl ConfigError {
    /// Catalogue code.
    #[must_use]
    pub fn code(&self) -> u32 {
        match self {
            Self::MissingKey { code, .. } => *code,
            Self::Io { .. } | Self::Parse(_) | Self::NoPath => codes::ERR_CONFIG_PARSE.id,
        }
    }
}

impl From<ConfigError> for DopError {
    fn from(e: ConfigError) -> Self {
        DopError::new(e.code(), e.to_string()).rip()
    }
}

/// A pluggable provider selected by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSpec {
    /// Built-in provider name.
    #[serde(alias = "class")]
    pub provider: String,
    /// `k=v;...` configuration string.
    #[serde(default)]
    pub configuration: String,
}

impl ProviderSpec {
    /// Spec with an empty configuration.
    pub fn named(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            configuration: String::new(),
        }
    }
}

/// A processor selected by registry name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorSpec {
    /// Registry name.
    #[serde(alias = "class")]
    pub processor: String,
    /// `k=v;...` configuration string.
    #[serde(default)]
    pub configuration: String,
}

impl ProcessorSpec {
    /// Create a spec.
    pub fn new(processor: impl Into<String>, configuration: impl Into<String>) -> Self {
        Self {
            processor: processor.into(),
            configuration: configuration.into(),
        }
    }
}

/// An element of a macro or pipeline list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MacroElement {
    /// `"$Name"` reference to another macro.
    Reference(String),
    /// Inline processor spec.
    Processor(ProcessorSpec),
}

impl MacroElement {
    /// Referenced macro name without the `$`, `None` for inline specs and
    /// for strings that do not start with `$`.
    #[must_use]
    pub fn macro_name(&self) -> Option<&str> {
        match self {
            Self::Reference(r) => r.strip_prefix('$'),
            Self::Processor(_) => None,
        }
    }
}

/// Macro graph: name to element list.
pub type MacroGraph = BTreeMap<String, Vec<MacroElement>>;

/// Pipeline of one event label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// Transactional stage.
    #[serde(default)]
    pub main: Vec<MacroElement>,
    /// Stage that always runs after `main`.
    #[serde(default)]
    pub finally: Vec<MacroElement>,
}

/// Complete worker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerConfig {
    /// Macro graph.
    #[serde(default)]
    pub macros: MacroGraph,
    /// Pipelines by event label.
    pub pipelines: BTreeMap<String, PipelineSpec>,
    /// Input transport.
    pub input_provider: ProviderSpec,
    /// Output transport.
    pub output_provider: ProviderSpec,
    /// Persistence resource manager.
    pub database_provider: ProviderSpec,
    /// Blockchain resource manager.
    pub blockchain_worker_provider: ProviderSpec,
    /// Logger.
    pub logging_provider: ProviderSpec,
    /// Crypto providers by name.
    pub crypto_providers: BTreeMap<String, ProviderSpec>,
    /// Integrity functions.
    pub integrity_provider: ProviderSpec,
    /// Encodings.
    pub encoding_provider: ProviderSpec,
}

impl WorkerConfig {
    /// Parse a configuration document.
    ///
    /// # Errors
    ///
    /// `Parse` for malformed JSON, `MissingKey` for the first absent
    /// required key.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let doc: Value = serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let Value::Object(map) = &doc else {
            return Err(ConfigError::Parse("top level is not an object".into()));
        };
        if let Some((key, code)) = REQUIRED_KEYS.iter().find(|(k, _)| !map.contains_key(*k)) {
            return Err(ConfigError::MissingKey { key, code: code.id });
        }
        serde_json::from_value(doc).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read and parse the file at `path`.
    ///
    /// # Errors
    ///
    /// `Io` when unreadable, otherwise as [`WorkerConfig::from_json`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            msg: e.to_string(),
        })?;
        Self::from_json(&text)
    }
}

/// Configuration path: the CLI argument wins over [`CONFIG_ENV_VAR`].
///
/// # Errors
///
/// `NoPath` when neither is set.
pub fn resolve_config_path(cli_arg: Option<String>) -> Result<PathBuf, ConfigError> {
    cli_arg
        .or_else(|| std::env::var(CONFIG_ENV_VAR).ok())
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .ok_or(ConfigError::NoPath)
}
