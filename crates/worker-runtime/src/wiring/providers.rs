//! # Provider Catalogue
//!
//! Maps the `provider` names of the configuration to the implementations
//! compiled into the worker. Names are case-insensitive.
//!
//! | Section | Names |
//! |---------|-------|
//! | `inputProvider` | `stdin`, `channel` |
//! | `outputProvider` | `stdout`, `memory`, `broadcast` |
//! | `databaseProvider` | `memory` |
//! | `blockchainWorkerProvider` | `null` |
//! | `loggingProvider` | `tracing`, `default` |
//! | `cryptoProviders.*` | `none`, `plaintext`, `aes`, `xchacha20` |
//! | `integrityProvider` | `default` |
//! | `encodingProvider` | `default` |
//!
//! Loading only builds the value; `init` and `open` are the runtime's job.

use crate::adapters::{MemoryStore, NullLedger, ResourceManager, SessionStore};
use crate::logger::WorkerLog;
use shared_bus::{
    BroadcastOutput, ChannelInput, InboundMessage, InputProvider, MemoryOutput, OutputProvider,
    StdinInput, StdoutOutput,
};
use shared_crypto::{
    builtin_provider, CryptoProvider, DefaultEncoding, DefaultIntegrity, EncodingProvider,
    IntegrityProvider,
};
use shared_types::codes::{self, ErrorCode};
use shared_types::DopError;
use std::sync::Arc;
use tokio::sync::mpsc;

fn unknown(code: ErrorCode, name: &str) -> DopError {
    DopError::from(code)
        .rip()
        .caused_by(DopError::new(0, format!("unknown provider {name}")))
}

/// A loaded input transport.
pub struct LoadedInput {
    /// The transport.
    pub provider: Arc<dyn InputProvider>,
    /// Feeding side, for the `channel` transport.
    pub sender: Option<mpsc::Sender<InboundMessage>>,
}

impl std::fmt::Debug for LoadedInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedInput")
            .field("has_sender", &self.sender.is_some())
            .finish_non_exhaustive()
    }
}

/// Load the input transport `name`.
///
/// # Errors
///
/// 24201 for an unknown name.
pub fn load_input(name: &str) -> Result<LoadedInput, DopError> {
    match name.to_ascii_lowercase().as_str() {
        "stdin" => Ok(LoadedInput {
            provider: Arc::new(StdinInput::new()),
            sender: None,
        }),
        "channel" => {
            let (input, sender) = ChannelInput::new();
            Ok(LoadedInput {
                provider: Arc::new(input),
                sender: Some(sender),
            })
        }
        _ => Err(unknown(codes::ERR_LOAD_INPUT, name)),
    }
}

/// Load the output transport `name`.
///
/// # Errors
///
/// 24202 for an unknown name.
pub fn load_output(name: &str) -> Result<Arc<dyn OutputProvider>, DopError> {
    match name.to_ascii_lowercase().as_str() {
        "stdout" => Ok(Arc::new(StdoutOutput::new())),
        "memory" => Ok(Arc::new(MemoryOutput::new())),
        "broadcast" => Ok(Arc::new(BroadcastOutput::new())),
        _ => Err(unknown(codes::ERR_LOAD_OUTPUT, name)),
    }
}

/// Load the persistence manager `name`.
///
/// # Errors
///
/// 24205 for an unknown name.
pub fn load_database(name: &str) -> Result<Arc<dyn SessionStore>, DopError> {
    match name.to_ascii_lowercase().as_str() {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        _ => Err(unknown(codes::ERR_LOAD_PERSISTENCE, name)),
    }
}

/// Load the blockchain manager `name`.
///
/// # Errors
///
/// 24209 for an unknown name.
pub fn load_blockchain(name: &str) -> Result<Arc<dyn ResourceManager>, DopError> {
    match name.to_ascii_lowercase().as_str() {
        "null" | "none" => Ok(Arc::new(NullLedger::new())),
        _ => Err(unknown(codes::ERR_LOAD_BLOCKCHAIN, name)),
    }
}

/// Load the logger `name`.
///
/// # Errors
///
/// 24211 for an unknown name.
pub fn load_logger(name: &str) -> Result<WorkerLog, DopError> {
    match name.to_ascii_lowercase().as_str() {
        "tracing" | "default" => Ok(WorkerLog::new()),
        _ => Err(unknown(codes::ERR_LOAD_LOGGER, name)),
    }
}

/// Load the cipher `name`.
///
/// # Errors
///
/// 24213 for an unknown name.
pub fn load_crypto(name: &str) -> Result<Arc<dyn CryptoProvider>, DopError> {
    builtin_provider(name).ok_or_else(|| unknown(codes::ERR_LOAD_CRYPTO, name))
}

/// Load the integrity provider `name`.
///
/// # Errors
///
/// 24207 for an unknown name.
pub fn load_integrity(name: &str) -> Result<Arc<dyn IntegrityProvider>, DopError> {
    match name.to_ascii_lowercase().as_str() {
        "default" => Ok(Arc::new(DefaultIntegrity)),
        _ => Err(unknown(codes::ERR_LOAD_INTEGRITY, name)),
    }
}

/// Load the encoding provider `name`.
///
/// # Errors
///
/// 24208 for an unknown name.
pub fn load_encoding(name: &str) -> Result<Arc<dyn EncodingProvider>, DopError> {
    match name.to_ascii_lowercase().as_str() {
        "default" => Ok(Arc::new(DefaultEncoding)),
        _ => Err(unknown(codes::ERR_LOAD_ENCODING, name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_names() {
        assert!(load_input("channel").unwrap().sender.is_some());
        assert!(load_input("STDIN").unwrap().sender.is_none());
        assert!(load_output("memory").is_ok());
        assert!(load_output("broadcast").is_ok());
        assert!(load_database("memory").is_ok());
        assert!(load_blockchain("null").is_ok());
        assert!(load_logger("tracing").is_ok());
        assert_eq!(load_crypto("AES").unwrap().name(), "aes");
        assert!(load_integrity("default").is_ok());
        assert!(load_encoding("default").is_ok());
    }

    #[test]
    fn test_unknown_names_use_section_codes() {
        let code = |r: Result<(), DopError>| r.unwrap_err().code;
        assert_eq!(code(load_input("kafka").map(|_| ())), 24201);
        assert_eq!(code(load_output("kafka").map(|_| ())), 24202);
        assert_eq!(code(load_database("postgres").map(|_| ())), 24205);
        assert_eq!(code(load_integrity("md5").map(|_| ())), 24207);
        assert_eq!(code(load_encoding("hex").map(|_| ())), 24208);
        assert_eq!(code(load_blockchain("eth").map(|_| ())), 24209);
        assert_eq!(code(load_logger("syslog").map(|_| ())), 24211);
        assert_eq!(code(load_crypto("rot13").map(|_| ())), 24213);
    }

    #[test]
    fn test_unknown_is_terminal() {
        let err = load_output("kafka").err().unwrap();
        assert!(!err.recoverable);
        assert_eq!(err.cause_code(), 0);
        assert!(err.cause.unwrap().msg.contains("kafka"));
    }
}
