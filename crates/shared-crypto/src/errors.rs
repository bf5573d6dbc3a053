//! Crypto error types.

use shared_types::{codes, DopError};
use thiserror::Error;

/// MLE and cipher operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// Invalid nonce length
    #[error("Invalid nonce length: expected {expected}, got {actual}")]
    InvalidNonceLength {
        /// Expected nonce length in bytes
        expected: usize,
        /// Actual nonce length in bytes
        actual: usize,
    },

    /// No crypto provider registered under this name
    #[error("Unknown cipher: {0}")]
    UnknownCipher(String),

    /// Cipher does not support the requested mode
    #[error("Unsupported cipher mode: {0}")]
    UnsupportedMode(String),

    /// No encoding registered under this name
    #[error("Unknown encoding: {0}")]
    UnknownEncoding(String),

    /// No integrity function registered under this name
    #[error("Unknown integrity function: {0}")]
    UnknownIntegrity(String),

    /// Text could not be decoded (base64, UTF-8, JSON)
    #[error("Decode error: {0}")]
    Decode(String),

    /// Recovered digest differs from the received one
    #[error("Integrity mismatch: received {received}, computed {computed}")]
    IntegrityMismatch {
        /// Digest carried by the transport header
        received: String,
        /// Digest of the recovered plaintext
        computed: String,
    },

    /// Client and backend share no cipher suite
    #[error("No cipher suite in common")]
    NoCommonSuite,
}

impl From<CryptoError> for DopError {
    fn from(e: CryptoError) -> Self {
        let base = match &e {
            CryptoError::IntegrityMismatch { .. } => DopError::from(codes::ERR_MLE_INTEGRITY),
            CryptoError::UnknownIntegrity(_) => DopError::from(codes::ERR_MLE_INTEGRITY_FUN),
            CryptoError::NoCommonSuite | CryptoError::UnknownCipher(_) => {
                DopError::from(codes::ERR_CIPHER_SUITE).rip()
            }
            CryptoError::UnknownEncoding(name) => {
                return DopError::new(1, format!("Encoding not supported: {name}"));
            }
            _ => DopError::from(codes::ERR_MLE_ENCAPSULATION),
        };
        base.caused_by(DopError::new(0, e.to_string()))
    }
}
