//! # Shared Crypto - Message-Level Encryption
//!
//! Pluggable ciphers, encodings and integrity functions combined into the
//! MLE envelope carried by DOP transport events.
//!
//! ## Components
//!
//! | Module | Contents | Use Case |
//! |--------|----------|----------|
//! | `provider` | `CryptoProvider`, `CipherSuite` | Cipher contract |
//! | `none` | `none`, `plaintext` | Unencrypted sessions, testing |
//! | `symmetric` | AES-GCM, XChaCha20-Poly1305 | Encryption |
//! | `encoding` | base64, input | Ciphertext text form |
//! | `integrity` | CRC-16/ARC, SHA-256 | Plaintext digests |
//! | `envelope` | `encrypt_and_wrap` / `unwrap_and_decrypt` | Stateless transform |
//! | `transport` | `seal_event` / `open_event` | Transport events |
//! | `negotiation` | `choose_ciphersuite` | Client suite choice |
//! | `client` | `MleClient` | Receiving side |
//!
//! ## Security Properties
//!
//! - **Fresh IV** per envelope, `blocksize / 8` random bytes
//! - **AEAD** ciphers only for real suites; `none` is an explicit opt-out
//! - **Keys** held in `Zeroizing` buffers while in use

#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod client;
pub mod encoding;
pub mod envelope;
pub mod errors;
pub mod integrity;
pub mod negotiation;
pub mod none;
pub mod provider;
pub mod symmetric;
pub mod transport;

// Re-exports
pub use client::MleClient;
pub use encoding::{decode_base64, encode_base64, DefaultEncoding, EncodingProvider};
pub use envelope::{encrypt_and_wrap, unwrap_and_decrypt, MleEnvelope};
pub use errors::CryptoError;
pub use integrity::{crc16, sha256, DefaultIntegrity, IntegrityProvider};
pub use negotiation::{capabilities_of, choose_ciphersuite, common_suites};
pub use none::{NoneCipher, PlaintextCipher};
pub use provider::{CipherParams, CipherSuite, CryptoProvider};
pub use symmetric::{AesGcmCipher, XChaChaCipher};
pub use transport::{open_event, open_transport_event, seal_event, KeyState, MleProviders};

use std::sync::Arc;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Built-in cipher registered under `name` (case-insensitive).
#[must_use]
pub fn builtin_provider(name: &str) -> Option<Arc<dyn CryptoProvider>> {
    match name.to_ascii_lowercase().as_str() {
        "none" => Some(Arc::new(NoneCipher)),
        "plaintext" => Some(Arc::new(PlaintextCipher::new())),
        "aes" => Some(Arc::new(AesGcmCipher)),
        "xchacha20" => Some(Arc::new(XChaChaCipher)),
        _ => None,
    }
}
