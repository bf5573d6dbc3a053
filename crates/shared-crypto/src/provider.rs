//! # Crypto Provider Contract
//!
//! A crypto provider is a symmetric cipher plugged in under a name. It
//! declares an IV size (`blocksize`, in bits) and the suites it can serve.
//!
//! | Method | Contract |
//! |--------|----------|
//! | `blocksize` | IV length in bits; the envelope draws `blocksize / 8` random bytes |
//! | `capabilities` | `{name, mode, keylength}` suites this provider accepts |
//! | `encrypt` / `decrypt` | `(bytes, params, iv, key) -> bytes` |

use crate::CryptoError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use shared_types::Provider;

/// A negotiable `{name, mode, keylength}` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CipherSuite {
    /// Cipher name, also the provider registry key.
    pub name: String,
    /// Cipher mode.
    pub mode: String,
    /// Key length in bits, -1 when the cipher takes no key.
    #[serde(deserialize_with = "lenient_i64")]
    pub keylength: i64,
}

impl CipherSuite {
    /// Create a suite.
    pub fn new(name: impl Into<String>, mode: impl Into<String>, keylength: i64) -> Self {
        Self {
            name: name.into(),
            mode: mode.into(),
            keylength,
        }
    }

    /// Canonical text used to compare suites coming from different peers.
    #[must_use]
    pub fn normalized(&self) -> String {
        format!(
            "{}|{}|{}",
            self.name.trim().to_ascii_lowercase(),
            self.mode.trim().to_ascii_lowercase(),
            self.keylength
        )
    }

    /// Suite parameters handed to the cipher.
    #[must_use]
    pub fn params(&self) -> CipherParams {
        CipherParams {
            mode: self.mode.clone(),
            keylength: self.keylength,
        }
    }
}

/// Mode and key length passed to `encrypt`/`decrypt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherParams {
    /// Cipher mode.
    pub mode: String,
    /// Key length in bits.
    #[serde(deserialize_with = "lenient_i64")]
    pub keylength: i64,
}

/// Clients send key lengths as numbers or as numeric strings.
fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    match Value::deserialize(d)? {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| serde::de::Error::custom("keylength out of range")),
        Value::String(s) if s.trim().is_empty() => Ok(0),
        Value::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
        other => Err(serde::de::Error::custom(format!(
            "keylength must be a number, got {other}"
        ))),
    }
}

/// Symmetric cipher plugged into the MLE envelope.
pub trait CryptoProvider: Provider {
    /// Registry name.
    fn name(&self) -> &str;

    /// IV length in bits.
    fn blocksize(&self) -> usize;

    /// Suites served by this provider.
    fn capabilities(&self) -> Vec<CipherSuite>;

    /// Encrypt `plaintext`.
    fn encrypt(
        &self,
        plaintext: &[u8],
        params: &CipherParams,
        iv: &[u8],
        key: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;

    /// Decrypt `ciphertext`.
    fn decrypt(
        &self,
        ciphertext: &[u8],
        params: &CipherParams,
        iv: &[u8],
        key: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;
}
