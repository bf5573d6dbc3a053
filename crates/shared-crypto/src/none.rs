//! Identity ciphers: `none` and `plaintext`.
//!
//! Both have a zero blocksize, so the envelope carries an empty IV.

use crate::provider::{CipherParams, CipherSuite, CryptoProvider};
use crate::CryptoError;
use shared_types::Provider;

/// Cipher that returns its input.
#[derive(Debug, Default, Clone)]
pub struct NoneCipher;

impl Provider for NoneCipher {}

impl CryptoProvider for NoneCipher {
    fn name(&self) -> &str {
        "none"
    }

    fn blocksize(&self) -> usize {
        0
    }

    fn capabilities(&self) -> Vec<CipherSuite> {
        vec![CipherSuite::new("none", "none", -1)]
    }

    fn encrypt(
        &self,
        plaintext: &[u8],
        _params: &CipherParams,
        _iv: &[u8],
        _key: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        Ok(plaintext.to_vec())
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        _params: &CipherParams,
        _iv: &[u8],
        _key: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        Ok(ciphertext.to_vec())
    }
}

/// Pad `data` with zero bytes up to a multiple of `block` bytes.
#[must_use]
pub fn zero_pad_bytes(data: &[u8], block: usize) -> Vec<u8> {
    let mut out = data.to_vec();
    if block > 0 {
        let rem = out.len() % block;
        if rem != 0 {
            out.resize(out.len() + block - rem, 0);
        }
    }
    out
}

/// Strip trailing zero bytes.
#[must_use]
pub fn remove_zero_padding_bytes(data: &[u8]) -> Vec<u8> {
    let end = data.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    data[..end].to_vec()
}

/// Identity cipher that runs the zero-padding helpers on the way through.
#[derive(Debug, Clone)]
pub struct PlaintextCipher {
    block: usize,
}

impl PlaintextCipher {
    /// Padding block in bytes.
    pub const BLOCK: usize = 16;

    /// Create the provider.
    #[must_use]
    pub fn new() -> Self {
        Self { block: Self::BLOCK }
    }
}

impl Default for PlaintextCipher {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for PlaintextCipher {}

impl CryptoProvider for PlaintextCipher {
    fn name(&self) -> &str {
        "plaintext"
    }

    fn blocksize(&self) -> usize {
        0
    }

    fn capabilities(&self) -> Vec<CipherSuite> {
        vec![CipherSuite::new("plaintext", "none", -1)]
    }

    fn encrypt(
        &self,
        plaintext: &[u8],
        _params: &CipherParams,
        _iv: &[u8],
        _key: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        Ok(zero_pad_bytes(plaintext, self.block))
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        _params: &CipherParams,
        _iv: &[u8],
        _key: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        Ok(remove_zero_padding_bytes(ciphertext))
    }
}
