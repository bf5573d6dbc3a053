//! # Symmetric Ciphers
//!
//! AEAD ciphers pluggable into the MLE envelope.
//!
//! | Provider | Suites | IV |
//! |----------|--------|----|
//! | `aes` | `aes/gcm/128`, `aes/gcm/256` | 96-bit |
//! | `xchacha20` | `xchacha20/poly1305/256` | 192-bit |
//!
//! ## Security Properties
//!
//! - **XChaCha20-Poly1305**: 192-bit nonce, constant-time ARX design
//! - **AES-GCM**: Use only with AES-NI hardware acceleration

use crate::provider::{CipherParams, CipherSuite, CryptoProvider};
use crate::CryptoError;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use shared_types::Provider;

fn check_iv(iv: &[u8], expected: usize) -> Result<(), CryptoError> {
    if iv.len() != expected {
        return Err(CryptoError::InvalidNonceLength {
            expected,
            actual: iv.len(),
        });
    }
    Ok(())
}

fn check_key(key: &[u8], expected: usize) -> Result<(), CryptoError> {
    if key.len() != expected {
        return Err(CryptoError::InvalidKeyLength {
            expected,
            actual: key.len(),
        });
    }
    Ok(())
}

fn check_mode(params: &CipherParams, mode: &str) -> Result<(), CryptoError> {
    if !params.mode.eq_ignore_ascii_case(mode) {
        return Err(CryptoError::UnsupportedMode(params.mode.clone()));
    }
    Ok(())
}

/// AES in GCM mode, 128 or 256 bit keys.
#[derive(Debug, Default, Clone)]
pub struct AesGcmCipher;

impl AesGcmCipher {
    const IV_BYTES: usize = 12;

    fn run(
        &self,
        encrypt: bool,
        data: &[u8],
        params: &CipherParams,
        iv: &[u8],
        key: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        check_mode(params, "gcm")?;
        check_iv(iv, Self::IV_BYTES)?;
        let nonce = GenericArray::from_slice(iv);
        let fail = |e: aes_gcm::Error| {
            if encrypt {
                CryptoError::EncryptionFailed(e.to_string())
            } else {
                CryptoError::DecryptionFailed(e.to_string())
            }
        };

        match params.keylength {
            128 => {
                check_key(key, 16)?;
                let cipher = Aes128Gcm::new(GenericArray::from_slice(key));
                if encrypt {
                    cipher.encrypt(nonce, data).map_err(fail)
                } else {
                    cipher.decrypt(nonce, data).map_err(fail)
                }
            }
            256 => {
                check_key(key, 32)?;
                let cipher = Aes256Gcm::new(GenericArray::from_slice(key));
                if encrypt {
                    cipher.encrypt(nonce, data).map_err(fail)
                } else {
                    cipher.decrypt(nonce, data).map_err(fail)
                }
            }
            other => Err(CryptoError::InvalidKeyLength {
                expected: 32,
                actual: usize::try_from(other / 8).unwrap_or(0),
            }),
        }
    }
}

impl Provider for AesGcmCipher {}

impl CryptoProvider for AesGcmCipher {
    fn name(&self) -> &str {
        "aes"
    }

    fn blocksize(&self) -> usize {
        Self::IV_BYTES * 8
    }

    fn capabilities(&self) -> Vec<CipherSuite> {
        vec![
            CipherSuite::new("aes", "gcm", 128),
            CipherSuite::new("aes", "gcm", 256),
        ]
    }

    fn encrypt(
        &self,
        plaintext: &[u8],
        params: &CipherParams,
        iv: &[u8],
        key: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        self.run(true, plaintext, params, iv, key)
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        params: &CipherParams,
        iv: &[u8],
        key: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        self.run(false, ciphertext, params, iv, key)
    }
}

/// XChaCha20-Poly1305 with 256 bit keys.
#[derive(Debug, Default, Clone)]
pub struct XChaChaCipher;

impl XChaChaCipher {
    const IV_BYTES: usize = 24; // XChaCha20 uses 24-byte nonce

    fn cipher(params: &CipherParams, iv: &[u8], key: &[u8]) -> Result<XChaCha20Poly1305, CryptoError> {
        check_mode(params, "poly1305")?;
        check_iv(iv, Self::IV_BYTES)?;
        check_key(key, 32)?;
        Ok(XChaCha20Poly1305::new(Key::from_slice(key)))
    }
}

impl Provider for XChaChaCipher {}

impl CryptoProvider for XChaChaCipher {
    fn name(&self) -> &str {
        "xchacha20"
    }

    fn blocksize(&self) -> usize {
        Self::IV_BYTES * 8
    }

    fn capabilities(&self) -> Vec<CipherSuite> {
        vec![CipherSuite::new("xchacha20", "poly1305", 256)]
    }

    fn encrypt(
        &self,
        plaintext: &[u8],
        params: &CipherParams,
        iv: &[u8],
        key: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        Self::cipher(params, iv, key)?
            .encrypt(XNonce::from_slice(iv), plaintext)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        params: &CipherParams,
        iv: &[u8],
        key: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        Self::cipher(params, iv, key)?
            .decrypt(XNonce::from_slice(iv), ciphertext)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(mode: &str, keylength: i64) -> CipherParams {
        CipherParams {
            mode: mode.into(),
            keylength,
        }
    }

    #[test]
    fn test_aes_roundtrip_both_key_sizes() {
        let c = AesGcmCipher;
        let iv = [7u8; 12];
        for (bits, key) in [(128, vec![1u8; 16]), (256, vec![2u8; 32])] {
            let p = params("gcm", bits);
            let ct = c.encrypt(b"Hello, DOP!", &p, &iv, &key).unwrap();
            assert_eq!(c.decrypt(&ct, &p, &iv, &key).unwrap(), b"Hello, DOP!");
        }
    }

    #[test]
    fn test_aes_rejects_wrong_key_length() {
        let err = AesGcmCipher
            .encrypt(b"x", &params("gcm", 256), &[0u8; 12], &[0u8; 16])
            .unwrap_err();
        assert_eq!(
            err,
            CryptoError::InvalidKeyLength {
                expected: 32,
                actual: 16
            }
        );
    }

    #[test]
    fn test_aes_rejects_wrong_iv_length() {
        let err = AesGcmCipher
            .encrypt(b"x", &params("gcm", 128), &[0u8; 8], &[0u8; 16])
            .unwrap_err();
        assert!(matches!(err, CryptoError::InvalidNonceLength { .. }));
    }

    #[test]
    fn test_xchacha_tampered_ciphertext_fails() {
        let c = XChaChaCipher;
        let p = params("poly1305", 256);
        let key = [9u8; 32];
        let iv = [3u8; 24];
        let mut ct = c.encrypt(b"Secret message", &p, &iv, &key).unwrap();
        ct[0] ^= 0xFF; // Tamper
        assert!(c.decrypt(&ct, &p, &iv, &key).is_err());
    }

    #[test]
    fn test_xchacha_wrong_mode() {
        let err = XChaChaCipher
            .encrypt(b"x", &params("cbc", 256), &[0u8; 24], &[0u8; 32])
            .unwrap_err();
        assert_eq!(err, CryptoError::UnsupportedMode("cbc".into()));
    }

    #[test]
    fn test_blocksizes() {
        assert_eq!(AesGcmCipher.blocksize(), 96);
        assert_eq!(XChaChaCipher.blocksize(), 192);
    }
}
