//! # MLE Envelope
//!
//! Stateless encrypt/decrypt transform combining a cipher, an encoding and
//! (at the transport layer) an integrity digest.
//!
//! ```text
//! plaintext ──encrypt(params, iv, key)──→ ciphertext ──encode──→ text
//!                    │
//!            iv = blocksize/8 random bytes, always base64 on the wire
//!
//! envelope = {cipher_params, iv, encoding, ciphertext}
//! ```

use crate::encoding::{decode_base64, encode_base64, EncodingProvider};
use crate::provider::{CipherParams, CryptoProvider};
use crate::CryptoError;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Envelope carried in the `params` of an MLE transport event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MleEnvelope {
    /// Parameters the cipher was called with.
    pub cipher_params: CipherParams,
    /// Base64 IV.
    pub iv: String,
    /// Encoding applied to the ciphertext.
    pub encoding: String,
    /// Encoded ciphertext.
    pub ciphertext: String,
}

/// Fresh random IV of `blocksize / 8` bytes.
#[must_use]
pub fn generate_iv(blocksize_bits: usize) -> Vec<u8> {
    let mut iv = vec![0u8; blocksize_bits / 8];
    rand::thread_rng().fill_bytes(&mut iv);
    iv
}

/// Encrypt `plaintext` and wrap it in an envelope.
///
/// # Errors
///
/// `UnknownEncoding` when `encoding` is not served by `encodings`; cipher
/// errors are passed through.
pub fn encrypt_and_wrap(
    cipher: &dyn CryptoProvider,
    plaintext: &str,
    params: &CipherParams,
    key: &[u8],
    encoding: &str,
    encodings: &dyn EncodingProvider,
) -> Result<MleEnvelope, CryptoError> {
    let encode = encodings
        .select_encoding(encoding)
        .ok_or_else(|| CryptoError::UnknownEncoding(encoding.to_string()))?;

    let iv = generate_iv(cipher.blocksize());
    let ciphertext = cipher.encrypt(plaintext.as_bytes(), params, &iv, key)?;
    let text = String::from_utf8(encode(&ciphertext)?)
        .map_err(|e| CryptoError::Decode(format!("encoding '{encoding}' is not text: {e}")))?;

    Ok(MleEnvelope {
        cipher_params: params.clone(),
        iv: encode_base64(&iv),
        encoding: encoding.to_string(),
        ciphertext: text,
    })
}

/// Inverse of [`encrypt_and_wrap`].
///
/// # Errors
///
/// `UnknownEncoding`, `Decode` on malformed base64 or non UTF-8 plaintext,
/// and cipher errors.
pub fn unwrap_and_decrypt(
    cipher: &dyn CryptoProvider,
    envelope: &MleEnvelope,
    key: &[u8],
    encodings: &dyn EncodingProvider,
) -> Result<String, CryptoError> {
    let decode = encodings
        .select_decoding(&envelope.encoding)
        .ok_or_else(|| CryptoError::UnknownEncoding(envelope.encoding.clone()))?;

    let iv = decode_base64(&envelope.iv)?;
    let ciphertext = decode(envelope.ciphertext.as_bytes())?;
    let plaintext = cipher.decrypt(&ciphertext, &envelope.cipher_params, &iv, key)?;
    String::from_utf8(plaintext).map_err(|e| CryptoError::Decode(e.to_string()))
}
