//! Binary to text encodings for MLE ciphertexts.
//!
//! | Name | Encode | Decode |
//! |------|--------|--------|
//! | `base64` | standard alphabet, padded | strict |
//! | `input`, `none` | identity | identity |

use crate::CryptoError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use shared_types::Provider;

/// Encoding or decoding function.
pub type Codec = fn(&[u8]) -> Result<Vec<u8>, CryptoError>;

/// Encoding provider contract.
pub trait EncodingProvider: Provider {
    /// Encoder registered under `name`.
    fn select_encoding(&self, name: &str) -> Option<Codec>;

    /// Decoder registered under `name`.
    fn select_decoding(&self, name: &str) -> Option<Codec>;
}

fn identity(data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    Ok(data.to_vec())
}

fn base64_encode(data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    Ok(STANDARD.encode(data).into_bytes())
}

fn base64_decode(data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    STANDARD
        .decode(data)
        .map_err(|e| CryptoError::Decode(e.to_string()))
}

/// Decode standard base64 text.
pub fn decode_base64(text: &str) -> Result<Vec<u8>, CryptoError> {
    base64_decode(text.as_bytes())
}

/// Encode bytes as standard base64 text.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Built-in encodings.
#[derive(Debug, Default, Clone)]
pub struct DefaultEncoding;

impl Provider for DefaultEncoding {}

impl EncodingProvider for DefaultEncoding {
    fn select_encoding(&self, name: &str) -> Option<Codec> {
        match name {
            "base64" => Some(base64_encode),
            "input" | "none" => Some(identity),
            _ => None,
        }
    }

    fn select_decoding(&self, name: &str) -> Option<Codec> {
        match name {
            "base64" => Some(base64_decode),
            "input" | "none" => Some(identity),
            _ => None,
        }
    }
}
