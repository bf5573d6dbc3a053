//! # MLE Transport Events
//!
//! Sealing turns a DOP event into a transport event addressed to one
//! session; opening is the receiving side.
//!
//! ```text
//! seal:  event ─strip session─→ json ─┬─ integrity(json) ──→ digest
//!                                     └─ encrypt_and_wrap ─→ envelope
//!        {"cipher_suite_name", "integrity_fun", "digest", "mle": 1,
//!         "params": envelope}
//!
//! cipher "none": {"task", "event", "mle": 0, "params": original params}
//! ```

use crate::encoding::{decode_base64, DefaultEncoding, EncodingProvider};
use crate::envelope::{encrypt_and_wrap, unwrap_and_decrypt, MleEnvelope};
use crate::integrity::{DefaultIntegrity, IntegrityProvider};
use crate::negotiation::capabilities_of;
use crate::provider::{CipherParams, CipherSuite, CryptoProvider};
use crate::CryptoError;
use serde_json::Value;
use shared_types::session::CIPHER_NONE;
use shared_types::{DopError, DopResult, Event, EventHeader, SessionWithMle};
use std::collections::HashMap;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Crypto, encoding and integrity providers used by the envelope.
#[derive(Clone)]
pub struct MleProviders {
    /// Crypto providers by lowercase name.
    pub crypto: HashMap<String, Arc<dyn CryptoProvider>>,
    /// Encoding provider.
    pub encoding: Arc<dyn EncodingProvider>,
    /// Integrity provider.
    pub integrity: Arc<dyn IntegrityProvider>,
}

impl MleProviders {
    /// Providers with the given ciphers and the default encoding/integrity.
    #[must_use]
    pub fn with_ciphers(ciphers: Vec<Arc<dyn CryptoProvider>>) -> Self {
        Self {
            crypto: ciphers
                .into_iter()
                .map(|c| (c.name().to_ascii_lowercase(), c))
                .collect(),
            encoding: Arc::new(DefaultEncoding),
            integrity: Arc::new(DefaultIntegrity),
        }
    }

    /// Cipher registered under `name` (case-insensitive).
    pub fn cipher(&self, name: &str) -> Result<&Arc<dyn CryptoProvider>, CryptoError> {
        self.crypto
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| CryptoError::UnknownCipher(name.to_string()))
    }

    /// Union of all provider capabilities, ordered by provider name.
    #[must_use]
    pub fn capabilities(&self) -> Vec<CipherSuite> {
        let mut names: Vec<&String> = self.crypto.keys().collect();
        names.sort();
        capabilities_of(names.into_iter().filter_map(|n| self.crypto.get(n)))
    }
}

impl std::fmt::Debug for MleProviders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.crypto.keys().collect();
        names.sort();
        f.debug_struct("MleProviders").field("crypto", &names).finish()
    }
}

/// Per-session key state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyState {
    /// Cipher name.
    pub cipher_name: String,
    /// Cipher mode.
    pub cipher_mode: String,
    /// Key length in bits.
    pub cipher_keylength: i64,
    /// Base64 key.
    pub key: String,
    /// Ciphertext encoding.
    pub encoding: String,
    /// Integrity function.
    pub integrity_fun: String,
}

impl KeyState {
    /// Whether events go out unencrypted.
    #[must_use]
    pub fn is_plaintext(&self) -> bool {
        self.cipher_name.eq_ignore_ascii_case(CIPHER_NONE)
    }

    fn params(&self) -> CipherParams {
        CipherParams {
            mode: self.cipher_mode.clone(),
            keylength: self.cipher_keylength,
        }
    }

    fn key_bytes(&self) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        decode_base64(&self.key).map(Zeroizing::new)
    }
}

impl From<&SessionWithMle> for KeyState {
    fn from(row: &SessionWithMle) -> Self {
        Self {
            cipher_name: row.cipher_name.clone(),
            cipher_mode: row.cipher_mode.clone(),
            cipher_keylength: row.cipher_keylength,
            key: row.key.clone(),
            encoding: row.encoding.clone(),
            integrity_fun: row.integrity_fun.clone(),
        }
    }
}

/// Seal `event` for one session.
///
/// The session is stripped from the header before serialization; the
/// returned event carries no session either, the caller addresses it.
///
/// # Errors
///
/// `UnknownIntegrity` when the session's integrity function is not served;
/// cipher, key and encoding errors otherwise.
pub fn seal_event(
    event: &Event,
    key: &KeyState,
    providers: &MleProviders,
) -> Result<Event, CryptoError> {
    let mut plain = event.clone();
    plain.header.session = String::new();

    if key.is_plaintext() {
        let mut header = EventHeader::new("", plain.header.task, plain.header.event);
        header.mle = Some(0);
        return Ok(Event::new(header, plain.payload));
    }

    let cipher = providers.cipher(&key.cipher_name)?;
    let integrity = providers
        .integrity
        .select_integrity_function(&key.integrity_fun)
        .ok_or_else(|| CryptoError::UnknownIntegrity(key.integrity_fun.clone()))?;
    let secret = key.key_bytes()?;

    let text = plain.to_json();
    let envelope = encrypt_and_wrap(
        cipher.as_ref(),
        &text,
        &key.params(),
        &secret,
        &key.encoding,
        providers.encoding.as_ref(),
    )?;
    let digest = integrity(text.as_bytes());

    let mut header = EventHeader::transport("", &key.cipher_name, &key.integrity_fun, digest);
    header.mle = Some(1);
    let payload = match serde_json::to_value(envelope) {
        Ok(Value::Object(map)) => map,
        Ok(_) => return Err(CryptoError::EncryptionFailed("envelope is not an object".into())),
        Err(e) => return Err(CryptoError::EncryptionFailed(e.to_string())),
    };
    Ok(Event::new(header, payload))
}

/// Open a transport event with the session key (base64).
///
/// Events with `mle != 1` are returned unchanged.
///
/// # Errors
///
/// `IntegrityMismatch` when the recovered plaintext does not hash to the
/// received digest; decode and cipher errors otherwise.
pub fn open_event(
    event: &Event,
    key_b64: &str,
    providers: &MleProviders,
) -> Result<Event, CryptoError> {
    if event.header.mle != Some(1) {
        return Ok(event.clone());
    }
    let header = &event.header;
    let suite = header.cipher_suite_name.as_deref().unwrap_or_default();
    let fun = header.integrity_fun.as_deref().unwrap_or_default();
    let received = header.digest.clone().unwrap_or_default();

    let cipher = providers.cipher(suite)?;
    let envelope: MleEnvelope = serde_json::from_value(Value::Object(event.payload.clone()))
        .map_err(|e| CryptoError::Decode(e.to_string()))?;
    let secret = Zeroizing::new(decode_base64(key_b64)?);

    let text = unwrap_and_decrypt(
        cipher.as_ref(),
        &envelope,
        &secret,
        providers.encoding.as_ref(),
    )?;

    let integrity = providers
        .integrity
        .select_integrity_function(fun)
        .ok_or_else(|| CryptoError::UnknownIntegrity(fun.to_string()))?;
    let computed = integrity(text.as_bytes());
    if computed != received {
        return Err(CryptoError::IntegrityMismatch { received, computed });
    }

    Event::from_json(&text).map_err(|e| CryptoError::Decode(e.msg))
}

/// Parse an inbound transport message and open it with the session key.
///
/// # Errors
///
/// 821 when `json` is not an event, 21268 on a digest mismatch, and the
/// other MLE failures mapped through `DopError::from`.
pub fn open_transport_event(
    json: &str,
    key_b64: &str,
    providers: &MleProviders,
) -> DopResult<Event> {
    let event = Event::from_json(json)?;
    open_event(&event, key_b64, providers).map_err(DopError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::encode_base64;
    use crate::none::NoneCipher;
    use crate::symmetric::AesGcmCipher;
    use serde_json::{json, Map};

    fn providers() -> MleProviders {
        MleProviders::with_ciphers(vec![Arc::new(NoneCipher), Arc::new(AesGcmCipher)])
    }

    fn event() -> Event {
        let mut params = Map::new();
        params.insert("err".into(), json!(0));
        params.insert("msg".into(), json!("hello"));
        Event::new(EventHeader::new("cafe", "7", "notify"), params)
    }

    fn aes_key() -> KeyState {
        KeyState {
            cipher_name: "AES".into(),
            cipher_mode: "gcm".into(),
            cipher_keylength: 256,
            key: encode_base64(&[8u8; 32]),
            encoding: "base64".into(),
            integrity_fun: "crc16".into(),
        }
    }

    #[test]
    fn test_plaintext_session_gets_mle_zero() {
        let key = KeyState {
            cipher_name: "none".into(),
            cipher_mode: "none".into(),
            cipher_keylength: -1,
            key: "none".into(),
            encoding: "none".into(),
            integrity_fun: "none".into(),
        };
        let sealed = seal_event(&event(), &key, &providers()).unwrap();
        let v = sealed.to_value();
        assert_eq!(v["mle"], 0);
        assert!(v.get("session").is_none());
        assert_eq!(v["params"], event().to_value()["params"]);
    }

    #[test]
    fn test_seal_then_open() {
        let p = providers();
        let key = aes_key();
        let sealed = seal_event(&event(), &key, &p).unwrap();
        assert_eq!(sealed.header.mle, Some(1));
        assert_eq!(sealed.header.cipher_suite_name.as_deref(), Some("AES"));

        // Through the wire and back
        let wire = Event::from_json(&sealed.to_json()).unwrap();
        let opened = open_event(&wire, &key.key, &p).unwrap();
        assert_eq!(opened.header.event, "notify");
        assert_eq!(opened.header.session, shared_types::NOT_AVAILABLE);
        assert_eq!(opened.payload, event().payload);
    }

    #[test]
    fn test_tampered_digest_is_rejected() {
        let p = providers();
        let key = aes_key();
        let mut sealed = seal_event(&event(), &key, &p).unwrap();
        sealed.header.digest = Some("0000".into());
        let err = open_event(&sealed, &key.key, &p).unwrap_err();
        assert!(matches!(err, CryptoError::IntegrityMismatch { .. }));

        let err = open_transport_event(&sealed.to_json(), &key.key, &p).unwrap_err();
        assert_eq!(err.code, 21268);
        assert!(err.notifiable);
    }

    #[test]
    fn test_unknown_integrity_function() {
        let mut key = aes_key();
        key.integrity_fun = "md5".into();
        let err = seal_event(&event(), &key, &providers()).unwrap_err();
        assert_eq!(err, CryptoError::UnknownIntegrity("md5".into()));
    }

    #[test]
    fn test_unknown_cipher() {
        let mut key = aes_key();
        key.cipher_name = "rc4".into();
        assert!(matches!(
            seal_event(&event(), &key, &providers()),
            Err(CryptoError::UnknownCipher(_))
        ));
    }

    #[test]
    fn test_capabilities_are_sorted_by_provider() {
        let caps = providers().capabilities();
        assert_eq!(caps[0].name, "aes");
        assert_eq!(caps.last().map(|c| c.name.as_str()), Some("none"));
    }
}
