//! # MLE Client
//!
//! Client side of the protocol: negotiate a suite from the backend's
//! `cipher_suites` reply, generate a key, build the selection parameters,
//! then open every notification received on the session topic.

use crate::encoding::encode_base64;
use crate::negotiation::choose_ciphersuite;
use crate::provider::CipherSuite;
use crate::transport::{open_transport_event, MleProviders};
use crate::CryptoError;
use rand::RngCore;
use serde_json::{json, Value};
use shared_types::{DopResult, Event};
use tracing::debug;
use zeroize::Zeroizing;

/// Negotiated client state.
pub struct MleClient {
    providers: MleProviders,
    suite: Option<CipherSuite>,
    key: Zeroizing<String>,
}

impl MleClient {
    /// Client using `providers` for its own capabilities.
    #[must_use]
    pub fn new(providers: MleProviders) -> Self {
        Self {
            providers,
            suite: None,
            key: Zeroizing::new(String::new()),
        }
    }

    /// Suite chosen by [`MleClient::negotiate`].
    #[must_use]
    pub fn suite(&self) -> Option<&CipherSuite> {
        self.suite.as_ref()
    }

    /// Pick a suite among the backend's and generate a matching key.
    ///
    /// # Errors
    ///
    /// `NoCommonSuite` when nothing matches.
    pub fn negotiate(&mut self, backend: &[CipherSuite]) -> Result<&CipherSuite, CryptoError> {
        let suite = choose_ciphersuite(backend, &self.providers.capabilities())?;
        let len = usize::try_from(suite.keylength.max(0) / 8).unwrap_or(0);
        let mut key = Zeroizing::new(vec![0u8; len]);
        rand::thread_rng().fill_bytes(&mut key);
        self.key = Zeroizing::new(encode_base64(&key));
        debug!(suite = %suite.normalized(), "[MleClient] Suite negotiated");
        Ok(self.suite.insert(suite))
    }

    /// Parse the `cipher_suites` list of a client-ready reply.
    ///
    /// # Errors
    ///
    /// `Decode` when the list is missing or malformed.
    pub fn suites_from_reply(reply: &Event) -> Result<Vec<CipherSuite>, CryptoError> {
        let list = reply
            .payload
            .get("cipher_suites")
            .cloned()
            .ok_or_else(|| CryptoError::Decode("reply carries no cipher_suites".into()))?;
        serde_json::from_value(list).map_err(|e| CryptoError::Decode(e.to_string()))
    }

    /// `{cipher_suite, cipher_key}` parameters of a suite-selection event.
    #[must_use]
    pub fn selection_params(&self) -> Value {
        match &self.suite {
            Some(s) => json!({
                "cipher_suite": {"name": s.name, "mode": s.mode, "keylength": s.keylength},
                "cipher_key": self.key.as_str(),
            }),
            None => json!({}),
        }
    }

    /// Open a notification: plaintext events pass through, MLE events are
    /// decrypted and their digest verified.
    ///
    /// # Errors
    ///
    /// 21268 when the digest does not match; other MLE failures mapped
    /// through `DopError::from`.
    pub fn open(&self, json: &str) -> DopResult<Event> {
        open_transport_event(json, &self.key, &self.providers)
    }
}
