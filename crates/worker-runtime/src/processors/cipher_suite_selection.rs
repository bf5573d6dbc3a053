//! # Cipher Suite Selection
//!
//! Second phase of the MLE handshake. The client sends the suite it picked
//! and a fresh key:
//!
//! ```json
//! {"event": "dop_cipher_suite_selection",
//!  "params": {"cipher_suite": {"name": "aes", "mode": "gcm", "keylength": 256},
//!             "cipher_key": "<base64>", "auth_token": "..."}}
//! ```
//!
//! | Check | Reply `err` |
//! |-------|-------------|
//! | suite served by a configured provider | 802 |
//! | `keylength / 8` equals the decoded key length | 803 |
//! | session exists | 514 |
//!
//! On success the encryption row is rewritten (encoding `base64`, integrity
//! `crc16`) and the reply is `{err: 0, phase: 1}`. Failed checks are replies,
//! not pipeline failures; only storage errors abort the pipeline.

use super::{push_reply, Processor};
use crate::container::ProcessorEnv;
use serde_json::json;
use shared_crypto::{capabilities_of, decode_base64, CipherSuite};
use shared_types::codes::{self, ErrorCode};
use shared_types::{DopError, DopResult, EncryptedSession, Event, Provider};
use std::sync::Arc;
use tracing::{info, warn};

/// Label this processor answers.
pub const SELECTION_EVENT: &str = "dop_cipher_suite_selection";

/// Encoding stored for negotiated sessions.
pub const SESSION_ENCODING: &str = "base64";

/// Integrity function stored for negotiated sessions.
pub const SESSION_INTEGRITY: &str = "crc16";

/// `cipher_suite_selection`
#[derive(Debug, Default)]
pub struct CipherSuiteSelection;

impl CipherSuiteSelection {
    /// Registry name.
    pub const NAME: &'static str = "cipher_suite_selection";

    fn refuse(env: &mut ProcessorEnv, event: &Event, code: ErrorCode) -> DopResult<()> {
        warn!(code = code.id, session = %event.header.session, "[CipherSelection] {}", code.msg);
        push_reply(env, event, json!({"err": code.id, "phase": 1}));
        Ok(())
    }
}

impl Provider for CipherSuiteSelection {}

impl Processor for CipherSuiteSelection {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn handle_event(&self, event: &Event, env: &mut ProcessorEnv) -> DopResult<()> {
        if event.label() != SELECTION_EVENT {
            return Ok(());
        }

        let requested: Option<CipherSuite> = event
            .payload
            .get("cipher_suite")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok());
        let served = env.providers.crypto()?;
        let served = capabilities_of(served.values());
        let Some(suite) = requested.filter(|s| served.iter().any(|c| c.normalized() == s.normalized()))
        else {
            return Self::refuse(env, event, codes::ERR_CIPHER_SUITE);
        };

        let key = event.param_str("cipher_key").unwrap_or_default().to_string();
        // Integer division truncates toward zero: -1 / 8 == 0.
        let expected = suite.keylength / 8;
        match decode_base64(&key) {
            Ok(bytes) if i64::try_from(bytes.len()).ok() == Some(expected) => {}
            _ => return Self::refuse(env, event, codes::ERR_LEN_KEY),
        }

        let db = Arc::clone(env.db()?);
        let session = db
            .get_session_by_value(&event.header.session)
            .map_err(|e| DopError::from(codes::ERR_PL_SESSION_NOT_FOUND).caused_by(e))?;
        let Some(session_id) = session.and_then(|s| s.id) else {
            return Self::refuse(env, event, codes::ERR_PL_SESSION_NOT_FOUND);
        };

        db.update_encrypted_session(EncryptedSession {
            id: None,
            session_id,
            cipher_name: suite.name.clone(),
            cipher_mode: suite.mode.clone(),
            cipher_keylength: suite.keylength,
            key,
            encoding: SESSION_ENCODING.into(),
            integrity_fun: SESSION_INTEGRITY.into(),
        })
        .map_err(|e| DopError::from(codes::ERR_PL_ENC_SESSION_NOT_CREATED).caused_by(e))?;

        info!(session_id, suite = %suite.normalized(), "[CipherSelection] Suite stored");
        push_reply(env, event, json!({"err": 0, "phase": 1}));
        Ok(())
    }
}
