//! # Session Rows
//!
//! A session and its encryption state live in two rows linked 1:1 by
//! `session_id`. Both are created on `start_session`, the encryption row is
//! rewritten on cipher-suite selection, and both are deleted together when
//! the session expires.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seconds since the last update after which a session is expired.
pub const MAX_SESSION_AGE_SECS: i64 = 43_200;

/// Cipher name meaning "no encryption".
pub const CIPHER_NONE: &str = "none";

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Primary key.
    pub id: u64,
    /// Login name.
    pub username: String,
}

/// A client session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Primary key, assigned by the store.
    pub id: Option<u64>,
    /// Owning user id.
    pub client: u64,
    /// Session value (the `session` header field).
    pub value: String,
    /// Authentication token bound to the session.
    pub token: Option<String>,
    /// Last activity.
    pub last_updated: DateTime<Utc>,
}

impl Session {
    /// Whether the session is older than [`MAX_SESSION_AGE_SECS`] at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        (now - self.last_updated).num_seconds() > MAX_SESSION_AGE_SECS
    }
}

/// Encryption state of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedSession {
    /// Primary key, assigned by the store.
    pub id: Option<u64>,
    /// Session row this state belongs to.
    pub session_id: u64,
    /// Cipher name, `none` until a suite is selected.
    pub cipher_name: String,
    /// Cipher mode.
    pub cipher_mode: String,
    /// Key length in bits, -1 for no key.
    pub cipher_keylength: i64,
    /// Base64 key material, `none` for no key.
    pub key: String,
    /// Ciphertext encoding name.
    pub encoding: String,
    /// Integrity function name.
    pub integrity_fun: String,
}

impl EncryptedSession {
    /// Default state of a freshly started session.
    #[must_use]
    pub fn unencrypted(session_id: u64) -> Self {
        Self {
            id: None,
            session_id,
            cipher_name: CIPHER_NONE.into(),
            cipher_mode: CIPHER_NONE.into(),
            cipher_keylength: -1,
            key: CIPHER_NONE.into(),
            encoding: CIPHER_NONE.into(),
            integrity_fun: CIPHER_NONE.into(),
        }
    }
}

/// Joined session + encryption row used for notification fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionWithMle {
    /// Owning user id.
    pub client: u64,
    /// Destination session value.
    pub value: String,
    /// Cipher name.
    pub cipher_name: String,
    /// Cipher mode.
    pub cipher_mode: String,
    /// Key length in bits.
    pub cipher_keylength: i64,
    /// Base64 key material.
    pub key: String,
    /// Integrity function name.
    pub integrity_fun: String,
    /// Ciphertext encoding name.
    pub encoding: String,
}

impl SessionWithMle {
    /// Join a session with its encryption state.
    #[must_use]
    pub fn join(session: &Session, mle: &EncryptedSession) -> Self {
        Self {
            client: session.client,
            value: session.value.clone(),
            cipher_name: mle.cipher_name.clone(),
            cipher_mode: mle.cipher_mode.clone(),
            cipher_keylength: mle.cipher_keylength,
            key: mle.key.clone(),
            integrity_fun: mle.integrity_fun.clone(),
            encoding: mle.encoding.clone(),
        }
    }

    /// Whether notifications to this session go out in plaintext.
    #[must_use]
    pub fn is_plaintext(&self) -> bool {
        self.cipher_name.eq_ignore_ascii_case(CIPHER_NONE)
    }
}
