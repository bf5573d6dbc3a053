//! # Resource Manager Ports
//!
//! Contracts the dispatcher and the built-in processors depend on. The
//! dispatcher only sees [`ResourceManager`]; processors reach the persistence
//! accessors through [`SessionStore`].
//!
//! ```text
//!            ┌──────────────────────┐
//!            │   ResourceManager    │  begin / commit / rollback
//!            └──────────┬───────────┘
//!                 ┌─────┴──────┐
//!                 ▼            ▼
//!          SessionStore     (ledger)
//!          MemoryStore      NullLedger
//! ```
//!
//! Implementations are shared by every dispatch and must be safe for
//! concurrent use.

use chrono::{DateTime, Utc};
use shared_types::{DopResult, EncryptedSession, Provider, Session, SessionWithMle, User};

/// Transaction contract of a resource manager.
pub trait ResourceManager: Provider {
    /// Start a unit of work.
    fn begin_transaction(&self) -> DopResult<()>;

    /// Make the unit of work durable.
    fn commit(&self) -> DopResult<()>;

    /// Discard the unit of work.
    fn rollback(&self) -> DopResult<()>;
}

/// Persistence accessors used by the session and MLE processors.
pub trait SessionStore: ResourceManager {
    /// Session matching both token and value.
    fn get_session(&self, token: &str, value: &str) -> DopResult<Option<Session>>;

    /// Session by value regardless of token.
    fn get_session_by_value(&self, value: &str) -> DopResult<Option<Session>>;

    /// User by id.
    fn get_user(&self, id: u64) -> DopResult<Option<User>>;

    /// User by login name.
    fn get_user_by_username(&self, username: &str) -> DopResult<Option<User>>;

    /// Insert a session; returns the assigned id.
    fn create_session(&self, session: Session) -> DopResult<u64>;

    /// Insert the encryption row of a session.
    fn create_encrypted_session(&self, row: EncryptedSession) -> DopResult<u64>;

    /// Refresh the activity timestamp of the session with `value`.
    fn update_session_last_updated(&self, value: &str, at: DateTime<Utc>) -> DopResult<()>;

    /// Replace the encryption row of `session_id`.
    fn update_encrypted_session(&self, row: EncryptedSession) -> DopResult<()>;

    /// Delete a session and its encryption row.
    ///
    /// Applied outside the current unit of work: an expired session stays
    /// deleted even if the dispatch that found it rolls back.
    fn delete_session_and_mle(&self, session_id: u64) -> DopResult<()>;

    /// The session with `value` joined with its encryption row.
    fn get_session_and_mle(&self, value: &str) -> DopResult<Option<Vec<SessionWithMle>>>;

    /// Every session of the client owning `value`, joined with their
    /// encryption rows.
    fn get_client_sessions_and_mle(&self, value: &str) -> DopResult<Option<Vec<SessionWithMle>>>;
}
