//! # In-Memory Session Store
//!
//! `databaseProvider` named `memory`. Holds users, sessions and encryption
//! rows in process memory.
//!
//! Transactions are undo journals owned by the calling thread. Every write
//! records the before-image of the row it touches in the journal of the
//! thread's innermost open unit of work; `rollback` replays that journal
//! backwards, `commit` drops it. Dispatchers sharing one store therefore
//! never commit or undo each other's writes.
//!
//! ```text
//! thread A: begin ─ write a ───────────── commit      (a kept)
//! thread B:    begin ─ write b ─────────────── rollback  (b undone)
//! ```
//!
//! A nested `begin_transaction` on the same thread opens a savepoint: its
//! `commit` folds the journal into the enclosing one, so an outer `rollback`
//! still undoes it. Id sequences are not rolled back.

use crate::adapters::ports::{ResourceManager, SessionStore};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use shared_types::codes;
use shared_types::{
    DopError, DopResult, EncryptedSession, Provider, Session, SessionWithMle, User,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, ThreadId};
use tracing::{debug, warn};

/// Before-image of one row.
#[derive(Debug, Clone)]
enum Undo {
    Session(u64, Option<Session>),
    /// Keyed by `session_id`.
    Encrypted(u64, Option<EncryptedSession>),
}

impl Undo {
    fn session_id(&self) -> u64 {
        match self {
            Self::Session(id, _) | Self::Encrypted(id, _) => *id,
        }
    }

    fn apply(self, tables: &mut Tables) {
        match self {
            Self::Session(id, Some(row)) => {
                tables.sessions.insert(id, row);
            }
            Self::Session(id, None) => {
                tables.sessions.remove(&id);
            }
            Self::Encrypted(id, Some(row)) => {
                tables.encrypted.insert(id, row);
            }
            Self::Encrypted(id, None) => {
                tables.encrypted.remove(&id);
            }
        }
    }
}

type Journal = Vec<Undo>;

#[derive(Debug, Clone, Default)]
struct Tables {
    users: BTreeMap<u64, User>,
    sessions: BTreeMap<u64, Session>,
    /// Keyed by `session_id`.
    encrypted: BTreeMap<u64, EncryptedSession>,
    next_session_id: u64,
    next_encrypted_id: u64,
}

impl Tables {
    fn session_by_value(&self, value: &str) -> Option<&Session> {
        self.sessions.values().find(|s| s.value == value)
    }

    fn joined(&self, session: &Session) -> Option<SessionWithMle> {
        let id = session.id?;
        self.encrypted
            .get(&id)
            .map(|row| SessionWithMle::join(session, row))
    }
}

/// Transaction call counters.
#[derive(Debug, Default)]
pub struct TxCounters {
    begins: AtomicU64,
    commits: AtomicU64,
    rollbacks: AtomicU64,
}

impl TxCounters {
    /// `begin_transaction` calls.
    #[must_use]
    pub fn begins(&self) -> u64 {
        self.begins.load(Ordering::SeqCst)
    }

    /// `commit` calls.
    #[must_use]
    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    /// `rollback` calls.
    #[must_use]
    pub fn rollbacks(&self) -> u64 {
        self.rollbacks.load(Ordering::SeqCst)
    }
}

/// In-process [`SessionStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    /// Open units of work per thread, innermost last.
    journals: Mutex<HashMap<ThreadId, Vec<Journal>>>,
    counters: TxCounters,
    unavailable: AtomicBool,
    opens: AtomicU64,
    failing_opens: AtomicU64,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user.
    pub fn insert_user(&self, id: u64, username: impl Into<String>) -> User {
        let user = User {
            id,
            username: username.into(),
        };
        self.tables.write().users.insert(id, user.clone());
        user
    }

    /// Make every accessor fail with a server error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make the next `count` calls of `open` fail with a recoverable
    /// server error, as a database that is not reachable yet.
    pub fn fail_opens(&self, count: u64) {
        self.failing_opens.store(count, Ordering::SeqCst);
    }

    /// `open` calls, failed ones included.
    #[must_use]
    pub fn opens(&self) -> u64 {
        self.opens.load(Ordering::SeqCst)
    }

    /// Transaction call counters.
    #[must_use]
    pub fn counters(&self) -> &TxCounters {
        &self.counters
    }

    /// Number of stored sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.tables.read().sessions.len()
    }

    /// Encryption row of the session with `value`.
    #[must_use]
    pub fn encrypted_session_for(&self, value: &str) -> Option<EncryptedSession> {
        let tables = self.tables.read();
        let id = tables.session_by_value(value)?.id?;
        tables.encrypted.get(&id).cloned()
    }

    /// Whether the calling thread has a unit of work open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.journals
            .lock()
            .get(&thread::current().id())
            .is_some_and(|stack| !stack.is_empty())
    }

    /// Add `undo` to the calling thread's innermost journal, if any.
    fn record(&self, undo: Undo) {
        if let Some(journal) = self
            .journals
            .lock()
            .get_mut(&thread::current().id())
            .and_then(|stack| stack.last_mut())
        {
            journal.push(undo);
        }
    }

    /// Innermost journal of the calling thread, removed from its stack.
    fn pop_journal(&self) -> Option<Journal> {
        let mut journals = self.journals.lock();
        let id = thread::current().id();
        let stack = journals.get_mut(&id)?;
        let journal = stack.pop();
        if stack.is_empty() {
            journals.remove(&id);
        }
        journal
    }

    fn available(&self) -> DopResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DopError::from(codes::ERR_SERVER).caused_by(DopError::new(0, "store unavailable")));
        }
        Ok(())
    }
}

impl Provider for MemoryStore {
    fn open(&self) -> DopResult<()> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let refused = self
            .failing_opens
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(DopError::from(codes::ERR_SERVER).caused_by(DopError::new(0, "store not reachable")));
        }
        Ok(())
    }

    fn close(&self) -> DopResult<()> {
        let mut journals = self.journals.lock();
        if !journals.is_empty() {
            warn!(open = journals.len(), "[MemoryStore] Closed with open transactions, discarding them");
            journals.clear();
        }
        Ok(())
    }
}

impl ResourceManager for MemoryStore {
    fn begin_transaction(&self) -> DopResult<()> {
        self.counters.begins.fetch_add(1, Ordering::SeqCst);
        let mut journals = self.journals.lock();
        let stack = journals.entry(thread::current().id()).or_default();
        stack.push(Journal::new());
        if stack.len() > 1 {
            debug!(depth = stack.len(), "[MemoryStore] Savepoint opened");
        }
        Ok(())
    }

    fn commit(&self) -> DopResult<()> {
        self.counters.commits.fetch_add(1, Ordering::SeqCst);
        let Some(journal) = self.pop_journal() else {
            return Ok(());
        };
        let mut journals = self.journals.lock();
        if let Some(outer) = journals
            .get_mut(&thread::current().id())
            .and_then(|stack| stack.last_mut())
        {
            outer.extend(journal);
        }
        Ok(())
    }

    fn rollback(&self) -> DopResult<()> {
        self.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
        let Some(journal) = self.pop_journal() else {
            return Ok(());
        };
        let undone = journal.len();
        let mut tables = self.tables.write();
        for undo in journal.into_iter().rev() {
            undo.apply(&mut tables);
        }
        debug!(undone, "[MemoryStore] Rolled back");
        Ok(())
    }
}

impl SessionStore for MemoryStore {
    fn get_session(&self, token: &str, value: &str) -> DopResult<Option<Session>> {
        self.available()?;
        Ok(self
            .tables
            .read()
            .sessions
            .values()
            .find(|s| s.value == value && s.token.as_deref() == Some(token))
            .cloned())
    }

    fn get_session_by_value(&self, value: &str) -> DopResult<Option<Session>> {
        self.available()?;
        Ok(self.tables.read().session_by_value(value).cloned())
    }

    fn get_user(&self, id: u64) -> DopResult<Option<User>> {
        self.available()?;
        Ok(self.tables.read().users.get(&id).cloned())
    }

    fn get_user_by_username(&self, username: &str) -> DopResult<Option<User>> {
        self.available()?;
        Ok(self
            .tables
            .read()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    fn create_session(&self, mut session: Session) -> DopResult<u64> {
        self.available()?;
        let mut tables = self.tables.write();
        if tables.session_by_value(&session.value).is_some() {
            return Err(DopError::from(codes::ERR_PL_SESSION_NOT_CREATED)
                .caused_by(DopError::new(0, format!("duplicate session {}", session.value))));
        }
        tables.next_session_id += 1;
        let id = tables.next_session_id;
        session.id = Some(id);
        tables.sessions.insert(id, session);
        self.record(Undo::Session(id, None));
        Ok(id)
    }

    fn create_encrypted_session(&self, mut row: EncryptedSession) -> DopResult<u64> {
        self.available()?;
        let mut tables = self.tables.write();
        if !tables.sessions.contains_key(&row.session_id) {
            return Err(DopError::from(codes::ERR_PL_SESSION_NOT_FOUND));
        }
        tables.next_encrypted_id += 1;
        let id = tables.next_encrypted_id;
        row.id = Some(id);
        let session_id = row.session_id;
        let previous = tables.encrypted.insert(session_id, row);
        self.record(Undo::Encrypted(session_id, previous));
        Ok(id)
    }

    fn update_session_last_updated(&self, value: &str, at: DateTime<Utc>) -> DopResult<()> {
        self.available()?;
        let mut tables = self.tables.write();
        let session = tables
            .sessions
            .values_mut()
            .find(|s| s.value == value)
            .ok_or_else(|| DopError::from(codes::ERR_PL_SESSION_NOT_FOUND))?;
        let before = session.clone();
        session.last_updated = at;
        if let Some(id) = before.id {
            self.record(Undo::Session(id, Some(before)));
        }
        Ok(())
    }

    fn update_encrypted_session(&self, mut row: EncryptedSession) -> DopResult<()> {
        self.available()?;
        let mut tables = self.tables.write();
        let existing = tables
            .encrypted
            .get_mut(&row.session_id)
            .ok_or_else(|| DopError::from(codes::ERR_PL_SESSION_NOT_FOUND))?;
        row.id = existing.id;
        let session_id = row.session_id;
        let before = std::mem::replace(existing, row);
        self.record(Undo::Encrypted(session_id, Some(before)));
        Ok(())
    }

    fn delete_session_and_mle(&self, session_id: u64) -> DopResult<()> {
        self.available()?;
        let mut tables = self.tables.write();
        tables.sessions.remove(&session_id);
        tables.encrypted.remove(&session_id);
        // Autonomous: no open journal may bring the rows back.
        for journal in self.journals.lock().values_mut().flatten() {
            journal.retain(|undo| undo.session_id() != session_id);
        }
        Ok(())
    }

    fn get_session_and_mle(&self, value: &str) -> DopResult<Option<Vec<SessionWithMle>>> {
        self.available()?;
        let tables = self.tables.read();
        Ok(tables
            .session_by_value(value)
            .and_then(|s| tables.joined(s))
            .map(|row| vec![row]))
    }

    fn get_client_sessions_and_mle(&self, value: &str) -> DopResult<Option<Vec<SessionWithMle>>> {
        self.available()?;
        let tables = self.tables.read();
        let Some(client) = tables.session_by_value(value).map(|s| s.client) else {
            return Ok(None);
        };
        let rows = tables
            .sessions
            .values()
            .filter(|s| s.client == client)
            .filter_map(|s| tables.joined(s))
            .collect();
        Ok(Some(rows))
    }
}
