//! `blockchainWorkerProvider` named `null`: a resource manager with nothing
//! behind it. Counts transaction calls and can be scripted to fail, which
//! is what the dispatcher tests need from the second manager.

use crate::adapters::ports::ResourceManager;
use parking_lot::Mutex;
use shared_types::{DopError, DopResult, Provider};
use std::sync::atomic::{AtomicU64, Ordering};

/// Transaction step that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerStep {
    /// `begin_transaction`
    Begin,
    /// `commit`
    Commit,
    /// `rollback`
    Rollback,
}

/// Blockchain manager used when no chain client is configured.
#[derive(Debug, Default)]
pub struct NullLedger {
    begins: AtomicU64,
    commits: AtomicU64,
    rollbacks: AtomicU64,
    failing: Mutex<Option<(LedgerStep, DopError)>>,
}

impl NullLedger {
    /// New ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call of `step` fail with `err`.
    pub fn fail_on(&self, step: LedgerStep, err: DopError) {
        *self.failing.lock() = Some((step, err));
    }

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

    fn step(&self, step: LedgerStep, counter: &AtomicU64) -> DopResult<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        match &*self.failing.lock() {
            Some((s, err)) if *s == step => Err(err.clone()),
            _ => Ok(()),
        }
    }
}

impl Provider for NullLedger {}

impl ResourceManager for NullLedger {
    fn begin_transaction(&self) -> DopResult<()> {
        self.step(LedgerStep::Begin, &self.begins)
    }

    fn commit(&self) -> DopResult<()> {
        self.step(LedgerStep::Commit, &self.commits)
    }

    fn rollback(&self) -> DopResult<()> {
        self.step(LedgerStep::Rollback, &self.rollbacks)
    }
}
