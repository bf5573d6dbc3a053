//! # Cipher-Suite Negotiation
//!
//! The client intersects the suites advertised by the backend with the ones
//! its own providers declare, comparing normalized text, and picks one
//! uniformly at random. An empty intersection is a configuration error: no
//! fallback to plaintext happens here.

use crate::provider::{CipherSuite, CryptoProvider};
use crate::CryptoError;
use rand::seq::SliceRandom;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Union of the capabilities of `providers`, first occurrence wins.
#[must_use]
pub fn capabilities_of<'a, I>(providers: I) -> Vec<CipherSuite>
where
    I: IntoIterator<Item = &'a Arc<dyn CryptoProvider>>,
{
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for p in providers {
        for suite in p.capabilities() {
            if seen.insert(suite.normalized()) {
                out.push(suite);
            }
        }
    }
    out
}

/// Suites present in both lists, in `own` order.
#[must_use]
pub fn common_suites(backend: &[CipherSuite], own: &[CipherSuite]) -> Vec<CipherSuite> {
    let remote: BTreeSet<String> = backend.iter().map(CipherSuite::normalized).collect();
    own.iter()
        .filter(|s| remote.contains(&s.normalized()))
        .cloned()
        .collect()
}

/// Pick a suite shared by `backend` and `own` at random.
///
/// # Errors
///
/// `NoCommonSuite` when the lists are disjoint.
pub fn choose_ciphersuite(
    backend: &[CipherSuite],
    own: &[CipherSuite],
) -> Result<CipherSuite, CryptoError> {
    common_suites(backend, own)
        .choose(&mut rand::thread_rng())
        .cloned()
        .ok_or(CryptoError::NoCommonSuite)
}
