//! # Find Sessions MLE
//!
//! Loads the destinations of a notification and their key state into
//! `data[header.session]`, where `event_multiplication_mle` picks them up.
//!
//! | `multiple_sessions` | Rows pushed |
//! |---------------------|-------------|
//! | `true` (default) | every session of the caller's client |
//! | `false` | the caller's session only |

use super::Processor;
use crate::container::ProcessorEnv;
use shared_types::codes;
use shared_types::{ConfigMap, DopError, DopResult, Event, Provider};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// `find_sessions_mle`
#[derive(Debug)]
pub struct FindSessionsMle {
    multiple_sessions: AtomicBool,
}

impl FindSessionsMle {
    /// Registry name.
    pub const NAME: &'static str = "find_sessions_mle";

    /// New instance, fanning out to every session of the client.
    #[must_use]
    pub fn new() -> Self {
        Self {
            multiple_sessions: AtomicBool::new(true),
        }
    }

    /// Whether all sessions of the client are loaded.
    #[must_use]
    pub fn multiple_sessions(&self) -> bool {
        self.multiple_sessions.load(Ordering::SeqCst)
    }
}

impl Default for FindSessionsMle {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for FindSessionsMle {
    fn init(&self, config: &str) -> DopResult<()> {
        let cfg = ConfigMap::parse(config);
        self.multiple_sessions
            .store(cfg.get_bool(&["multiple_sessions"], true), Ordering::SeqCst);
        Ok(())
    }
}

impl Processor for FindSessionsMle {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn handle_event(&self, event: &Event, env: &mut ProcessorEnv) -> DopResult<()> {
        let db = Arc::clone(env.db()?);
        let session = event.header.session.as_str();

        let rows = if self.multiple_sessions() {
            db.get_client_sessions_and_mle(session)
        } else {
            db.get_session_and_mle(session)
        }
        .map_err(|e| DopError::from(codes::ERR_SESSION_MLE_LOOKUP).caused_by(e))?
        .ok_or_else(|| DopError::from(codes::ERR_PL_SESSION_TOKEN).silent())?;

        let rows = rows
            .into_iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DopError::from(codes::ERR_SERVER).caused_by(DopError::new(0, e.to_string())))?;
        debug!(session, count = rows.len(), "[FindSessions] Destinations loaded");
        env.data().push_list_elements(session, rows);
        Ok(())
    }
}
