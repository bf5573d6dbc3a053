//! `update_session`: refreshes the activity timestamp of the caller's
//! session so that it does not expire while in use.

use super::Processor;
use crate::container::ProcessorEnv;
use chrono::Utc;
use shared_types::codes;
use shared_types::{DopError, DopResult, Event, Provider};
use std::sync::Arc;

/// `update_session`
#[derive(Debug, Default)]
pub struct UpdateSession;

impl UpdateSession {
    /// Registry name.
    pub const NAME: &'static str = "update_session";
}

impl Provider for UpdateSession {}

impl Processor for UpdateSession {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn handle_event(&self, event: &Event, env: &mut ProcessorEnv) -> DopResult<()> {
        let db = Arc::clone(env.db()?);
        let token = event.param_str("auth_token").unwrap_or_default();
        let value = event.header.session.as_str();

        db.get_session(token, value)
            .map_err(DopError::silent)?
            .ok_or_else(|| DopError::new(1, "Session not found").silent())?;

        db.update_session_last_updated(value, Utc::now())
            .map_err(|e| DopError::from(codes::ERR_PL_ENC_SESSION_NOT_CREATED).caused_by(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::SessionStore;
    use crate::processors::test_support::{env_with_store, event, seed_session};
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_refreshes_timestamp() {
        let (mut env, store) = env_with_store();
        seed_session(&store, 1, "aa01", "beef");
        let old = Utc::now() - Duration::hours(2);
        store.update_session_last_updated("aa01", old).unwrap();

        let ev = event("aa01", "x", json!({"auth_token": "beef"}));
        UpdateSession.handle_event(&ev, &mut env).unwrap();
        let session = store.get_session_by_value("aa01").unwrap().unwrap();
        assert!(session.last_updated > old);
    }

    #[test]
    fn test_unknown_session_is_silent() {
        let (mut env, _store) = env_with_store();
        let ev = event("ffff", "x", json!({"auth_token": "beef"}));
        let err = UpdateSession.handle_event(&ev, &mut env).unwrap_err();
        assert_eq!(err.code, 1);
        assert!(!err.notifiable);
    }
}
