//! # Authentication Check
//!
//! Placed first in the main pipeline of every authenticated event.
//!
//! 1. Find the session bound to `(params.auth_token, header.session)`.
//! 2. Reject it when older than `MAX_SESSION_AGE_SECS`, deleting the session
//!    and its encryption row.
//! 3. Load the owning user and push it on `data["User"]`.

use super::Processor;
use crate::container::ProcessorEnv;
use chrono::Utc;
use shared_types::codes;
use shared_types::{DopError, DopResult, Event, Provider};
use std::sync::Arc;
use tracing::{debug, info};

/// Data key the authenticated user is pushed under.
pub const USER_KEY: &str = "User";

/// `authentication_check`
#[derive(Debug, Default)]
pub struct AuthenticationCheck;

impl AuthenticationCheck {
    /// Registry name.
    pub const NAME: &'static str = "authentication_check";
}

impl Provider for AuthenticationCheck {}

impl Processor for AuthenticationCheck {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn handle_event(&self, event: &Event, env: &mut ProcessorEnv) -> DopResult<()> {
        let db = Arc::clone(env.db()?);
        let token = event.param_str("auth_token").unwrap_or_default();
        let value = event.header.session.as_str();

        let session = db
            .get_session(token, value)
            .map_err(|e| DopError::from(codes::ERR_PL_SESSION_TOKEN).silent().caused_by(e))?
            .ok_or_else(|| DopError::from(codes::ERR_PL_SESSION_TOKEN).silent())?;

        if session.is_expired_at(Utc::now()) {
            if let Some(id) = session.id {
                db.delete_session_and_mle(id)?;
            }
            info!(session = %value, "[Auth] Session expired and deleted");
            return Err(DopError::from(codes::ERR_SESSION_EXPIRED).silent());
        }

        let user = db
            .get_user(session.client)?
            .ok_or_else(|| DopError::from(codes::ERR_PL_USER_NOT_FOUND))?;
        debug!(user = user.id, "[Auth] Authenticated");
        let user = serde_json::to_value(user)
            .map_err(|e| DopError::from(codes::ERR_SERVER).caused_by(DopError::new(0, e.to_string())))?;
        env.data().push(USER_KEY, user);
        Ok(())
    }
}
