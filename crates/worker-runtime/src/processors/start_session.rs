//! # Start Session
//!
//! Emitted by the gateway when an authenticated client opens a session:
//!
//! ```json
//! {"session": "8abbc354...", "task": "1", "event": "start_session",
//!  "params": {"subject": "example@example.com", "auth_token": "hgjk..."}}
//! ```
//!
//! Creates the session row and its encryption row (cipher `none`), then
//! replies `{err: 0, msg, msg_id}`. An unknown subject is a reply
//! `{err: 503, msg}`, not a pipeline failure.

use super::{push_reply, Processor};
use crate::container::ProcessorEnv;
use chrono::Utc;
use serde_json::json;
use shared_types::codes::{self, messages};
use shared_types::{DopError, DopResult, EncryptedSession, Event, Provider, Session};
use std::sync::Arc;
use tracing::info;

/// `start_session`
#[derive(Debug, Default)]
pub struct StartSession;

impl StartSession {
    /// Registry name.
    pub const NAME: &'static str = "start_session";
}

impl Provider for StartSession {}

impl Processor for StartSession {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn handle_event(&self, event: &Event, env: &mut ProcessorEnv) -> DopResult<()> {
        let db = Arc::clone(env.db()?);
        let username = event.param_str("subject").unwrap_or_default();
        let token = event.param_str("auth_token").map(str::to_string);

        let user = db
            .get_user_by_username(username)
            .map_err(|e| DopError::from(codes::ERR_PL_USER_NOT_FOUND).caused_by(e))?;
        let Some(user) = user else {
            push_reply(
                env,
                event,
                json!({"err": codes::ERR_PL_USER_NOT_FOUND.id, "msg": codes::ERR_PL_USER_NOT_FOUND.msg}),
            );
            return Ok(());
        };

        let session_id = db
            .create_session(Session {
                id: None,
                client: user.id,
                value: event.header.session.clone(),
                token,
                last_updated: Utc::now(),
            })
            .map_err(|e| DopError::from(codes::ERR_PL_SESSION_NOT_CREATED).caused_by(e))?;

        db.create_encrypted_session(EncryptedSession::unencrypted(session_id))
            .map_err(|e| DopError::from(codes::ERR_PL_ENC_SESSION_NOT_CREATED).caused_by(e))?;

        info!(user = user.id, session_id, "[StartSession] Session created");
        push_reply(
            env,
            event,
            json!({
                "err": 0,
                "msg": messages::MSG_NEW_SESSION.msg,
                "msg_id": messages::MSG_NEW_SESSION.id,
            }),
        );
        Ok(())
    }
}
