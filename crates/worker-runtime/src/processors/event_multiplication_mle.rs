//! # Event Multiplication MLE
//!
//! Finally processor that turns each buffered event into one event per
//! destination session, sealed with that session's key state.
//!
//! ```text
//! events[label] = [e (session = S)]          data[S] = [row1, row2]
//!                     │
//!                     ├── seal(e, row1) ──→ events[row1.value]
//!                     └── seal(e, row2) ──→ events[row2.value]
//! ```
//!
//! Events whose session has no rows in `data` are dropped. A `none` cipher
//! yields the plaintext event with `mle = 0`.

use super::FinallyProcessor;
use crate::container::{PipelineStacks, Providers};
use shared_crypto::{seal_event, CryptoError, KeyState};
use shared_types::codes;
use shared_types::{DopError, DopResult, Event, Provider, SessionWithMle};
use tracing::{debug, warn};

/// `event_multiplication_mle`
#[derive(Debug, Default)]
pub struct EventMultiplicationMle;

impl EventMultiplicationMle {
    /// Registry name.
    pub const NAME: &'static str = "event_multiplication_mle";
}

fn seal_error(e: CryptoError) -> DopError {
    let code = match e {
        CryptoError::UnknownIntegrity(_) => codes::ERR_MLE_INTEGRITY_FUN,
        _ => codes::ERR_MLE_ENCAPSULATION,
    };
    DopError::from(code).caused_by(DopError::new(0, e.to_string()))
}

impl Provider for EventMultiplicationMle {}

impl FinallyProcessor for EventMultiplicationMle {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn handle_pipeline_stack(
        &self,
        stacks: &mut PipelineStacks,
        providers: &Providers,
    ) -> DopResult<()> {
        let pending: Vec<Event> = stacks
            .events
            .properties()
            .iter()
            .flat_map(|key| stacks.events.pop(key))
            .collect();
        if pending.is_empty() {
            return Ok(());
        }
        let mle = providers.mle()?;

        for event in pending {
            let rows = stacks.data.get(&event.header.session);
            if rows.is_empty() {
                warn!(session = %event.header.session, label = %event.label(),
                    "[Multiplication] No destination sessions, event dropped");
                continue;
            }
            let rows: Vec<SessionWithMle> = rows
                .iter()
                .map(|v| serde_json::from_value(v.clone()))
                .collect::<Result<_, _>>()
                .map_err(|e| {
                    DopError::from(codes::ERR_MLE_ENCAPSULATION).caused_by(DopError::new(0, e.to_string()))
                })?;
            for row in rows {
                let sealed = seal_event(&event, &KeyState::from(&row), &mle).map_err(seal_error)?;
                debug!(destination = %row.value, mle = ?sealed.header.mle, "[Multiplication] Event sealed");
                stacks.events.push(&row.value, sealed);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::test_support::{env_with_store, event};
    use serde_json::{json, Value};
    use shared_crypto::{encode_base64, open_event};
    use shared_types::session::CIPHER_NONE;

    fn row(value: &str, cipher: &str, key: &str, integrity: &str) -> Value {
        let (mode, keylength, encoding) = if cipher == CIPHER_NONE {
            ("none", -1, "none")
        } else {
            ("gcm", 256, "base64")
        };
        json!({
            "client": 1,
            "value": value,
            "cipher_name": cipher,
            "cipher_mode": mode,
            "cipher_keylength": keylength,
            "key": key,
            "integrity_fun": integrity,
            "encoding": encoding,
        })
    }

    #[test]
    fn test_none_cipher_passes_plaintext() {
        let (mut env, _) = env_with_store();
        let params = json!({"err": 0, "phase": 1});
        env.stacks.events.push("dop_client_ready", event("aa01", "dop_client_ready", params.clone()));
        env.stacks.data.push("aa01", row("aa01", "none", "none", "none"));

        EventMultiplicationMle
            .handle_pipeline_stack(&mut env.stacks, &env.providers)
            .unwrap();

        let out = env.stacks.events.get("aa01");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].header.mle, Some(0));
        assert_eq!(Value::Object(out[0].payload.clone()), params);
        assert!(env.stacks.events.get("dop_client_ready").is_empty());
        assert!(out[0].to_value().get("session").is_none());
    }

    #[test]
    fn test_fans_out_per_session_key() {
        let (mut env, _) = env_with_store();
        let key = encode_base64(&[9u8; 32]);
        env.stacks.events.push("notify", event("aa01", "notify", json!({"n": 1})));
        env.stacks.data.push("aa01", row("aa01", "none", "none", "none"));
        env.stacks.data.push("aa01", row("aa02", "aes", &key, "crc16"));

        EventMultiplicationMle
            .handle_pipeline_stack(&mut env.stacks, &env.providers)
            .unwrap();

        assert_eq!(env.stacks.events.get("aa01")[0].header.mle, Some(0));
        let sealed = &env.stacks.events.get("aa02")[0];
        assert_eq!(sealed.header.mle, Some(1));
        assert_eq!(sealed.header.cipher_suite_name.as_deref(), Some("aes"));

        let opened = open_event(sealed, &key, &env.providers.mle().unwrap()).unwrap();
        assert_eq!(opened.label(), "notify");
        assert_eq!(opened.payload["n"], 1);
    }

    #[test]
    fn test_unknown_session_drops_event() {
        let (mut env, _) = env_with_store();
        env.stacks.events.push("notify", event("aa01", "notify", json!({})));
        EventMultiplicationMle
            .handle_pipeline_stack(&mut env.stacks, &env.providers)
            .unwrap();
        assert!(env.stacks.events.is_empty());
    }

    #[test]
    fn test_unknown_integrity_function() {
        let (mut env, _) = env_with_store();
        let key = encode_base64(&[9u8; 32]);
        env.stacks.events.push("notify", event("aa01", "notify", json!({})));
        env.stacks.data.push("aa01", row("aa01", "aes", &key, "md4"));
        let err = EventMultiplicationMle
            .handle_pipeline_stack(&mut env.stacks, &env.providers)
            .unwrap_err();
        assert_eq!(err.code, 24765);
    }

    #[test]
    fn test_bad_key_is_encapsulation_error() {
        let (mut env, _) = env_with_store();
        env.stacks.events.push("notify", event("aa01", "notify", json!({})));
        env.stacks.data.push("aa01", row("aa01", "aes", "!!not base64!!", "crc16"));
        let err = EventMultiplicationMle
            .handle_pipeline_stack(&mut env.stacks, &env.providers)
            .unwrap_err();
        assert_eq!(err.code, 24766);
    }
}
