//! `client_ready`: first phase of the MLE handshake. Replies to
//! `dop_client_ready` with every cipher suite the configured crypto
//! providers can serve; other labels pass through untouched.

use super::{push_reply, Processor};
use crate::container::ProcessorEnv;
use serde_json::json;
use shared_crypto::{capabilities_of, CipherSuite};
use shared_types::{DopResult, Event, Provider};

/// Label this processor answers.
pub const CLIENT_READY_EVENT: &str = "dop_client_ready";

/// `client_ready`
#[derive(Debug, Default)]
pub struct ClientReady;

impl ClientReady {
    /// Registry name.
    pub const NAME: &'static str = "client_ready";
}

impl Provider for ClientReady {}

impl Processor for ClientReady {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn handle_event(&self, event: &Event, env: &mut ProcessorEnv) -> DopResult<()> {
        if event.label() != CLIENT_READY_EVENT {
            return Ok(());
        }
        let crypto = env.providers.crypto()?;
        let mut names: Vec<&String> = crypto.keys().collect();
        names.sort();
        let suites: Vec<CipherSuite> = capabilities_of(names.into_iter().filter_map(|n| crypto.get(n)));
        push_reply(env, event, json!({"err": 0, "phase": 1, "cipher_suites": suites}));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::test_support::{env_with_store, event};

    #[test]
    fn test_lists_all_capabilities() {
        let (mut env, _) = env_with_store();
        let ev = event("aa01", CLIENT_READY_EVENT, json!({"auth_token": "beef"}));
        ClientReady.handle_event(&ev, &mut env).unwrap();

        let reply = &env.stacks.events.get(CLIENT_READY_EVENT)[0];
        assert_eq!(reply.payload["phase"], 1);
        let suites: Vec<CipherSuite> =
            serde_json::from_value(reply.payload["cipher_suites"].clone()).unwrap();
        assert!(suites.contains(&CipherSuite::new("aes", "gcm", 256)));
        assert!(suites.contains(&CipherSuite::new("none", "none", -1)));
        assert!(suites.contains(&CipherSuite::new("xchacha20", "poly1305", 256)));
    }

    #[test]
    fn test_other_labels_pass() {
        let (mut env, _) = env_with_store();
        let ev = event("aa01", "something_else", json!({}));
        ClientReady.handle_event(&ev, &mut env).unwrap();
        assert!(env.stacks.events.is_empty());
    }
}
