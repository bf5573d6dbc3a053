//! `event_type_to_session`: the plaintext counterpart of
//! `event_multiplication_mle`. Re-keys every buffered event by its own
//! header session and strips the session from the header, so Notify
//! delivers it to the caller's topic.

use super::FinallyProcessor;
use crate::container::{PipelineStacks, Providers};
use shared_types::{DopResult, Event, Provider};
use tracing::warn;

/// `event_type_to_session`
#[derive(Debug, Default)]
pub struct EventTypeToSession;

impl EventTypeToSession {
    /// Registry name.
    pub const NAME: &'static str = "event_type_to_session";
}

impl Provider for EventTypeToSession {}

impl FinallyProcessor for EventTypeToSession {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn handle_pipeline_stack(
        &self,
        stacks: &mut PipelineStacks,
        _providers: &Providers,
    ) -> DopResult<()> {
        let pending: Vec<(String, Event)> = stacks
            .events
            .properties()
            .into_iter()
            .flat_map(|key| {
                let events = stacks.events.pop(&key);
                events.into_iter().map(move |e| (key.clone(), e))
            })
            .collect();

        for (key, mut event) in pending {
            if !event.header.has_session() {
                warn!(key = %key, "[EventToSession] Event without session kept under its key");
                stacks.events.push(&key, event);
                continue;
            }
            let destination = std::mem::take(&mut event.header.session);
            stacks.events.push(&destination, event);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::test_support::event;
    use serde_json::json;
    use shared_types::NOT_AVAILABLE;

    #[test]
    fn test_rekeys_by_session() {
        let mut stacks = PipelineStacks::new();
        stacks.events.push("start_session", event("aa01", "start_session", json!({"err": 0})));
        stacks.events.push("start_session", event("bb01", "start_session", json!({"err": 0})));

        EventTypeToSession
            .handle_pipeline_stack(&mut stacks, &Providers::default())
            .unwrap();

        assert!(stacks.events.get("start_session").is_empty());
        let out = &stacks.events.get("aa01")[0];
        assert_eq!(out.label(), "start_session");
        assert!(out.to_value().get("session").is_none());
        assert_eq!(stacks.events.get("bb01").len(), 1);
    }

    #[test]
    fn test_sessionless_event_stays() {
        let mut stacks = PipelineStacks::new();
        stacks.events.push("log", event(NOT_AVAILABLE, "dop_log", json!({})));
        EventTypeToSession
            .handle_pipeline_stack(&mut stacks, &Providers::default())
            .unwrap();
        assert_eq!(stacks.events.get("log").len(), 1);
    }
}
