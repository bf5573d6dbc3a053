//! Raw messages crossing the worker boundary.

use serde::{Deserialize, Serialize};

/// A message received by an input transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Topic or channel the message arrived on.
    pub topic: String,
    /// Raw JSON text.
    pub payload: String,
}

impl InboundMessage {
    /// Create a message.
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// A message written by an output transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Topic addressed: a session value or an event label.
    pub destination: String,
    /// Raw JSON text.
    pub payload: String,
}

impl OutboundMessage {
    /// Create a message.
    pub fn new(destination: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            payload: payload.into(),
        }
    }

    /// Payload parsed as JSON, `None` when it is not valid JSON.
    #[must_use]
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.payload).ok()
    }
}
