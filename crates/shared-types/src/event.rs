//! # Events
//!
//! An event is a header plus a `params` payload. Two header shapes share
//! one struct:
//!
//! ```text
//! DOP event        {"session"?, "task", "event", "mle"?, "params": {...}}
//! Transport event  {"session"?, "cipher_suite_name", "integrity_fun",
//!                   "digest", "mle"?, "params": {envelope}}
//! ```
//!
//! `session` is omitted on the wire when empty or `"n/a"`.

use crate::codes;
use crate::errors::{DopError, DopResult};
use serde_json::{Map, Value};

/// Placeholder used for unset header fields.
pub const NOT_AVAILABLE: &str = "n/a";

/// Label of synthesized error events.
pub const ERROR_EVENT: &str = "error";

/// Event labels accepted without an `auth_token`.
pub const UNAUTHENTICATED_EVENTS: [&str; 4] =
    ["login", "encryption_login", "cipher_suite_query", "dop_log"];

/// Event header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventHeader {
    /// Session identifier.
    pub session: String,
    /// Caller correlation id.
    pub task: String,
    /// Label selecting a pipeline.
    pub event: String,
    /// Present on MLE transport headers only.
    pub cipher_suite_name: Option<String>,
    /// Present on MLE transport headers only.
    pub integrity_fun: Option<String>,
    /// Present on MLE transport headers only.
    pub digest: Option<String>,
    /// 0 = plaintext, 1 = MLE envelope.
    pub mle: Option<u8>,
}

impl EventHeader {
    /// Header of a plain DOP event.
    pub fn new(
        session: impl Into<String>,
        task: impl Into<String>,
        event: impl Into<String>,
    ) -> Self {
        Self {
            session: session.into(),
            task: task.into(),
            event: event.into(),
            cipher_suite_name: None,
            integrity_fun: None,
            digest: None,
            mle: None,
        }
    }

    /// Header of an MLE transport event.
    pub fn transport(
        session: impl Into<String>,
        cipher_suite_name: impl Into<String>,
        integrity_fun: impl Into<String>,
        digest: impl Into<String>,
    ) -> Self {
        Self {
            session: session.into(),
            task: NOT_AVAILABLE.to_string(),
            event: NOT_AVAILABLE.to_string(),
            cipher_suite_name: Some(cipher_suite_name.into()),
            integrity_fun: Some(integrity_fun.into()),
            digest: Some(digest.into()),
            mle: None,
        }
    }

    /// Whether this is an MLE transport header.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        self.cipher_suite_name.is_some()
    }

    /// Whether the session carries a real value.
    #[must_use]
    pub fn has_session(&self) -> bool {
        !self.session.is_empty() && self.session != NOT_AVAILABLE
    }

    /// Serialize the header fields into `map`.
    pub fn write_into(&self, map: &mut Map<String, Value>) {
        if self.has_session() {
            map.insert("session".into(), Value::String(self.session.clone()));
        }
        if self.is_transport() {
            for (key, field) in [
                ("cipher_suite_name", &self.cipher_suite_name),
                ("integrity_fun", &self.integrity_fun),
                ("digest", &self.digest),
            ] {
                let v = field.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string());
                map.insert(key.into(), Value::String(v));
            }
        } else {
            map.insert("task".into(), Value::String(self.task.clone()));
            map.insert("event".into(), Value::String(self.event.clone()));
        }
        if let Some(mle) = self.mle {
            map.insert("mle".into(), Value::from(mle));
        }
    }

    /// Parse a header from a wire dictionary.
    ///
    /// Requires `task` and `event`, or the three MLE transport fields.
    pub fn from_map(map: &Map<String, Value>) -> DopResult<Self> {
        let session = text(map.get("session")).unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let mle = map.get("mle").and_then(Value::as_u64).and_then(|m| u8::try_from(m).ok());

        if let (Some(task), Some(event)) = (text(map.get("task")), text(map.get("event"))) {
            let mut header = Self::new(session, task, event);
            header.mle = mle;
            return Ok(header);
        }

        match (
            text(map.get("cipher_suite_name")),
            text(map.get("integrity_fun")),
            text(map.get("digest")),
        ) {
            (Some(csn), Some(fun), Some(digest)) => {
                let mut header = Self::transport(session, csn, fun, digest);
                header.mle = mle;
                Ok(header)
            }
            _ => Err(DopError::from(codes::ERR_EVENT_REQ).silent()),
        }
    }
}

/// Tasks arrive as strings or numbers depending on the producer.
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A labeled, session scoped message.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Header fields.
    pub header: EventHeader,
    /// The `params` payload.
    pub payload: Map<String, Value>,
}

impl Event {
    /// Create an event.
    pub fn new(header: EventHeader, payload: Map<String, Value>) -> Self {
        Self { header, payload }
    }

    /// Label of the event.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.header.event
    }

    /// Payload parameter as a string.
    #[must_use]
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    /// Wire dictionary: header fields merged with `"params"`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        self.header.write_into(&mut map);
        map.insert("params".into(), Value::Object(self.payload.clone()));
        Value::Object(map)
    }

    /// Compact JSON text of [`Event::to_value`].
    #[must_use]
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }

    /// Parse an event from a wire dictionary.
    pub fn from_value(value: &Value) -> DopResult<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| DopError::from(codes::ERR_JSON).silent())?;
        let header = EventHeader::from_map(map)?;
        let payload = map
            .get("params")
            .and_then(Value::as_object)
            .cloned()
            .ok_or_else(|| DopError::from(codes::ERR_PARAMS_REQUIRED).silent())?;
        Ok(Self { header, payload })
    }

    /// Parse an event from JSON text.
    pub fn from_json(text: &str) -> DopResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| DopError::from(codes::ERR_JSON).silent().caused_by(DopError::new(0, e.to_string())))?;
        Self::from_value(&value)
    }
}
