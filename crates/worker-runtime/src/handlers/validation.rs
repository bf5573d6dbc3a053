//! # Input Validation
//!
//! Checks run on every raw message before routing, in this order:
//!
//! | Check | Code | Notifiable |
//! |-------|------|------------|
//! | JSON, retried with `'` replaced by `"` | 821 | no |
//! | `session` present | 822 | yes |
//! | `session` is a string | 840 | yes |
//! | `session` is hex once dashes are removed | 828 | no |
//! | `event` present | 823 | no |
//! | `params` present (authenticated labels) | 829 | no |
//! | `params.auth_token` present (authenticated labels) | 825 | yes |
//! | `auth_token` is hex | 827 | no |
//!
//! Labels in [`UNAUTHENTICATED_EVENTS`] skip the last three checks.

use serde_json::{Map, Value};
use shared_types::codes::{self, ErrorCode};
use shared_types::{DopError, Event, EventHeader, NOT_AVAILABLE, UNAUTHENTICATED_EVENTS};

/// A message refused by validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    /// Why the message was refused.
    pub error: DopError,
    /// Header recovered before the failing check, when the session was valid.
    pub header: Option<EventHeader>,
}

impl Rejection {
    fn new(code: ErrorCode, notifiable: bool, header: Option<EventHeader>) -> Self {
        let error = DopError::from(code);
        Self {
            error: if notifiable { error } else { error.silent() },
            header,
        }
    }
}

/// Parse raw text, accepting the single-quoted variant some producers emit.
///
/// # Errors
///
/// 821, non-notifiable.
pub fn parse_message(raw: &str) -> Result<Value, DopError> {
    serde_json::from_str(raw)
        .or_else(|_| serde_json::from_str(&raw.replace('\'', "\"")))
        .map_err(|e: serde_json::Error| {
            DopError::from(codes::ERR_JSON)
                .silent()
                .caused_by(DopError::new(0, e.to_string()))
        })
}

/// Whether `text` is a non-empty run of hex digits.
#[must_use]
pub fn is_hex(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_hexdigit())
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Validate a raw message and build the inbound [`Event`].
///
/// # Errors
///
/// The first failing check, see the module table.
pub fn validate(raw: &str) -> Result<Event, Rejection> {
    let body = parse_message(raw).map_err(|error| Rejection {
        error,
        header: None,
    })?;
    let Some(map) = body.as_object() else {
        return Err(Rejection::new(codes::ERR_JSON, false, None));
    };

    let session = match map.get("session") {
        None | Some(Value::Null) => return Err(Rejection::new(codes::ERR_SESSION_REQ, true, None)),
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(Rejection::new(codes::ERR_SESSION_FORMAT, true, None)),
    };
    if !is_hex(&session.replace('-', "")) {
        return Err(Rejection::new(codes::ERR_SESSION_HEX, false, None));
    }

    let task = text(map.get("task")).unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let Some(label) = text(map.get("event")) else {
        return Err(Rejection::new(codes::ERR_EVENT_REQ, false, None));
    };
    let header = EventHeader::new(session, task, label);

    let params = map.get("params").and_then(Value::as_object).cloned();
    if UNAUTHENTICATED_EVENTS.contains(&header.event.as_str()) {
        return Ok(Event::new(header, params.unwrap_or_else(Map::new)));
    }

    let Some(params) = params else {
        return Err(Rejection::new(codes::ERR_PARAMS_REQUIRED, false, Some(header)));
    };
    match params.get("auth_token") {
        None | Some(Value::Null) => {
            return Err(Rejection::new(codes::ERR_AUTHENTICATION_REQUIRED, true, Some(header)));
        }
        Some(Value::String(token)) if is_hex(token) => {}
        Some(_) => return Err(Rejection::new(codes::ERR_TOKEN_HEX, false, Some(header))),
    }
    Ok(Event::new(header, params))
}
