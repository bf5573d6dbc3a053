//! # Error Types
//!
//! `DopError` is the single error value that crosses every stage boundary of
//! the worker: validation, processors, resource managers, providers and the
//! MLE envelope all report through it.
//!
//! ## Flags
//!
//! | Flag | Default | Meaning |
//! |------|---------|---------|
//! | `notifiable` | `true` | Rendered as an `error` event for the client; otherwise logged only |
//! | `recoverable` | `true` | Retry/continue is allowed; [`DopError::rip`] clears it |
//!
//! The optional `cause` forms a caused-by chain (`perr` on the wire).

use crate::codes::ErrorCode;
use serde_json::{json, Value};
use thiserror::Error;

/// Broad classification of an error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or incomplete input, rejected before routing.
    Validation,
    /// Resource manager, transport or provider failure.
    Infrastructure,
    /// Business-rule violation raised by a processor.
    Application,
    /// MLE integrity or cipher negotiation failure.
    Protocol,
}

/// Error carried through the pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[{code}] {msg}")]
pub struct DopError {
    /// Stable numeric code.
    pub code: u32,
    /// Human readable message.
    pub msg: String,
    /// Whether the operation may be retried.
    pub recoverable: bool,
    /// Whether the client should receive an `error` event.
    pub notifiable: bool,
    /// Underlying error, if any.
    #[source]
    pub cause: Option<Box<DopError>>,
}

impl DopError {
    /// Create a recoverable, notifiable error.
    pub fn new(code: u32, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            recoverable: true,
            notifiable: true,
            cause: None,
        }
    }

    /// Mark as logged-only.
    #[must_use]
    pub fn silent(mut self) -> Self {
        self.notifiable = false;
        self
    }

    /// Mark as terminal.
    #[must_use]
    pub fn rip(mut self) -> Self {
        self.recoverable = false;
        self
    }

    /// Attach the underlying error.
    #[must_use]
    pub fn caused_by(mut self, cause: DopError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Code of the wrapped cause, or 0.
    #[must_use]
    pub fn cause_code(&self) -> u32 {
        self.cause.as_ref().map_or(0, |c| c.code)
    }

    /// Log code used for validation failures: `24` followed by the code.
    #[must_use]
    pub fn log_code(&self) -> u32 {
        format!("24{}", self.code).parse().unwrap_or(self.code)
    }

    /// Classify the error by code range.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self.code {
            821..=829 | 840 => ErrorKind::Validation,
            802 | 803 | 21268 | 24765 | 24766 | 199 => ErrorKind::Protocol,
            500..=599 | 818 | 816 | 24000..=24699 => ErrorKind::Infrastructure,
            _ => ErrorKind::Application,
        }
    }

    /// Wire form: `{"code", "msg", "per"}`, `per` is `""` without a cause.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let per = match &self.cause {
            Some(cause) => cause.to_value(),
            None => Value::String(String::new()),
        };
        json!({ "code": self.code, "msg": self.msg, "per": per })
    }
}

impl From<ErrorCode> for DopError {
    fn from(code: ErrorCode) -> Self {
        Self::new(code.id, code.msg)
    }
}

/// Result alias used across the workspace.
pub type DopResult<T> = Result<T, DopError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes;

    #[test]
    fn test_defaults_are_recoverable_and_notifiable() {
        let err = DopError::new(1, "boom");
        assert!(err.recoverable);
        assert!(err.notifiable);
        assert_eq!(err.cause_code(), 0);
    }

    #[test]
    fn test_rip_and_silent() {
        let err = DopError::from(codes::ERR_JSON).silent().rip();
        assert!(!err.recoverable);
        assert!(!err.notifiable);
        assert_eq!(err.code, 821);
    }

    #[test]
    fn test_to_value_with_cause() {
        let err = DopError::from(codes::ERR_SESSION_MLE_LOOKUP)
            .caused_by(DopError::new(7, "db down"));
        let v = err.to_value();
        assert_eq!(v["code"], 528);
        assert_eq!(v["per"]["code"], 7);
        assert_eq!(err.cause_code(), 7);
    }

    #[test]
    fn test_to_value_without_cause() {
        let v = DopError::new(824, "x").to_value();
        assert_eq!(v["per"], "");
    }

    #[test]
    fn test_log_code() {
        assert_eq!(DopError::from(codes::ERR_SESSION_HEX).log_code(), 24828);
    }

    #[test]
    fn test_kind() {
        assert_eq!(DopError::from(codes::ERR_JSON).kind(), ErrorKind::Validation);
        assert_eq!(DopError::from(codes::ERR_MLE_INTEGRITY).kind(), ErrorKind::Protocol);
        assert_eq!(DopError::from(codes::ERR_REQ_PROCESSING).kind(), ErrorKind::Infrastructure);
    }

    #[test]
    fn test_display() {
        assert_eq!(DopError::new(3, "nope").to_string(), "[3] nope");
    }
}
