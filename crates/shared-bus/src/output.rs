//! # Output Transports
//!
//! Notify hands every buffered event to `write_to_endpoint(payload,
//! destination)`, where the destination is a session value (fan-out) or an
//! event label (unauthenticated replies).
//!
//! | Transport | Sink | Use Case |
//! |-----------|------|----------|
//! | [`MemoryOutput`] | recorded in memory | Tests, embedding |
//! | [`StdoutOutput`] | `<destination> <payload>` per line | `dop-worker` binary |
//! | [`crate::BroadcastOutput`] | `tokio::sync::broadcast` | In-process subscribers |

use crate::errors::TransportError;
use crate::message::OutboundMessage;
use parking_lot::{Mutex, RwLock};
use shared_types::{ConfigMap, DopResult, Provider, RetryPolicy};
use std::collections::HashSet;
use std::io::Write;
use tracing::debug;

/// Sink for outbound messages.
pub trait OutputProvider: Provider {
    /// Write `payload` to `destination`.
    fn write_to_endpoint(&self, payload: &str, destination: &str) -> DopResult<()>;

    /// Retry policy applied when opening this transport.
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
    }
}

/// Output that records every write.
#[derive(Default)]
pub struct MemoryOutput {
    sent: Mutex<Vec<OutboundMessage>>,
    rejected: RwLock<HashSet<String>>,
    config: RwLock<ConfigMap>,
}

impl MemoryOutput {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every future write to `destination`.
    pub fn reject(&self, destination: &str) {
        self.rejected.write().insert(destination.to_string());
    }

    /// Messages written so far.
    #[must_use]
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().clone()
    }

    /// Messages written to `destination`.
    #[must_use]
    pub fn sent_to(&self, destination: &str) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .iter()
            .filter(|m| m.destination == destination)
            .cloned()
            .collect()
    }

    /// Drain the recorded messages.
    pub fn take(&self) -> Vec<OutboundMessage> {
        std::mem::take(&mut *self.sent.lock())
    }
}

impl Provider for MemoryOutput {
    fn init(&self, config: &str) -> DopResult<()> {
        *self.config.write() = ConfigMap::parse(config);
        Ok(())
    }
}

impl OutputProvider for MemoryOutput {
    fn write_to_endpoint(&self, payload: &str, destination: &str) -> DopResult<()> {
        if self.rejected.read().contains(destination) {
            return Err(TransportError::NoReceivers(destination.to_string()).into());
        }
        self.sent
            .lock()
            .push(OutboundMessage::new(destination, payload));
        Ok(())
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_config(&self.config.read())
    }
}

/// Output writing `<destination> <payload>` lines to standard output.
#[derive(Default)]
pub struct StdoutOutput {
    config: RwLock<ConfigMap>,
}

impl StdoutOutput {
    /// Create the transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Provider for StdoutOutput {
    fn init(&self, config: &str) -> DopResult<()> {
        *self.config.write() = ConfigMap::parse(config);
        Ok(())
    }

    fn close(&self) -> DopResult<()> {
        std::io::stdout()
            .flush()
            .map_err(|e| TransportError::from(e).into())
    }
}

impl OutputProvider for StdoutOutput {
    fn write_to_endpoint(&self, payload: &str, destination: &str) -> DopResult<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{destination} {payload}").map_err(TransportError::from)?;
        debug!(destination, "[StdoutOutput] Message written");
        Ok(())
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_config(&self.config.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_output_records_writes() {
        let out = MemoryOutput::new();
        out.write_to_endpoint("{\"a\":1}", "cafe").unwrap();
        out.write_to_endpoint("{\"a\":2}", "beef").unwrap();

        assert_eq!(out.sent().len(), 2);
        let to_cafe = out.sent_to("cafe");
        assert_eq!(to_cafe.len(), 1);
        assert_eq!(to_cafe[0].json().unwrap()["a"], 1);

        assert_eq!(out.take().len(), 2);
        assert!(out.sent().is_empty());
    }

    #[test]
    fn test_rejected_destination_fails() {
        let out = MemoryOutput::new();
        out.reject("dead");
        let err = out.write_to_endpoint("{}", "dead").unwrap_err();
        assert_eq!(err.code, 816);
        assert!(out.sent().is_empty());
        assert!(out.write_to_endpoint("{}", "alive").is_ok());
    }
}
