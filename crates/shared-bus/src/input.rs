//! # Input Transports
//!
//! The worker pulls raw inbound messages from an [`InputProvider`] and
//! hands each payload to the dispatcher.
//!
//! | Transport | Source | Use Case |
//! |-----------|--------|----------|
//! | [`ChannelInput`] | `tokio::sync::mpsc` | Embedding, tests |
//! | [`StdinInput`] | one JSON message per line | `dop-worker` binary |

use crate::message::InboundMessage;
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{ConfigMap, DopResult, Provider, RetryPolicy};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

/// Source of inbound messages.
#[async_trait]
pub trait InputProvider: Provider {
    /// Next message, `None` once the source is exhausted or closed.
    async fn recv(&self) -> Option<InboundMessage>;

    /// Retry policy applied when opening this transport.
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
    }
}

/// Input fed through an in-process channel.
pub struct ChannelInput {
    receiver: Mutex<mpsc::Receiver<InboundMessage>>,
    closed: AtomicBool,
    received: AtomicU64,
    config: RwLock<ConfigMap>,
}

impl ChannelInput {
    /// Create the input and the sender feeding it.
    #[must_use]
    pub fn new() -> (Self, mpsc::Sender<InboundMessage>) {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create with a specific channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> (Self, mpsc::Sender<InboundMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let input = Self {
            receiver: Mutex::new(rx),
            closed: AtomicBool::new(false),
            received: AtomicU64::new(0),
            config: RwLock::new(ConfigMap::default()),
        };
        (input, tx)
    }

    /// Messages received so far.
    #[must_use]
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }
}

impl Provider for ChannelInput {
    fn init(&self, config: &str) -> DopResult<()> {
        *self.config.write() = ConfigMap::parse(config);
        Ok(())
    }

    fn close(&self) -> DopResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        if let Ok(mut rx) = self.receiver.try_lock() {
            rx.close();
        }
        debug!("[ChannelInput] Closed");
        Ok(())
    }
}

#[async_trait]
impl InputProvider for ChannelInput {
    async fn recv(&self) -> Option<InboundMessage> {
        if self.closed.load(Ordering::SeqCst) {
            return None;
        }
        let msg = self.receiver.lock().await.recv().await?;
        self.received.fetch_add(1, Ordering::Relaxed);
        Some(msg)
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_config(&self.config.read())
    }
}

/// Input reading one message per line from standard input.
///
/// Blank lines are skipped. The topic of every message is the `topic`
/// configuration key, `stdin` by default.
pub struct StdinInput {
    lines: Mutex<Lines<BufReader<Stdin>>>,
    config: RwLock<ConfigMap>,
}

impl StdinInput {
    /// Attach to the process standard input.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
            config: RwLock::new(ConfigMap::default()),
        }
    }
}

impl Default for StdinInput {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for StdinInput {
    fn init(&self, config: &str) -> DopResult<()> {
        *self.config.write() = ConfigMap::parse(config);
        Ok(())
    }
}

#[async_trait]
impl InputProvider for StdinInput {
    async fn recv(&self) -> Option<InboundMessage> {
        let topic = self.config.read().get_str(&["topic"], "stdin");
        let mut lines = self.lines.lock().await;
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => return Some(InboundMessage::new(topic, line)),
                Ok(None) => return None,
                Err(e) => {
                    warn!(error = %e, "[StdinInput] Read failed, stopping input");
                    return None;
                }
            }
        }
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_config(&self.config.read())
    }
}
