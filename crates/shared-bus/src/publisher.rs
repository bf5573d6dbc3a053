//! # Broadcast Output
//!
//! Publishing side of the in-process bus: every write is broadcast to the
//! subscribers, each of which keeps only its own destinations.

use crate::message::OutboundMessage;
use crate::output::OutputProvider;
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use parking_lot::RwLock;
use shared_types::{ConfigMap, DopResult, Provider, RetryPolicy};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Output backed by `tokio::sync::broadcast`.
///
/// Suitable for single-process operation; a networked deployment plugs a
/// broker client in behind [`OutputProvider`] instead.
pub struct BroadcastOutput {
    /// Broadcast sender for messages.
    sender: broadcast::Sender<OutboundMessage>,

    /// Active subscription count by destination key.
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    /// Total messages published.
    published: AtomicU64,

    /// Channel capacity.
    capacity: usize,

    config: RwLock<ConfigMap>,
}

impl BroadcastOutput {
    /// Create with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create with a specific capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            published: AtomicU64::new(0),
            capacity,
            config: RwLock::new(ConfigMap::default()),
        }
    }

    /// Subscribe to `destination`, or to everything with `None`.
    #[must_use]
    pub fn subscribe(&self, destination: Option<&str>) -> Subscription {
        let receiver = self.sender.subscribe();
        let key = destination.unwrap_or("*").to_string();
        *self.subscriptions.write().entry(key.clone()).or_insert(0) += 1;

        debug!(destination = %key, "[BroadcastOutput] New subscription");
        Subscription::new(
            receiver,
            destination.map(str::to_string),
            self.subscriptions.clone(),
            key,
        )
    }

    /// Number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Subscriptions registered for `destination`.
    #[must_use]
    pub fn subscriptions_for(&self, destination: &str) -> usize {
        self.subscriptions
            .read()
            .get(destination)
            .copied()
            .unwrap_or(0)
    }

    /// Total messages published.
    #[must_use]
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for BroadcastOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for BroadcastOutput {
    fn init(&self, config: &str) -> DopResult<()> {
        *self.config.write() = ConfigMap::parse(config);
        Ok(())
    }
}

impl OutputProvider for BroadcastOutput {
    fn write_to_endpoint(&self, payload: &str, destination: &str) -> DopResult<()> {
        // Counted even when nobody listens
        self.published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(OutboundMessage::new(destination, payload)) {
            Ok(receivers) => {
                debug!(destination, receivers, "[BroadcastOutput] Message published");
            }
            Err(_) => {
                warn!(destination, "[BroadcastOutput] Message dropped (no receivers)");
            }
        }
        Ok(())
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_config(&self.config.read())
    }
}
