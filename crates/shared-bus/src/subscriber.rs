//! # Subscriptions
//!
//! Receiving side of [`crate::BroadcastOutput`]: a client listening on its
//! session topic.

use crate::errors::TransportError;
use crate::message::OutboundMessage;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// A subscription handle. Dropping it unregisters the subscription.
pub struct Subscription {
    /// The broadcast receiver.
    receiver: broadcast::Receiver<OutboundMessage>,

    /// Destination kept by this subscription, `None` keeps everything.
    destination: Option<String>,

    /// Reference to subscription tracking (for cleanup).
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    /// Tracking key.
    key: String,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<OutboundMessage>,
        destination: Option<String>,
        subscriptions: Arc<RwLock<HashMap<String, usize>>>,
        key: String,
    ) -> Self {
        Self {
            receiver,
            destination,
            subscriptions,
            key,
        }
    }

    fn matches(&self, msg: &OutboundMessage) -> bool {
        self.destination
            .as_deref()
            .map_or(true, |d| d == msg.destination)
    }

    /// Next matching message, `None` once the output is dropped.
    pub async fn recv(&mut self) -> Option<OutboundMessage> {
        loop {
            let msg = match self.receiver.recv().await {
                Ok(m) => m,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "[Subscription] Lagged, messages dropped");
                    continue;
                }
            };
            if self.matches(&msg) {
                return Some(msg);
            }
        }
    }

    /// Next matching message without waiting.
    ///
    /// # Errors
    ///
    /// `Closed` once the output is dropped.
    pub fn try_recv(&mut self) -> Result<Option<OutboundMessage>, TransportError> {
        loop {
            let msg = match self.receiver.try_recv() {
                Ok(m) => m,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(TransportError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            };
            if self.matches(&msg) {
                return Ok(Some(msg));
            }
        }
    }

    /// Destination kept by this subscription.
    #[must_use]
    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut subs = self.subscriptions.write();
        if let Some(count) = subs.get_mut(&self.key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                subs.remove(&self.key);
            }
        }
        debug!(destination = %self.key, "[Subscription] Dropped");
    }
}
