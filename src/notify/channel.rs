//! Broadcast notification surface
//!
//! Fans notifications out to every subscriber, e.g. a toast layer or a
//! websocket relay. Sending with no subscribers is not an error.

use tokio::sync::broadcast;

use crate::types::Result;

use super::{Notification, Notifier};

/// Notifier backed by a tokio broadcast channel
#[derive(Clone)]
pub struct ChannelNotifier {
    tx: broadcast::Sender<Notification>,
}

impl ChannelNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to notifications sent from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

impl Default for ChannelNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait::async_trait]
impl Notifier for ChannelNotifier {
    async fn deliver(&self, notification: Notification) -> Result<()> {
        let _ = self.tx.send(notification);
        Ok(())
    }
}
