//! Broadcast fan-out
//!
//! Delivers one message to every registered client except its sender.

use bytes::Bytes;

use super::entry::{ClientId, DeliveryError};
use super::store::Registry;

/// Outcome of a single broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Clients in the snapshot
    pub recipients: usize,
    /// Messages enqueued
    pub delivered: usize,
    /// Recipients whose queue was full or closed
    pub failed: usize,
}

impl DeliveryReport {
    /// Check if every recipient got the message
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

impl Registry {
    /// Broadcast a message to every client except `sender`
    ///
    /// Recipients come from one [`snapshot`](Registry::snapshot); the lock is
    /// released before anything is enqueued. Each delivery is independent: a
    /// full or closed queue is logged and counted, and never stops delivery to
    /// the others. That recipient's own session notices its disconnect.
    pub async fn broadcast(&self, message: Bytes, sender: ClientId) -> DeliveryReport {
        let recipients = self.snapshot(sender).await;
        let mut report = DeliveryReport {
            recipients: recipients.len(),
            ..Default::default()
        };

        for recipient in &recipients {
            match recipient.deliver(message.clone()) {
                Ok(()) => report.delivered += 1,
                Err(DeliveryError::QueueFull) => {
                    report.failed += 1;
                    tracing::warn!(
                        client_id = %recipient.id(),
                        sender = %sender,
                        "Dropping message for slow client"
                    );
                }
                Err(e @ DeliveryError::Closed) => {
                    report.failed += 1;
                    tracing::debug!(
                        client_id = %recipient.id(),
                        sender = %sender,
                        error = %e,
                        "Delivery failed"
                    );
                }
            }
        }

        report
    }
}
