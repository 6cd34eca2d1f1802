//! Transport trait definitions.

use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::mpsc;

use super::message::Message;
use crate::Result;

/// A broker client.
///
/// The trait is object safe: transports are shared as `Arc<dyn Transport>`
/// between the publisher and any number of subscribers.
pub trait Transport: Send + Sync {
    /// Publishes a message without waiting for any response.
    fn publish(&self, message: Message) -> BoxFuture<'_, Result<()>>;

    /// Publishes a message with a fresh reply subject and waits for the first
    /// response.
    ///
    /// # Errors
    ///
    /// - `NoResponders` if nothing is subscribed to the subject
    /// - `Timeout` if no response arrives within `timeout`
    fn request(&self, message: Message, timeout: Duration) -> BoxFuture<'_, Result<Message>>;

    /// Subscribes to a subject, which may contain wildcards.
    fn subscribe(&self, subject: &str) -> BoxFuture<'_, Result<Subscription>>;
}

/// A stream of messages delivered to one subscription.
///
/// Dropping the subscription unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    subject: String,
    receiver: mpsc::UnboundedReceiver<Message>,
}

impl Subscription {
    /// Creates a subscription fed by `receiver`.
    pub fn new(subject: impl Into<String>, receiver: mpsc::UnboundedReceiver<Message>) -> Self {
        Self { subject: subject.into(), receiver }
    }

    /// Returns the subscribed subject.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Waits for the next message. Returns `None` once the transport closes
    /// the subscription.
    pub async fn next(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }
}
