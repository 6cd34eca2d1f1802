//! In-memory broker for tests and local development.
//!
//! Subjects are dot-separated tokens. Subscriptions may use `*` to match one
//! token and a trailing `>` to match one or more tokens.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::RwLock;
use tokio::sync::mpsc;

use super::message::Message;
use super::traits::{Subscription, Transport};
use crate::{Error, Result};

/// Prefix of the reply subjects created by [`MemoryTransport::request`].
pub const INBOX_PREFIX: &str = "_INBOX";

struct SubscriptionEntry {
    pattern: String,
    sender: mpsc::UnboundedSender<Message>,
}

/// An in-process broker.
///
/// Every matching subscription receives its own copy of each message.
/// Delivery is immediate and unbounded; there is no persistence.
///
/// ## Example
///
/// ```rust
/// use natstrace::transport::{MemoryTransport, Message, Transport};
///
/// # tokio_test::block_on(async {
/// let transport = MemoryTransport::new();
/// let mut sub = transport.subscribe("orders.*").await.unwrap();
///
/// transport.publish(Message::new("orders.created", "42")).await.unwrap();
///
/// let msg = sub.next().await.unwrap();
/// assert_eq!(msg.subject(), "orders.created");
/// assert_eq!(transport.published_count(), 1);
/// # });
/// ```
pub struct MemoryTransport {
    /// Live subscriptions.
    subscriptions: RwLock<Vec<SubscriptionEntry>>,
    /// Published message counter.
    published: AtomicU64,
    /// Set once the transport is closed.
    closed: AtomicBool,
    /// Failure to return from the next publish.
    simulate_failure: RwLock<Option<Error>>,
}

impl MemoryTransport {
    /// Creates a new in-memory transport.
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            published: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            simulate_failure: RwLock::new(None),
        }
    }

    /// Returns the number of messages published, including requests and
    /// replies.
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Returns the number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().iter().filter(|entry| !entry.sender.is_closed()).count()
    }

    /// Sets a failure to return from the next publish or request.
    pub fn set_failure(&self, error: Error) {
        *self.simulate_failure.write() = Some(error);
    }

    /// Closes the transport, ending every subscription.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.subscriptions.write().clear();
    }

    /// Returns `true` once [`close`](MemoryTransport::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::closed("memory transport closed"));
        }
        Ok(())
    }

    fn check_failure(&self) -> Result<()> {
        let failure = self.simulate_failure.write().take();
        if let Some(error) = failure {
            return Err(error);
        }
        Ok(())
    }

    fn add_subscription(&self, pattern: &str) -> mpsc::UnboundedReceiver<Message> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut subscriptions = self.subscriptions.write();
        subscriptions.retain(|entry| !entry.sender.is_closed());
        subscriptions.push(SubscriptionEntry { pattern: pattern.to_string(), sender });
        receiver
    }

    /// Delivers to every matching subscription and returns how many received it.
    fn deliver(&self, message: &Message) -> Result<usize> {
        self.check_open()?;
        self.check_failure()?;
        validate_subject(message.subject())?;
        self.published.fetch_add(1, Ordering::Relaxed);

        let subscriptions = self.subscriptions.read();
        let delivered = subscriptions
            .iter()
            .filter(|entry| subject_matches(&entry.pattern, message.subject()))
            .filter(|entry| entry.sender.send(message.clone()).is_ok())
            .count();

        tracing::trace!(subject = message.subject(), delivered, "message published");
        Ok(delivered)
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("subscriptions", &self.subscription_count())
            .field("published", &self.published_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Transport for MemoryTransport {
    fn publish(&self, message: Message) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.deliver(&message)?;
            Ok(())
        })
    }

    fn request(&self, message: Message, timeout: Duration) -> BoxFuture<'_, Result<Message>> {
        Box::pin(async move {
            self.check_open()?;
            let inbox = format!("{}.{}", INBOX_PREFIX, uuid::Uuid::new_v4().simple());
            let mut receiver = self.add_subscription(&inbox);

            let subject = message.subject().to_string();
            let delivered = self.deliver(&message.with_reply(inbox))?;
            if delivered == 0 {
                return Err(Error::no_responders(subject));
            }

            match tokio::time::timeout(timeout, receiver.recv()).await {
                Ok(Some(reply)) => Ok(reply),
                Ok(None) => Err(Error::closed("reply inbox closed").with_subject(subject)),
                Err(_) => Err(Error::timeout(format!("no reply within {:?}", timeout))
                    .with_subject(subject)),
            }
        })
    }

    fn subscribe(&self, subject: &str) -> BoxFuture<'_, Result<Subscription>> {
        let subject = subject.to_string();
        Box::pin(async move {
            self.check_open()?;
            validate_pattern(&subject)?;
            let receiver = self.add_subscription(&subject);
            tracing::debug!(subject = %subject, "subscribed");
            Ok(Subscription::new(subject, receiver))
        })
    }
}

/// Returns `true` if `subject` matches the subscription `pattern`.
pub fn subject_matches(pattern: &str, subject: &str) -> bool {
    let mut pattern_tokens = pattern.split('.');
    let mut subject_tokens = subject.split('.');
    loop {
        match (pattern_tokens.next(), subject_tokens.next()) {
            (Some(">"), Some(_)) => return true,
            (Some("*"), Some(_)) => continue,
            (Some(p), Some(s)) if p == s => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}

fn validate_subject(subject: &str) -> Result<()> {
    if subject.is_empty()
        || subject.split('.').any(|token| token.is_empty() || token == "*" || token == ">")
    {
        return Err(Error::configuration(format!("invalid publish subject {:?}", subject)));
    }
    Ok(())
}

fn validate_pattern(pattern: &str) -> Result<()> {
    let tokens: Vec<&str> = pattern.split('.').collect();
    let last = tokens.len() - 1;
    let valid = !pattern.is_empty()
        && tokens
            .iter()
            .enumerate()
            .all(|(i, token)| !token.is_empty() && (*token != ">" || i == last));
    if !valid {
        return Err(Error::configuration(format!("invalid subscription subject {:?}", pattern)));
    }
    Ok(())
}
