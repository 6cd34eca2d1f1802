//! Broker message type.

use std::fmt;

use bytes::Bytes;

/// A message as seen by the broker: a subject, an optional reply subject and
/// an opaque payload.
///
/// ## Example
///
/// ```rust
/// use natstrace::transport::Message;
///
/// let request = Message::new("orders.get", "42").with_reply("_INBOX.abc");
/// let reply = request.respond("order 42");
///
/// assert_eq!(reply.subject(), "_INBOX.abc");
/// assert_eq!(reply.data().as_ref(), b"order 42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    subject: String,
    reply: Option<String>,
    data: Bytes,
}

impl Message {
    /// Creates a message with no reply subject.
    pub fn new(subject: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self { subject: subject.into(), reply: None, data: data.into() }
    }

    /// Sets the reply subject.
    #[must_use]
    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = Some(reply.into());
        self
    }

    /// Creates a response addressed to this message's reply subject, or to
    /// its subject when it has none.
    pub fn respond(&self, data: impl Into<Bytes>) -> Self {
        let subject = self.reply.clone().unwrap_or_else(|| self.subject.clone());
        Self::new(subject, data)
    }

    /// Returns the subject.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns the reply subject, if any.
    pub fn reply(&self) -> Option<&str> {
        self.reply.as_deref()
    }

    /// Returns the payload.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Replaces the payload.
    pub fn set_data(&mut self, data: impl Into<Bytes>) {
        self.data = data.into();
    }

    /// Consumes the message and returns the payload.
    pub fn into_data(self) -> Bytes {
        self.data
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message({}, {} bytes)", self.subject, self.data.len())
    }
}
