//! Error kind enumeration for categorizing propagation and transport errors.

/// Categorization of crate errors.
///
/// This enum provides a stable interface for matching on error types.
///
/// ## Propagation vs Delivery
///
/// | ErrorKind           | Layer       | Middleware behavior                 |
/// |---------------------|-------------|-------------------------------------|
/// | `MalformedEnvelope` | Propagation | Treated as "no context", not logged |
/// | `EmptyContext`      | Propagation | Logged, span becomes a trace root   |
/// | `Codec`             | Propagation | Logged, message continues untraced  |
/// | `NoResponders`      | Transport   | Returned to the caller              |
/// | `Timeout`           | Transport   | Returned to the caller              |
/// | `Closed`            | Transport   | Returned to the caller              |
/// | `Handler`           | Application | Tagged on the span, returned        |
///
/// Propagation errors never abort message handling or sending; the
/// tracing middleware always degrades to "no propagation" for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The payload looks like an envelope but could not be decoded.
    ///
    /// Never surfaced by the middleware: the message is handled as if it
    /// carried no trace context.
    #[error("malformed envelope")]
    MalformedEnvelope,

    /// A span context was present but its trace id is zero, or an empty
    /// context was handed to the injector.
    ///
    /// Indicates a misbehaving sender rather than a non-participating one.
    #[error("empty span context")]
    EmptyContext,

    /// Serialization layer failure (unparseable B3 token, JSON encoding).
    #[error("codec error")]
    Codec,

    /// A request was published but nothing is subscribed to its subject.
    #[error("no responders")]
    NoResponders,

    /// A request did not receive a reply in time.
    #[error("timeout")]
    Timeout,

    /// The transport or subscription has been shut down.
    #[error("closed")]
    Closed,

    /// The application handler failed.
    #[error("handler error")]
    Handler,

    /// Invalid configuration (bad subject, bad sampling rate).
    #[error("configuration error")]
    Configuration,

    /// Internal error.
    #[error("internal error")]
    Internal,
}

impl ErrorKind {
    /// Returns `true` if this kind belongs to the context propagation layer.
    ///
    /// Errors of these kinds are always recoverable by dropping the trace
    /// context and continuing without propagation.
    ///
    /// # Example
    ///
    /// ```rust
    /// use natstrace::ErrorKind;
    ///
    /// assert!(ErrorKind::EmptyContext.is_propagation());
    /// assert!(!ErrorKind::Timeout.is_propagation());
    /// ```
    #[inline]
    pub fn is_propagation(&self) -> bool {
        matches!(self, ErrorKind::MalformedEnvelope | ErrorKind::EmptyContext | ErrorKind::Codec)
    }

    /// Returns `true` if this kind comes from the transport.
    #[inline]
    pub fn is_transport(&self) -> bool {
        matches!(self, ErrorKind::NoResponders | ErrorKind::Timeout | ErrorKind::Closed)
    }
}
