//! Main error type for the crate.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

use super::ErrorKind;

/// The primary error type for propagation, tracing and transport operations.
///
/// `Error` provides context for debugging and error handling:
/// - [`kind()`](Error::kind): Categorization for `match` statements
/// - [`subject()`](Error::subject): The message subject involved, if any
/// - [`source()`](StdError::source): The underlying cause
///
/// ## Error Hierarchy
///
/// ```text
/// Error
/// ├── kind: ErrorKind          (category for matching)
/// ├── message: String          (human-readable description)
/// ├── subject: Option          (message subject for correlation)
/// └── source: Option           (underlying cause)
/// ```
///
/// ## Example
///
/// ```rust
/// use natstrace::{Error, ErrorKind};
///
/// fn describe(err: &Error) -> &'static str {
///     match err.kind() {
///         ErrorKind::EmptyContext => "sender produced an empty trace context",
///         kind if kind.is_propagation() => "trace context dropped",
///         ErrorKind::NoResponders => "nobody is listening",
///         _ => "delivery failed",
///     }
/// }
///
/// let err = Error::empty_context().with_subject("orders.created");
/// assert_eq!(describe(&err), "sender produced an empty trace context");
/// ```
#[derive(Debug)]
pub struct Error {
    /// The error category.
    kind: ErrorKind,

    /// Human-readable error message.
    message: Cow<'static, str>,

    /// Subject of the message being processed.
    subject: Option<String>,

    /// The underlying error, if any.
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl Error {
    /// Creates a new error with the given kind and message.
    ///
    /// # Example
    ///
    /// ```rust
    /// use natstrace::{Error, ErrorKind};
    ///
    /// let err = Error::new(ErrorKind::Codec, "invalid span id");
    /// assert_eq!(err.kind(), ErrorKind::Codec);
    /// ```
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self { kind, message: message.into(), subject: None, source: None }
    }

    /// Creates an error from a kind with a default message.
    pub fn from_kind(kind: ErrorKind) -> Self {
        let message = match kind {
            ErrorKind::MalformedEnvelope => "payload is not a valid envelope",
            ErrorKind::EmptyContext => "empty request context",
            ErrorKind::Codec => "span context codec failure",
            ErrorKind::NoResponders => "no responders available for request",
            ErrorKind::Timeout => "request timed out",
            ErrorKind::Closed => "transport closed",
            ErrorKind::Handler => "handler failed",
            ErrorKind::Configuration => "invalid configuration",
            ErrorKind::Internal => "internal error",
        };
        Self::new(kind, message)
    }

    /// Returns the error kind for categorization.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the human-readable message without the kind prefix.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the subject of the message involved, if known.
    #[inline]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Sets the subject for this error.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the source error for this error.
    #[must_use]
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    // Convenience constructors for common error types

    /// Creates a malformed envelope error.
    pub fn malformed_envelope(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::MalformedEnvelope, message)
    }

    /// Creates an empty context error.
    pub fn empty_context() -> Self {
        Self::from_kind(ErrorKind::EmptyContext)
    }

    /// Creates a codec error.
    pub fn codec(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Codec, message)
    }

    /// Creates a no responders error.
    pub fn no_responders(subject: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::NoResponders).with_subject(subject)
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Creates a closed error.
    pub fn closed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Closed, message)
    }

    /// Creates a handler error.
    pub fn handler(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Handler, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;

        if let Some(ref subject) = self.subject {
            write!(f, " (subject: {})", subject)?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// Implement From for common error types

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::from_kind(kind)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::codec(format!("JSON error: {}", err)).with_source(err)
    }
}

impl From<crate::trace::ContextError> for Error {
    fn from(err: crate::trace::ContextError) -> Self {
        Error::codec(err.to_string()).with_source(err)
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::malformed_envelope(format!("invalid base64 data: {}", err)).with_source(err)
    }
}
