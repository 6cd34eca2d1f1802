//! Tracing middleware configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::logger::{PropagationLogger, TracingLogger};
use crate::envelope::EnvelopeCodec;
use crate::error::BoxError;
use crate::transport::Message;

/// Inspects a message after handling and reports an application-level error.
///
/// The consumer middleware passes the reply when the handler produced one,
/// otherwise the inbound message. A returned error is recorded on the span as
/// the `error` tag; the message itself is not changed.
pub type ErrorChecker = Arc<dyn Fn(&Message) -> Result<(), BoxError> + Send + Sync>;

fn default_logger() -> Arc<dyn PropagationLogger> {
    Arc::new(TracingLogger)
}

/// Configuration shared by the consumer and producer tracing middleware.
///
/// ## Default Values
///
/// - `name`: unset (spans are named after the message subject)
/// - `tags`: empty
/// - `propagate`: true
/// - `error_checker`: unset
/// - `logger`: [`TracingLogger`]
/// - `codec`: [`EnvelopeCodec::default()`] (historical envelope shapes accepted)
///
/// ## Example
///
/// ```rust
/// use natstrace::TracingConfig;
///
/// let config = TracingConfig::builder()
///     .name("orders")
///     .propagate(true)
///     .build()
///     .with_tag("service", "billing")
///     .with_tag("region", "eu-west-1");
///
/// assert_eq!(config.span_name("orders.created"), "orders");
/// assert_eq!(config.tags().len(), 2);
/// ```
///
/// ## Merge Semantics
///
/// `with_*` refiners apply in call order. Scalar settings are replaced by later
/// calls; [`with_tag`](TracingConfig::with_tag) and
/// [`with_tags`](TracingConfig::with_tags) merge into the existing tags, a later
/// value for the same key winning.
#[derive(Clone, bon::Builder)]
pub struct TracingConfig {
    /// Span name override. Empty counts as unset.
    #[builder(into)]
    name: Option<String>,

    /// Tags applied to every span.
    #[builder(default)]
    tags: BTreeMap<String, String>,

    /// Whether to read and write span contexts in message payloads.
    #[builder(default = true)]
    propagate: bool,

    /// Optional post-handling error check.
    error_checker: Option<ErrorChecker>,

    /// Sink for non-fatal propagation failures.
    #[builder(default = default_logger())]
    logger: Arc<dyn PropagationLogger>,

    /// Envelope codec settings.
    #[builder(default)]
    codec: EnvelopeCodec,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl TracingConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the span name override.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds one tag, replacing an existing value for the same key.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Merges tags into the existing set.
    #[must_use]
    pub fn with_tags<I, K, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Enables or disables context propagation.
    ///
    /// Disable it when talking to peers that do not understand envelopes.
    #[must_use]
    pub fn with_propagation(mut self, propagate: bool) -> Self {
        self.propagate = propagate;
        self
    }

    /// Sets the post-handling error check.
    #[must_use]
    pub fn with_error_checker<F>(mut self, checker: F) -> Self
    where
        F: Fn(&Message) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.error_checker = Some(Arc::new(checker));
        self
    }

    /// Sets the propagation failure sink.
    #[must_use]
    pub fn with_logger(mut self, logger: impl PropagationLogger + 'static) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    /// Sets the envelope codec.
    #[must_use]
    pub fn with_codec(mut self, codec: EnvelopeCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Returns the span name for a message on `subject`.
    pub fn span_name<'a>(&'a self, subject: &'a str) -> &'a str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => subject,
        }
    }

    /// Returns the configured name override.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the tags applied to every span.
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Returns whether contexts are propagated.
    pub fn propagate(&self) -> bool {
        self.propagate
    }

    /// Returns the error checker, if any.
    pub fn error_checker(&self) -> Option<&ErrorChecker> {
        self.error_checker.as_ref()
    }

    /// Returns the propagation failure sink.
    pub fn logger(&self) -> &Arc<dyn PropagationLogger> {
        &self.logger
    }

    /// Returns the envelope codec.
    pub fn codec(&self) -> EnvelopeCodec {
        self.codec
    }
}

impl fmt::Debug for TracingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracingConfig")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("propagate", &self.propagate)
            .field("error_checker", &self.error_checker.is_some())
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}
