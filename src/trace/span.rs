//! Span lifecycle types.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use super::context::SpanContext;
use super::reporter::Reporter;

/// Tag key used to mark a span as failed.
pub const ERROR_TAG: &str = "error";

/// Kind of span, indicating its role in the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpanKind {
    /// An internal span.
    #[default]
    Internal,
    /// A client-side span (outgoing request).
    Client,
    /// A server-side span (incoming request).
    Server,
    /// A producer span (async message send).
    Producer,
    /// A consumer span (async message receive).
    Consumer,
}

impl std::fmt::Display for SpanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpanKind::Internal => write!(f, "internal"),
            SpanKind::Client => write!(f, "client"),
            SpanKind::Server => write!(f, "server"),
            SpanKind::Producer => write!(f, "producer"),
            SpanKind::Consumer => write!(f, "consumer"),
        }
    }
}

/// A live span owned by whoever is timing the operation.
///
/// A span is finished once and flushed to its reporter at most once. Spans
/// whose context is neither sampled nor debug are never reported. Dropping a
/// span that was not flushed finishes and flushes it, so a span whose owner
/// is cancelled mid-operation is still reported.
///
/// ## Example
///
/// ```rust
/// use std::sync::Arc;
/// use natstrace::trace::{LocalTracer, SpanKind, SpanOptions, Tracer};
/// use natstrace::testing::RecordingReporter;
///
/// let reporter = Arc::new(RecordingReporter::new());
/// let tracer = LocalTracer::new(reporter.clone());
///
/// let mut span = tracer.start_span("orders.created", SpanOptions::new(SpanKind::Consumer));
/// span.tag("queue", "workers");
/// span.finish();
/// span.flush();
///
/// assert_eq!(reporter.spans().len(), 1);
/// ```
pub struct Span {
    name: String,
    kind: SpanKind,
    context: SpanContext,
    tags: BTreeMap<String, String>,
    timestamp: DateTime<Utc>,
    start: Instant,
    duration: Option<Duration>,
    flushed: bool,
    reporter: Arc<dyn Reporter>,
}

impl Span {
    /// Creates a started span. Called by tracers.
    pub fn new(
        name: impl Into<String>,
        kind: SpanKind,
        context: SpanContext,
        tags: BTreeMap<String, String>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            context,
            tags,
            timestamp: Utc::now(),
            start: Instant::now(),
            duration: None,
            flushed: false,
            reporter,
        }
    }

    /// Returns the span name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the span kind.
    pub fn kind(&self) -> SpanKind {
        self.kind
    }

    /// Returns the span context.
    pub fn context(&self) -> SpanContext {
        self.context
    }

    /// Returns the tags recorded so far.
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Sets a tag, replacing any previous value.
    pub fn tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    /// Tags the span as failed with the given description.
    pub fn tag_error(&mut self, description: impl Into<String>) {
        self.tag(ERROR_TAG, description);
    }

    /// Records the span duration. Later calls are ignored.
    pub fn finish(&mut self) {
        if self.duration.is_none() {
            self.duration = Some(self.start.elapsed());
        }
    }

    /// Returns `true` once [`finish`](Span::finish) has been called.
    pub fn is_finished(&self) -> bool {
        self.duration.is_some()
    }

    /// Hands the finished span to the reporter.
    ///
    /// Finishes the span first if needed. Only the first call reports.
    pub fn flush(&mut self) {
        if self.flushed {
            return;
        }
        self.finish();
        self.flushed = true;

        if !self.context.is_recorded() {
            tracing::trace!(span = %self.name, "span not sampled, skipping report");
            return;
        }

        let finished = FinishedSpan {
            name: std::mem::take(&mut self.name),
            kind: self.kind,
            context: self.context,
            tags: std::mem::take(&mut self.tags),
            timestamp: self.timestamp,
            duration: self.duration.unwrap_or_default(),
        };
        self.reporter.report(finished);
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        if !self.flushed {
            tracing::debug!(span = %self.name, "span dropped before flush");
            self.flush();
        }
    }
}

impl std::fmt::Debug for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Span")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("context", &self.context)
            .field("tags", &self.tags)
            .field("finished", &self.is_finished())
            .field("flushed", &self.flushed)
            .finish()
    }
}

/// A finished span as delivered to a [`Reporter`].
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedSpan {
    name: String,
    kind: SpanKind,
    context: SpanContext,
    tags: BTreeMap<String, String>,
    timestamp: DateTime<Utc>,
    duration: Duration,
}

impl FinishedSpan {
    /// Returns the span name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the span kind.
    pub fn kind(&self) -> SpanKind {
        self.kind
    }

    /// Returns the span context.
    pub fn context(&self) -> SpanContext {
        self.context
    }

    /// Returns all tags.
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Returns a single tag value.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Returns the `error` tag, if set.
    pub fn error(&self) -> Option<&str> {
        self.tag(ERROR_TAG)
    }

    /// Returns when the span started.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns how long the span took.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}
