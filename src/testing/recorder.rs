//! Reporter that keeps finished spans in memory.

use parking_lot::Mutex;

use crate::trace::{FinishedSpan, Reporter, TraceId};

/// Collects every reported span.
///
/// ## Example
///
/// ```rust
/// use std::sync::Arc;
/// use natstrace::testing::RecordingReporter;
/// use natstrace::trace::{LocalTracer, SpanKind, SpanOptions, Tracer};
///
/// let reporter = Arc::new(RecordingReporter::new());
/// let tracer = LocalTracer::new(reporter.clone());
///
/// tracer.start_span("work", SpanOptions::new(SpanKind::Internal)).finish();
///
/// assert_eq!(reporter.len(), 1);
/// assert_eq!(reporter.spans()[0].name(), "work");
/// ```
#[derive(Debug, Default)]
pub struct RecordingReporter {
    spans: Mutex<Vec<FinishedSpan>>,
}

impl RecordingReporter {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the spans reported so far, in report order.
    pub fn spans(&self) -> Vec<FinishedSpan> {
        self.spans.lock().clone()
    }

    /// Returns the spans belonging to `trace_id`.
    pub fn spans_in(&self, trace_id: TraceId) -> Vec<FinishedSpan> {
        let spans = self.spans.lock();
        spans.iter().filter(|span| span.context().trace_id() == trace_id).cloned().collect()
    }

    /// Returns the first span named `name`.
    pub fn find(&self, name: &str) -> Option<FinishedSpan> {
        self.spans.lock().iter().find(|span| span.name() == name).cloned()
    }

    /// Returns the number of spans reported.
    pub fn len(&self) -> usize {
        self.spans.lock().len()
    }

    /// Returns `true` if nothing has been reported.
    pub fn is_empty(&self) -> bool {
        self.spans.lock().is_empty()
    }

    /// Forgets every recorded span.
    pub fn clear(&self) {
        self.spans.lock().clear();
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, span: FinishedSpan) {
        self.spans.lock().push(span);
    }
}
