//! Span reporters.

use super::span::FinishedSpan;

/// Receives finished spans for export.
///
/// Implementations must be cheap to call from many tasks at once; anything
/// slow belongs behind a channel.
pub trait Reporter: Send + Sync {
    /// Exports one finished span.
    fn report(&self, span: FinishedSpan);
}

/// A reporter that discards every span.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl Reporter for NoopReporter {
    fn report(&self, _span: FinishedSpan) {}
}

/// A reporter that emits finished spans as `tracing` events at INFO.
///
/// ## Example
///
/// ```rust
/// use std::sync::Arc;
/// use natstrace::trace::{LocalTracer, LogReporter};
///
/// let tracer = LocalTracer::new(Arc::new(LogReporter));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, span: FinishedSpan) {
        let context = span.context();
        tracing::info!(
            name = span.name(),
            kind = %span.kind(),
            trace_id = %context.trace_id(),
            span_id = %context.span_id(),
            parent_id = %context.parent_id().map(|id| id.to_string()).unwrap_or_default(),
            duration_us = span.duration().as_micros() as u64,
            timestamp = %span.timestamp().to_rfc3339(),
            error = span.error(),
            tags = ?span.tags(),
            "span finished"
        );
    }
}
