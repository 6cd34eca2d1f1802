//! Per-call trace scope.

use super::context::SpanContext;

/// The trace state travelling with one message through a middleware chain.
///
/// A scope is a plain value: it is created per message, handed down the
/// chain by value, and never shared between messages. Middleware that opens a
/// span passes a new scope carrying that span's context to the next link.
///
/// ## Example
///
/// ```rust
/// use natstrace::trace::{SpanContext, SpanId, TraceId, TraceScope};
///
/// let scope = TraceScope::new();
/// assert!(scope.span_context().is_none());
///
/// let ctx = SpanContext::new(TraceId::from_u64(1), SpanId::new(1));
/// let child = scope.with_span(ctx);
/// assert_eq!(child.span_context(), Some(ctx));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceScope {
    span: Option<SpanContext>,
}

impl TraceScope {
    /// Creates a scope with no active span.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a scope whose active span is `context`.
    #[must_use]
    pub fn with_span(self, context: SpanContext) -> Self {
        Self { span: Some(context) }
    }

    /// Returns the active span's context, if any.
    pub fn span_context(&self) -> Option<SpanContext> {
        self.span
    }
}
