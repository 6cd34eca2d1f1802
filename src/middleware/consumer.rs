//! Consumer-side tracing middleware.

use std::sync::Arc;

use super::{Middleware, MessageFuture, Next, record_outcome};
use crate::config::TracingConfig;
use crate::envelope::EnvelopePropagator;
use crate::trace::{SpanContext, SpanKind, SpanOptions, TraceScope, Tracer};
use crate::transport::Message;

/// Opens a consumer span around the handling of every inbound message.
///
/// Per message the middleware:
///
/// 1. names the span after the configured name, else the message subject
/// 2. if propagation is enabled, extracts the sender's span context from the
///    envelope and unwraps the payload; messages without an envelope start a
///    new trace, and extraction failures are logged and start a new trace
/// 3. starts a [`SpanKind::Consumer`] span with the configured tags and hands
///    its context down the chain in the [`TraceScope`]
/// 4. tags the span with `error` when the handler fails or the error checker
///    reports a problem
/// 5. finishes and flushes the span, also when the handling future is dropped
///
/// The handler's result is returned unchanged.
///
/// ## Example
///
/// ```rust
/// use std::sync::Arc;
/// use natstrace::middleware::{ConsumerTracing, MiddlewareStack, Pipeline};
/// use natstrace::trace::{LocalTracer, LogReporter, TraceScope};
/// use natstrace::transport::Message;
/// use natstrace::TracingConfig;
///
/// let tracer = Arc::new(LocalTracer::new(Arc::new(LogReporter)));
/// let stack = MiddlewareStack::new()
///     .with(ConsumerTracing::new(tracer, TracingConfig::default().with_tag("service", "crm")));
///
/// let pipeline = Pipeline::new(stack, |scope: TraceScope, msg: Message| async move {
///     assert!(scope.span_context().is_some());
///     Ok::<_, natstrace::Error>(Some(msg.respond("ok")))
/// });
/// ```
pub struct ConsumerTracing {
    tracer: Arc<dyn Tracer>,
    config: TracingConfig,
    propagator: EnvelopePropagator,
}

impl ConsumerTracing {
    /// Creates the middleware.
    pub fn new(tracer: Arc<dyn Tracer>, config: TracingConfig) -> Self {
        let propagator = EnvelopePropagator::new(config.codec());
        Self { tracer, config, propagator }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &TracingConfig {
        &self.config
    }

    fn resolve_parent(&self, message: &mut Message) -> Option<SpanContext> {
        if !self.config.propagate() {
            return None;
        }
        match self.propagator.extract(message) {
            Ok(parent) => parent,
            Err(err) => {
                self.config.logger().log(message.subject(), &err);
                None
            },
        }
    }
}

impl Middleware for ConsumerTracing {
    fn handle<'a>(
        &'a self,
        scope: TraceScope,
        mut message: Message,
        next: Next<'a>,
    ) -> MessageFuture<'a> {
        Box::pin(async move {
            let parent = self.resolve_parent(&mut message);
            let name = self.config.span_name(message.subject()).to_string();
            let options = SpanOptions::new(SpanKind::Consumer)
                .with_parent_opt(parent)
                .with_tags(self.config.tags().clone());
            let mut span = self.tracer.start_span(&name, options);

            tracing::debug!(
                subject = message.subject(),
                trace_id = %span.context().trace_id(),
                remote_parent = parent.is_some(),
                "consuming message"
            );

            let inbound = self.config.error_checker().map(|_| message.clone());
            let result = next.call(scope.with_span(span.context()), message).await;

            record_outcome(&mut span, &result, inbound.as_ref(), self.config.error_checker());
            span.finish();
            span.flush();
            result
        })
    }
}

impl std::fmt::Debug for ConsumerTracing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerTracing").field("config", &self.config).finish_non_exhaustive()
    }
}
