//! Producer-side tracing middleware.

use std::sync::Arc;

use super::{Middleware, MessageFuture, Next, record_outcome};
use crate::config::TracingConfig;
use crate::envelope::{EnvelopePropagator, Injection};
use crate::trace::{Span, SpanKind, SpanOptions, TraceScope, Tracer};
use crate::transport::Message;

/// Opens a producer span around every outbound message and carries its
/// context to the receiver inside the payload.
///
/// The span is a child of the span in the caller's [`TraceScope`], or a new
/// root when the scope is empty. With propagation enabled the payload is
/// wrapped in an envelope holding the producer span's context. Injection
/// failures are reported to the configured logger and the message is sent
/// unchanged.
///
/// The error checker sees the reply when a request produced one, otherwise
/// the message as it was before injection.
pub struct ProducerTracing {
    tracer: Arc<dyn Tracer>,
    config: TracingConfig,
    propagator: EnvelopePropagator,
}

impl ProducerTracing {
    /// Creates the middleware.
    pub fn new(tracer: Arc<dyn Tracer>, config: TracingConfig) -> Self {
        let propagator = EnvelopePropagator::new(config.codec());
        Self { tracer, config, propagator }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &TracingConfig {
        &self.config
    }

    fn inject(&self, span: &Span, message: &mut Message) {
        match self.propagator.inject(message, &span.context()) {
            Ok(Injection::Injected) => {},
            Ok(Injection::Skipped) => {
                tracing::debug!(
                    subject = message.subject(),
                    "span context incomplete, not injected"
                );
            },
            Err(err) => self.config.logger().log(message.subject(), &err),
        }
    }
}

impl Middleware for ProducerTracing {
    fn handle<'a>(
        &'a self,
        scope: TraceScope,
        mut message: Message,
        next: Next<'a>,
    ) -> MessageFuture<'a> {
        Box::pin(async move {
            let name = self.config.span_name(message.subject()).to_string();
            let options = SpanOptions::new(SpanKind::Producer)
                .with_parent_opt(scope.span_context())
                .with_tags(self.config.tags().clone());
            let mut span = self.tracer.start_span(&name, options);

            let original = self.config.error_checker().map(|_| message.clone());
            if self.config.propagate() {
                self.inject(&span, &mut message);
            }

            let result = next.call(scope.with_span(span.context()), message).await;

            record_outcome(&mut span, &result, original.as_ref(), self.config.error_checker());
            span.finish();
            span.flush();
            result
        })
    }
}

impl std::fmt::Debug for ProducerTracing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProducerTracing").field("config", &self.config).finish_non_exhaustive()
    }
}
