//! Tracer abstraction and the in-crate reference tracer.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::context::{SpanContext, SpanId, TraceId};
use super::reporter::Reporter;
use super::span::{Span, SpanKind};
use crate::{Error, Result};

/// Options for starting a span.
#[derive(Debug, Clone, Default)]
pub struct SpanOptions {
    kind: SpanKind,
    parent: Option<SpanContext>,
    tags: BTreeMap<String, String>,
}

impl SpanOptions {
    /// Creates options for a span of the given kind with no parent.
    pub fn new(kind: SpanKind) -> Self {
        Self { kind, ..Self::default() }
    }

    /// Sets the parent context.
    #[must_use]
    pub fn with_parent(mut self, parent: SpanContext) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Sets the parent context if one is given.
    #[must_use]
    pub fn with_parent_opt(mut self, parent: Option<SpanContext>) -> Self {
        self.parent = parent;
        self
    }

    /// Adds tags applied to the span at start.
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

    /// Returns the span kind.
    pub fn kind(&self) -> SpanKind {
        self.kind
    }

    /// Returns the parent context, if any.
    pub fn parent(&self) -> Option<&SpanContext> {
        self.parent.as_ref()
    }

    /// Returns the initial tags.
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }
}

/// Creates spans.
///
/// Implementations decide ids and sampling; the tracing middleware only
/// relies on the returned span's context and lifecycle.
pub trait Tracer: Send + Sync {
    /// Starts a span named `name`.
    fn start_span(&self, name: &str, options: SpanOptions) -> Span;
}

impl<T: Tracer + ?Sized> Tracer for Arc<T> {
    fn start_span(&self, name: &str, options: SpanOptions) -> Span {
        (**self).start_span(name, options)
    }
}

/// Sampling policy for traces that arrive without a decision.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Sampler {
    /// Sample every trace.
    #[default]
    Always,
    /// Sample no trace.
    Never,
    /// Sample the given fraction of traces, decided by trace id.
    Ratio(f64),
}

impl Sampler {
    /// Creates a ratio sampler, rejecting rates outside `0.0..=1.0`.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use natstrace::trace::Sampler;
    ///
    /// assert!(Sampler::ratio(0.25).is_ok());
    /// assert!(Sampler::ratio(1.5).is_err());
    /// ```
    pub fn ratio(rate: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(Error::configuration(format!("sampling rate {} outside 0.0..=1.0", rate)));
        }
        Ok(match rate {
            r if r == 0.0 => Sampler::Never,
            r if r == 1.0 => Sampler::Always,
            r => Sampler::Ratio(r),
        })
    }

    /// Decides whether the trace is sampled.
    ///
    /// Ratio decisions depend only on the trace id's low bits, so every
    /// participant of a trace reaches the same decision.
    pub fn is_sampled(&self, trace_id: TraceId) -> bool {
        match *self {
            Sampler::Always => true,
            Sampler::Never => false,
            Sampler::Ratio(rate) => {
                let boundary = (rate.clamp(0.0, 1.0) * 10_000.0) as u64;
                trace_id.low() % 10_000 < boundary
            },
        }
    }
}

/// A tracer that generates random ids and reports to a [`Reporter`].
///
/// A parent with a non-zero trace id yields a child in the same trace. Any
/// other parent starts a new trace that keeps the parent's sampling and
/// debug decision.
///
/// ## Example
///
/// ```rust
/// use std::sync::Arc;
/// use natstrace::trace::{LocalTracer, NoopReporter, SpanKind, SpanOptions, Tracer};
///
/// let tracer = LocalTracer::new(Arc::new(NoopReporter));
/// let root = tracer.start_span("root", SpanOptions::new(SpanKind::Producer));
/// let child = tracer.start_span(
///     "child",
///     SpanOptions::new(SpanKind::Consumer).with_parent(root.context()),
/// );
///
/// assert_eq!(child.context().trace_id(), root.context().trace_id());
/// assert_eq!(child.context().parent_id(), Some(root.context().span_id()));
/// ```
#[derive(Clone)]
pub struct LocalTracer {
    reporter: Arc<dyn Reporter>,
    sampler: Sampler,
}

impl LocalTracer {
    /// Creates a tracer that samples every trace.
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        Self { reporter, sampler: Sampler::Always }
    }

    /// Sets the sampler.
    #[must_use]
    pub fn with_sampler(mut self, sampler: Sampler) -> Self {
        self.sampler = sampler;
        self
    }

    /// Returns the sampler.
    pub fn sampler(&self) -> Sampler {
        self.sampler
    }

    fn new_context(&self, parent: Option<&SpanContext>) -> SpanContext {
        let (mut context, sampled, debug) = match parent {
            Some(parent) if !parent.trace_id().is_empty() => {
                let mut child = SpanContext::new(parent.trace_id(), SpanId::random());
                if !parent.span_id().is_zero() {
                    child = child.with_parent(parent.span_id());
                }
                (child, parent.sampled(), parent.is_debug())
            },
            Some(parent) => (
                SpanContext::new(TraceId::random(), SpanId::random()),
                parent.sampled(),
                parent.is_debug(),
            ),
            None => (SpanContext::new(TraceId::random(), SpanId::random()), None, false),
        };

        if debug {
            return context.with_debug(true);
        }
        let sampled = sampled.unwrap_or_else(|| self.sampler.is_sampled(context.trace_id()));
        context = context.with_sampled(sampled);
        context
    }
}

impl std::fmt::Debug for LocalTracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTracer").field("sampler", &self.sampler).finish_non_exhaustive()
    }
}

impl Tracer for LocalTracer {
    fn start_span(&self, name: &str, options: SpanOptions) -> Span {
        let context = self.new_context(options.parent.as_ref());
        tracing::trace!(
            span = name,
            trace_id = %context.trace_id(),
            span_id = %context.span_id(),
            "span started"
        );
        Span::new(name, options.kind, context, options.tags, self.reporter.clone())
    }
}
