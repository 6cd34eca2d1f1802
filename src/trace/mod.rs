//! Span contexts, spans and tracers.
//!
//! This module holds the Zipkin-style tracing model the middleware works
//! with:
//!
//! - [`SpanContext`]: trace id, span id, parent id, sampling and debug state
//! - [`B3Map`] and [`B3Propagator`]: B3 serialization of a span context
//! - [`Tracer`], [`LocalTracer`], [`Span`]: span creation and lifecycle
//! - [`Reporter`]: where finished spans go
//! - [`TraceScope`]: the active span handed explicitly down a call chain
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use natstrace::trace::{B3Map, LocalTracer, LogReporter, SpanKind, SpanOptions, Tracer};
//!
//! let tracer = LocalTracer::new(Arc::new(LogReporter));
//! let mut span = tracer.start_span("orders.created", SpanOptions::new(SpanKind::Producer));
//!
//! // Serialize the context for the wire
//! let map = B3Map::encode(&span.context());
//! assert_eq!(map.decode().unwrap(), span.context());
//!
//! span.finish();
//! span.flush();
//! ```

mod context;
mod propagator;
mod reporter;
mod scope;
mod span;
mod tracer;

pub use context::{ContextError, SpanContext, SpanId, TraceId};
pub use propagator::{B3Map, B3Propagator, HeaderExtractor, HeaderInjector, Propagator};
pub use reporter::{LogReporter, NoopReporter, Reporter};
pub use scope::TraceScope;
pub use span::{ERROR_TAG, FinishedSpan, Span, SpanKind};
pub use tracer::{LocalTracer, Sampler, SpanOptions, Tracer};
